//! Data-quality scan of the active library.
//!
//! [`analyze`] is a pure function of its inputs: it keeps no state between
//! calls and reports records in input order, so identical inputs always
//! yield identical reports.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{BookRecord, SeriesRecord};
use crate::normalize::normalized_isbn_of;

/// A class of data-quality defect. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthIssue {
    MissingCover,
    MissingIsbn,
    MissingGenre,
    OrphanedSeries,
    InconsistentDates,
    DuplicatePosition,
}

impl HealthIssue {
    pub const ALL: [HealthIssue; 6] = [
        HealthIssue::MissingCover,
        HealthIssue::MissingIsbn,
        HealthIssue::MissingGenre,
        HealthIssue::OrphanedSeries,
        HealthIssue::InconsistentDates,
        HealthIssue::DuplicatePosition,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MissingCover => "missing cover",
            Self::MissingIsbn => "missing or invalid ISBN",
            Self::MissingGenre => "no genre",
            Self::OrphanedSeries => "unknown series",
            Self::InconsistentDates => "inconsistent reading dates",
            Self::DuplicatePosition => "duplicate series position",
        }
    }
}

impl std::fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A book flagged by at least one category, with every category it hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedBook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub issues: Vec<HealthIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Number of active books scanned.
    pub scanned: usize,
    /// Affected book ids per category; every category is present, possibly empty.
    pub issues: BTreeMap<HealthIssue, Vec<String>>,
    /// Affected books in input order.
    pub affected: Vec<AffectedBook>,
}

impl HealthReport {
    pub fn ids(&self, issue: HealthIssue) -> &[String] {
        self.issues.get(&issue).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_healthy(&self) -> bool {
        self.affected.is_empty()
    }

    pub fn counts(&self) -> BTreeMap<HealthIssue, usize> {
        HealthIssue::ALL
            .iter()
            .map(|issue| (*issue, self.ids(*issue).len()))
            .collect()
    }
}

/// Scan the active books for every [`HealthIssue`].
///
/// `series` is the lookup used to resolve `series_id` references.
pub fn analyze(books: &[BookRecord], series: &[SeriesRecord]) -> HealthReport {
    let known_series: HashSet<&str> = series.iter().map(|s| s.id.as_str()).collect();
    let active: Vec<&BookRecord> = books.iter().filter(|b| b.is_active()).collect();

    let mut slot_counts: HashMap<(&str, u64), usize> = HashMap::new();
    for book in &active {
        if let Some(slot) = series_slot(book) {
            *slot_counts.entry(slot).or_default() += 1;
        }
    }

    let mut issues: BTreeMap<HealthIssue, Vec<String>> =
        HealthIssue::ALL.iter().map(|issue| (*issue, Vec::new())).collect();
    let mut affected = Vec::new();

    for book in &active {
        let mut found = Vec::new();

        if !book.has_cover() {
            found.push(HealthIssue::MissingCover);
        }
        if normalized_isbn_of(book.isbn.as_deref()).is_none() {
            found.push(HealthIssue::MissingIsbn);
        }
        if book.genres.iter().all(|g| g.trim().is_empty()) {
            found.push(HealthIssue::MissingGenre);
        }
        if let Some(series_id) = series_ref(book)
            && !known_series.contains(series_id)
        {
            found.push(HealthIssue::OrphanedSeries);
        }
        if book.reads.iter().any(|session| session.is_inconsistent()) {
            found.push(HealthIssue::InconsistentDates);
        }
        if series_slot(book).is_some_and(|slot| slot_counts.get(&slot).copied().unwrap_or(0) > 1) {
            found.push(HealthIssue::DuplicatePosition);
        }

        if found.is_empty() {
            continue;
        }
        for issue in &found {
            if let Some(ids) = issues.get_mut(issue) {
                ids.push(book.id.clone());
            }
        }
        affected.push(AffectedBook {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            issues: found,
        });
    }

    debug!(
        scanned = active.len(),
        affected = affected.len(),
        "library health analysis finished"
    );

    HealthReport {
        scanned: active.len(),
        issues,
        affected,
    }
}

/// All flagged ids, deduplicated, in first-seen order across categories in report order.
pub fn books_with_issues(report: &HealthReport) -> Vec<String> {
    let mut seen = HashSet::new();
    HealthIssue::ALL
        .iter()
        .flat_map(|issue| report.ids(*issue))
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn series_ref(book: &BookRecord) -> Option<&str> {
    book.series_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
}

/// `(series id, position)` with `-0.0` folded into `0.0`.
fn series_slot(book: &BookRecord) -> Option<(&str, u64)> {
    let series_id = series_ref(book)?;
    let position = book.series_position?;
    let position = if position == 0.0 { 0.0 } else { position };
    Some((series_id, position.to_bits()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingSession;
    use chrono::Utc;

    fn healthy(id: &str) -> BookRecord {
        let mut book = BookRecord::new(id, format!("Title {id}"), "Author");
        book.isbn = Some("9780441013593".to_string());
        book.genres = vec!["g1".to_string()];
        book.cover_image_url = Some(format!("https://covers.example/{id}.jpg"));
        book
    }

    fn series(id: &str) -> SeriesRecord {
        SeriesRecord::new(id, format!("Series {id}"))
    }

    #[test]
    fn healthy_library_reports_nothing() {
        let books = vec![healthy("a"), healthy("b")];
        let report = analyze(&books, &[]);
        assert!(report.is_healthy());
        assert_eq!(report.scanned, 2);
        assert_eq!(report.issues.len(), HealthIssue::ALL.len());
        assert!(books_with_issues(&report).is_empty());
    }

    #[test]
    fn missing_metadata_categories() {
        let mut no_cover = healthy("no-cover");
        no_cover.cover_image_url = None;

        let mut covers_map = healthy("covers-map");
        covers_map.cover_image_url = None;
        covers_map
            .covers
            .insert("openLibrary".to_string(), "https://covers.example/x.jpg".to_string());

        let mut bad_isbn = healthy("bad-isbn");
        bad_isbn.isbn = Some("12-34".to_string());

        let mut no_isbn = healthy("no-isbn");
        no_isbn.isbn = None;

        let mut no_genre = healthy("no-genre");
        no_genre.genres.clear();

        let books = vec![no_cover, covers_map, bad_isbn, no_isbn, no_genre];
        let report = analyze(&books, &[]);

        assert_eq!(report.ids(HealthIssue::MissingCover), ["no-cover"]);
        assert_eq!(report.ids(HealthIssue::MissingIsbn), ["bad-isbn", "no-isbn"]);
        assert_eq!(report.ids(HealthIssue::MissingGenre), ["no-genre"]);
    }

    #[test]
    fn orphaned_series_resolves_against_lookup() {
        let mut known = healthy("known");
        known.series_id = Some("s1".to_string());
        let mut orphan = healthy("orphan");
        orphan.series_id = Some("gone".to_string());

        let report = analyze(&[known, orphan], &[series("s1")]);
        assert_eq!(report.ids(HealthIssue::OrphanedSeries), ["orphan"]);
    }

    #[test]
    fn inconsistent_reading_dates_flagged() {
        let mut backwards = healthy("backwards");
        backwards.reads = vec![ReadingSession::new(Some("2024-01-01"), Some("2023-12-01"))];
        let mut no_start = healthy("no-start");
        no_start.reads = vec![ReadingSession::new(None, Some("2023-12-01"))];
        let mut fine = healthy("fine");
        fine.reads = vec![
            ReadingSession::new(Some("2023-01-01"), Some("2023-02-01")),
            ReadingSession::new(Some("2024-01-01"), None),
        ];

        let report = analyze(&[backwards, no_start, fine], &[]);
        assert_eq!(
            report.ids(HealthIssue::InconsistentDates),
            ["backwards", "no-start"]
        );
    }

    #[test]
    fn duplicate_series_position_reports_both() {
        let mut first = healthy("first");
        first.series_id = Some("s1".to_string());
        first.series_position = Some(1.0);
        let mut second = healthy("second");
        second.series_id = Some("s1".to_string());
        second.series_position = Some(1.0);
        let mut other_series = healthy("other");
        other_series.series_id = Some("s2".to_string());
        other_series.series_position = Some(1.0);
        let mut unpositioned = healthy("unpositioned");
        unpositioned.series_id = Some("s1".to_string());

        let books = vec![first, second, other_series, unpositioned];
        let report = analyze(&books, &[series("s1"), series("s2")]);
        assert_eq!(report.ids(HealthIssue::DuplicatePosition), ["first", "second"]);
    }

    #[test]
    fn deleted_records_never_reported() {
        let mut deleted = healthy("deleted");
        deleted.deleted_at = Some(Utc::now());
        deleted.isbn = None;
        deleted.genres.clear();
        deleted.series_id = Some("s1".to_string());
        deleted.series_position = Some(1.0);

        let mut twin = healthy("twin");
        twin.series_id = Some("s1".to_string());
        twin.series_position = Some(1.0);
        let mut live = healthy("live");
        live.series_id = Some("s1".to_string());
        live.series_position = Some(2.0);

        let report = analyze(&[deleted, twin, live], &[series("s1")]);
        assert_eq!(report.scanned, 2);
        assert!(report.is_healthy());
        assert!(!books_with_issues(&report).contains(&"deleted".to_string()));
    }

    #[test]
    fn record_can_hit_several_categories() {
        let bare = BookRecord::new("bare", "Bare", "Nobody");
        let report = analyze(&[bare], &[]);
        assert_eq!(
            report.affected[0].issues,
            vec![
                HealthIssue::MissingCover,
                HealthIssue::MissingIsbn,
                HealthIssue::MissingGenre
            ]
        );
    }

    #[test]
    fn books_with_issues_dedupes_in_category_order() {
        let mut genre_only = healthy("genre-only");
        genre_only.genres.clear();
        let bare = BookRecord::new("bare", "Bare", "Nobody");
        let mut isbn_only = healthy("isbn-only");
        isbn_only.isbn = None;

        let report = analyze(&[genre_only, bare, isbn_only], &[]);
        assert_eq!(
            books_with_issues(&report),
            vec!["bare".to_string(), "isbn-only".to_string(), "genre-only".to_string()]
        );
    }

    #[test]
    fn analysis_is_deterministic() {
        let mut a = healthy("a");
        a.series_id = Some("s1".to_string());
        a.series_position = Some(3.0);
        let mut b = a.clone();
        b.id = "b".to_string();
        b.isbn = None;
        let books = vec![a, b, BookRecord::new("c", "C", "Someone")];
        let lookup = vec![series("s1")];

        assert_eq!(analyze(&books, &lookup), analyze(&books, &lookup));
        assert_eq!(
            serde_json::to_string(&analyze(&books, &lookup)).unwrap(),
            serde_json::to_string(&analyze(&books, &lookup)).unwrap()
        );
    }
}
