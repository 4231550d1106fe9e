//! Declarative filtering and sorting of the active library.
//!
//! Filtering and sorting are separate passes, always applied in that order.
//! Both work on borrowed records so a filtered view can be re-sorted without
//! re-running the filter.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{BookRecord, ReadingStatus};
use crate::normalize::{normalize, normalize_isbn, resolve_date, tokens};

// ─── FilterSpec ────────────────────────────────────────────

/// Criteria a record must meet to appear in a view. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    /// Words that must all appear in the title or author, or an ISBN fragment.
    pub search: String,
    /// Match books carrying any of these genre ids.
    pub genres: BTreeSet<String>,
    /// Match books belonging to any of these series ids.
    pub series: BTreeSet<String>,
    pub min_rating: Option<u8>,
    pub statuses: BTreeSet<ReadingStatus>,
    /// Case-insensitive substring of the author.
    pub author: String,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.genres.is_empty()
            && self.series.is_empty()
            && self.min_rating.is_none()
            && self.statuses.is_empty()
            && self.author.trim().is_empty()
    }

    /// Whether an active record satisfies every criterion. Soft-deleted records never match.
    pub fn matches(&self, book: &BookRecord) -> bool {
        book.is_active()
            && self.matches_search(book)
            && self.matches_author(book)
            && (self.genres.is_empty() || book.genres.iter().any(|g| self.genres.contains(g)))
            && (self.series.is_empty()
                || book.series_id.as_ref().is_some_and(|s| self.series.contains(s)))
            && self
                .min_rating
                .is_none_or(|min| book.rating.is_some_and(|rating| rating >= min))
            && (self.statuses.is_empty() || self.statuses.contains(&book.reading_status()))
    }

    fn matches_search(&self, book: &BookRecord) -> bool {
        let words = tokens(&self.search);
        if words.is_empty() {
            return true;
        }

        let haystack = normalize(&format!("{} {}", book.title, book.author));
        if words.iter().all(|word| haystack.contains(word.as_str())) {
            return true;
        }

        let fragment: String = self
            .search
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let looks_like_isbn = fragment.len() >= 3
            && fragment.chars().all(|c| c.is_ascii_digit() || c == 'X');
        looks_like_isbn
            && book
                .isbn
                .as_deref()
                .map(normalize_isbn)
                .is_some_and(|isbn| isbn.contains(&fragment))
    }

    fn matches_author(&self, book: &BookRecord) -> bool {
        let needle = normalize(&self.author);
        needle.is_empty() || normalize(&book.author).contains(&needle)
    }
}

/// Keep the records matching `spec`, preserving input order.
pub fn apply_filters<'a, I>(records: I, spec: &FilterSpec) -> Vec<&'a BookRecord>
where
    I: IntoIterator<Item = &'a BookRecord>,
{
    let mut seen = 0usize;
    let kept: Vec<&'a BookRecord> = records
        .into_iter()
        .inspect(|_| seen += 1)
        .filter(|book| spec.matches(book))
        .collect();
    debug!(seen, kept = kept.len(), "filter applied");
    kept
}

// ─── SortSpec ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    Author,
    /// Creation timestamp.
    Added,
    Updated,
    Published,
    Rating,
    PageCount,
    SeriesPosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Updated,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl std::fmt::Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = match self.field {
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Added => "added",
            SortField::Updated => "updated",
            SortField::Published => "published",
            SortField::Rating => "rating",
            SortField::PageCount => "pages",
            SortField::SeriesPosition => "series",
        };
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{field}_{direction}")
    }
}

impl std::str::FromStr for SortSpec {
    type Err = String;

    /// Parse keys like `title_asc` or `updated_desc`; a bare field sorts ascending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (field, direction) = match s.rsplit_once('_') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            _ => (s.as_str(), SortDirection::Asc),
        };

        let field = match field {
            "title" => SortField::Title,
            "author" => SortField::Author,
            "added" | "created" => SortField::Added,
            "updated" => SortField::Updated,
            "published" | "year" => SortField::Published,
            "rating" => SortField::Rating,
            "pages" | "page_count" => SortField::PageCount,
            "series" | "series_position" => SortField::SeriesPosition,
            other => return Err(format!("unknown sort field: {other}")),
        };

        Ok(Self { field, direction })
    }
}

enum SortKey {
    Text(String),
    Number(f64),
    Instant(DateTime<Utc>),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Instant(a), Self::Instant(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn sort_key(book: &BookRecord, field: SortField) -> Option<SortKey> {
    match field {
        SortField::Title => Some(SortKey::Text(normalize(&book.title))),
        SortField::Author => Some(SortKey::Text(normalize(&book.author))),
        SortField::Added => book.created_at.map(SortKey::Instant),
        SortField::Updated => book.updated_at.map(SortKey::Instant),
        SortField::Published => book
            .published_date
            .as_deref()
            .and_then(resolve_date)
            .map(SortKey::Instant),
        SortField::Rating => book.rating.map(|r| SortKey::Number(f64::from(r))),
        SortField::PageCount => book.page_count.map(|p| SortKey::Number(f64::from(p))),
        SortField::SeriesPosition => book.series_position.map(SortKey::Number),
    }
}

/// Stable sort by `spec`. Records lacking the sort value go last in either direction.
pub fn apply_sort<'a, I>(records: I, spec: &SortSpec) -> Vec<&'a BookRecord>
where
    I: IntoIterator<Item = &'a BookRecord>,
{
    let mut keyed: Vec<(Option<SortKey>, &'a BookRecord)> = records
        .into_iter()
        .map(|book| (sort_key(book, spec.field), book))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => match spec.direction {
            SortDirection::Asc => a.compare(b),
            SortDirection::Desc => b.compare(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, book)| book).collect()
}

/// Filter, then sort.
pub fn filter_and_sort<'a>(
    records: &'a [BookRecord],
    filter: &FilterSpec,
    sort: &SortSpec,
) -> Vec<&'a BookRecord> {
    apply_sort(apply_filters(records, filter), sort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingSession;
    use chrono::TimeZone;

    fn book(id: &str, title: &str, author: &str) -> BookRecord {
        BookRecord::new(id, title, author)
    }

    fn ids(records: &[&BookRecord]) -> Vec<String> {
        records.iter().map(|b| b.id.clone()).collect()
    }

    fn library() -> Vec<BookRecord> {
        let mut dune = book("dune", "Dune", "Frank Herbert");
        dune.isbn = Some("978-0-441-01359-3".to_string());
        dune.genres = vec!["sf".to_string()];
        dune.series_id = Some("dune".to_string());
        dune.series_position = Some(1.0);
        dune.rating = Some(5);
        dune.reads = vec![ReadingSession::new(Some("2024-01-01"), Some("2024-02-01"))];

        let mut messiah = book("messiah", "Dune Messiah", "Frank Herbert");
        messiah.genres = vec!["sf".to_string()];
        messiah.series_id = Some("dune".to_string());
        messiah.series_position = Some(2.0);
        messiah.rating = Some(3);
        messiah.reads = vec![ReadingSession::new(Some("2024-03-01"), None)];

        let mut emma = book("emma", "Emma", "Jane Austen");
        emma.genres = vec!["classic".to_string(), "romance".to_string()];
        emma.rating = Some(4);

        let mut gone = book("gone", "Dune", "Frank Herbert");
        gone.deleted_at = Some(Utc::now());

        vec![dune, messiah, emma, gone]
    }

    #[test]
    fn empty_filter_keeps_active_books_in_order() {
        let books = library();
        let filtered = apply_filters(&books, &FilterSpec::default());
        assert_eq!(ids(&filtered), vec!["dune", "messiah", "emma"]);
    }

    #[test]
    fn search_requires_every_word() {
        let books = library();
        let spec = FilterSpec {
            search: "dune  HERBERT messiah".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&books, &spec)), vec!["messiah"]);
    }

    #[test]
    fn search_matches_isbn_fragment() {
        let books = library();
        let spec = FilterSpec {
            search: "0441-0135".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&books, &spec)), vec!["dune"]);
    }

    #[test]
    fn genre_series_rating_status_and_author() {
        let books = library();

        let by_genre = FilterSpec {
            genres: ["romance".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&books, &by_genre)), vec!["emma"]);

        let by_series = FilterSpec {
            series: ["dune".to_string()].into(),
            min_rating: Some(4),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&books, &by_series)), vec!["dune"]);

        let by_status = FilterSpec {
            statuses: [ReadingStatus::Reading, ReadingStatus::Unread].into(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&books, &by_status)), vec!["messiah", "emma"]);

        let by_author = FilterSpec {
            author: "AUSTEN".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&books, &by_author)), vec!["emma"]);
    }

    #[test]
    fn unrated_books_fail_min_rating() {
        let books = vec![book("a", "Unrated", "Nobody")];
        let spec = FilterSpec {
            min_rating: Some(0),
            ..Default::default()
        };
        assert!(apply_filters(&books, &spec).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let books = library();
        let spec = FilterSpec {
            search: "dune".to_string(),
            genres: ["sf".to_string()].into(),
            ..Default::default()
        };
        let once = apply_filters(&books, &spec);
        let twice = apply_filters(once.iter().copied(), &spec);
        assert_eq!(once, twice);
    }

    #[test]
    fn title_sort_is_case_insensitive() {
        let books = vec![book("1", "banana", "x"), book("2", "Apple", "x"), book("3", "cherry", "x")];
        let sorted = apply_sort(&books, &SortSpec::asc(SortField::Title));
        assert_eq!(ids(&sorted), vec!["2", "1", "3"]);
        let sorted = apply_sort(&books, &SortSpec::desc(SortField::Title));
        assert_eq!(ids(&sorted), vec!["3", "1", "2"]);
    }

    #[test]
    fn title_sort_ignores_stray_whitespace() {
        let books = vec![book("z", "  Zebra", "x"), book("a", "apple", "x"), book("m", "Mango\t Tree", "x")];
        let sorted = apply_sort(&books, &SortSpec::asc(SortField::Title));
        assert_eq!(ids(&sorted), vec!["a", "m", "z"]);
    }

    #[test]
    fn absent_values_sort_last_in_both_directions() {
        let mut rated_low = book("low", "A", "x");
        rated_low.rating = Some(1);
        let mut rated_high = book("high", "B", "x");
        rated_high.rating = Some(5);
        let unrated = book("none", "C", "x");
        let books = vec![unrated, rated_low, rated_high];

        assert_eq!(
            ids(&apply_sort(&books, &SortSpec::asc(SortField::Rating))),
            vec!["low", "high", "none"]
        );
        assert_eq!(
            ids(&apply_sort(&books, &SortSpec::desc(SortField::Rating))),
            vec!["high", "low", "none"]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut books = Vec::new();
        for (id, rating) in [("a", 3), ("b", 5), ("c", 3), ("d", 5), ("e", 3)] {
            let mut b = book(id, "Same", "x");
            b.rating = Some(rating);
            books.push(b);
        }
        assert_eq!(
            ids(&apply_sort(&books, &SortSpec::desc(SortField::Rating))),
            vec!["b", "d", "a", "c", "e"]
        );
        assert_eq!(
            ids(&apply_sort(&books, &SortSpec::asc(SortField::Title))),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn published_dates_resolve_and_unparseable_go_last() {
        let mut old = book("old", "A", "x");
        old.published_date = Some("1965".to_string());
        let mut new = book("new", "B", "x");
        new.published_date = Some("2019-06-04".to_string());
        let mut junk = book("junk", "C", "x");
        junk.published_date = Some("circa forever".to_string());
        let books = vec![junk, new, old];

        assert_eq!(
            ids(&apply_sort(&books, &SortSpec::asc(SortField::Published))),
            vec!["old", "new", "junk"]
        );
    }

    #[test]
    fn updated_desc_uses_timestamps() {
        let mut first = book("first", "A", "x");
        first.updated_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut second = book("second", "B", "x");
        second.updated_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let books = vec![first, book("never", "C", "x"), second];

        assert_eq!(
            ids(&apply_sort(&books, &SortSpec::default())),
            vec!["second", "first", "never"]
        );
    }

    #[test]
    fn filter_then_sort() {
        let books = library();
        let view = filter_and_sort(
            &books,
            &FilterSpec {
                genres: ["sf".to_string()].into(),
                ..Default::default()
            },
            &SortSpec::asc(SortField::Rating),
        );
        assert_eq!(ids(&view), vec!["messiah", "dune"]);
    }

    #[test]
    fn sort_spec_parse_and_display() {
        let spec: SortSpec = "series_asc".parse().unwrap();
        assert_eq!(spec, SortSpec::asc(SortField::SeriesPosition));
        assert_eq!(spec.to_string(), "series_asc");

        let spec: SortSpec = "page_count_desc".parse().unwrap();
        assert_eq!(spec, SortSpec::desc(SortField::PageCount));

        assert_eq!("title".parse::<SortSpec>(), Ok(SortSpec::asc(SortField::Title)));
        assert!("colour_asc".parse::<SortSpec>().is_err());
    }
}
