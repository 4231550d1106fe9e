use std::collections::HashSet;

use serde::Serialize;

use crate::filter::{SortField, SortSpec, apply_sort};
use crate::models::{BookRecord, ExpectedBook, SeriesRecord};
use crate::normalize::{isbn_match_key, normalize, normalized_isbn_of};

/// How much of a series the library holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesProgress<'a> {
    pub series: &'a SeriesRecord,
    /// Active books in the series, by position (unpositioned last).
    pub owned: Vec<&'a BookRecord>,
    pub expected: Option<usize>,
    /// Expected entries with no owned book matching by ISBN or title.
    pub missing: Vec<&'a ExpectedBook>,
}

impl SeriesProgress<'_> {
    /// Owned share of the expected size, capped at 1.0.
    pub fn completion(&self) -> Option<f64> {
        self.expected
            .filter(|expected| *expected > 0)
            .map(|expected| (self.owned.len() as f64 / expected as f64).min(1.0))
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.completion().is_none_or(|ratio| ratio >= 1.0)
    }
}

pub fn series_progress<'a>(series: &'a SeriesRecord, books: &'a [BookRecord]) -> SeriesProgress<'a> {
    let members = books
        .iter()
        .filter(|book| book.is_active() && book.series_id.as_deref() == Some(series.id.as_str()));
    let owned = apply_sort(members, &SortSpec::asc(SortField::SeriesPosition));

    let owned_isbns: HashSet<String> = owned
        .iter()
        .filter_map(|book| normalized_isbn_of(book.isbn.as_deref()))
        .map(|isbn| isbn_match_key(&isbn))
        .collect();
    let owned_titles: HashSet<String> = owned.iter().map(|book| normalize(&book.title)).collect();

    let missing = series
        .expected_books
        .iter()
        .filter(|expected| {
            let by_isbn = normalized_isbn_of(expected.isbn.as_deref())
                .is_some_and(|isbn| owned_isbns.contains(&isbn_match_key(&isbn)));
            !by_isbn && !owned_titles.contains(&normalize(&expected.title))
        })
        .collect();

    SeriesProgress {
        series,
        owned,
        expected: series.expected_count(),
        missing,
    }
}
