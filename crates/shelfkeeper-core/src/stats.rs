use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{BookRecord, ReadingStatus};
use crate::normalize::normalized_isbn_of;

/// Counts over a library snapshot. Everything except `total` and `deleted`
/// covers active books only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total: usize,
    pub active: usize,
    pub deleted: usize,
    pub unread: usize,
    pub reading: usize,
    pub read: usize,
    pub with_isbn: usize,
    pub with_cover: usize,
    pub average_rating: Option<f64>,
    /// Pages of books with a finished reading session.
    pub pages_read: u64,
    pub by_format: BTreeMap<String, usize>,
    pub by_genre: BTreeMap<String, usize>,
}

pub fn library_stats(books: &[BookRecord]) -> LibraryStats {
    let mut stats = LibraryStats {
        total: books.len(),
        ..Default::default()
    };
    let mut rating_sum = 0u64;
    let mut rated = 0u64;

    for book in books {
        if book.is_deleted() {
            stats.deleted += 1;
            continue;
        }
        stats.active += 1;

        match book.reading_status() {
            ReadingStatus::Unread => stats.unread += 1,
            ReadingStatus::Reading => stats.reading += 1,
            ReadingStatus::Read => stats.read += 1,
        }

        if normalized_isbn_of(book.isbn.as_deref()).is_some() {
            stats.with_isbn += 1;
        }
        if book.has_cover() {
            stats.with_cover += 1;
        }
        if let Some(rating) = book.rating {
            rating_sum += u64::from(rating);
            rated += 1;
        }
        if book.reads.iter().any(|session| session.finished().is_some()) {
            stats.pages_read += u64::from(book.page_count.unwrap_or(0));
        }

        let format = book
            .physical_format
            .map_or_else(|| "unknown".to_string(), |f| f.to_string());
        *stats.by_format.entry(format).or_default() += 1;

        for genre in &book.genres {
            *stats.by_genre.entry(genre.clone()).or_default() += 1;
        }
    }

    if rated > 0 {
        stats.average_rating = Some(rating_sum as f64 / rated as f64);
    }

    stats
}
