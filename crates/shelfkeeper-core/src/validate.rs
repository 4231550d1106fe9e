//! Structural checks run once, at the point records enter the core.
//!
//! Only defects that make a record meaningless are rejected here. Soft
//! problems (bad ISBNs, reading dates out of order, missing covers) are left
//! for the health analyzer to report.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::models::{BookRecord, GenreRecord, SeriesRecord};

/// Longest accepted `notes` value, in characters.
pub const MAX_NOTES_LEN: usize = 5000;

/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

pub fn validate_book(book: &BookRecord) -> Result<(), ValidationError> {
    if book.id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind: "book" });
    }
    let id = || book.id.clone();

    if book.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle { id: id() });
    }
    if book.author.trim().is_empty() {
        return Err(ValidationError::EmptyAuthor { id: id() });
    }
    if book.page_count == Some(0) {
        return Err(ValidationError::ZeroPageCount { id: id() });
    }
    if let Some(rating) = book.rating
        && rating > MAX_RATING
    {
        return Err(ValidationError::RatingOutOfRange { id: id(), rating });
    }
    if let Some(notes) = book.notes.as_deref() {
        let len = notes.chars().count();
        if len > MAX_NOTES_LEN {
            return Err(ValidationError::NotesTooLong {
                id: id(),
                len,
                max: MAX_NOTES_LEN,
            });
        }
    }
    if let Some(position) = book.series_position
        && (!position.is_finite() || position < 0.0)
    {
        return Err(ValidationError::InvalidSeriesPosition { id: id() });
    }

    let primaries = book.images.iter().filter(|image| image.is_primary).count();
    if primaries > 1 {
        return Err(ValidationError::MultiplePrimaryImages {
            id: id(),
            count: primaries,
        });
    }

    Ok(())
}

pub fn validate_series(series: &SeriesRecord) -> Result<(), ValidationError> {
    if series.id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind: "series" });
    }
    if series.name.trim().is_empty() {
        return Err(ValidationError::EmptyName {
            kind: "series",
            id: series.id.clone(),
        });
    }

    let mut seen = HashSet::new();
    for position in series.expected_books.iter().filter_map(|b| b.position) {
        if !position.is_finite() {
            return Err(ValidationError::InvalidExpectedPosition {
                id: series.id.clone(),
            });
        }
        // -0.0 and 0.0 are the same slot.
        let position = if position == 0.0 { 0.0 } else { position };
        if !seen.insert(position.to_bits()) {
            return Err(ValidationError::DuplicateExpectedPosition {
                id: series.id.clone(),
                position,
            });
        }
    }

    Ok(())
}

pub fn validate_genre(genre: &GenreRecord) -> Result<(), ValidationError> {
    if genre.id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind: "genre" });
    }
    if genre.name.trim().is_empty() {
        return Err(ValidationError::EmptyName {
            kind: "genre",
            id: genre.id.clone(),
        });
    }
    Ok(())
}
