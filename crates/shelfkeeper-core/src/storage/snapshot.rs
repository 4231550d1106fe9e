use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ShelfError, ValidationError};
use crate::models::{BookRecord, GenreRecord, SeriesRecord};
use crate::validate::{validate_book, validate_genre, validate_series};

/// One user's library as exported from the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySnapshot {
    pub books: Vec<BookRecord>,
    pub series: Vec<SeriesRecord>,
    pub genres: Vec<GenreRecord>,
}

impl LibrarySnapshot {
    /// Parse and validate a snapshot. The first invalid record aborts the load.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        for book in &self.books {
            validate_book(book)?;
        }
        for series in &self.series {
            validate_series(series)?;
        }
        for genre in &self.genres {
            validate_genre(genre)?;
        }

        unique_ids("book", self.books.iter().map(|b| b.id.as_str()))?;
        unique_ids("series", self.series.iter().map(|s| s.id.as_str()))?;
        unique_ids("genre", self.genres.iter().map(|g| g.id.as_str()))?;
        Ok(())
    }

    pub fn active_books(&self) -> impl Iterator<Item = &BookRecord> {
        self.books.iter().filter(|book| book.is_active())
    }

    pub fn book(&self, id: &str) -> Result<&BookRecord> {
        self.books
            .iter()
            .find(|book| book.id == id)
            .ok_or_else(|| ShelfError::BookNotFound(id.to_string()))
    }

    pub fn series_by_id(&self, id: &str) -> Result<&SeriesRecord> {
        self.series
            .iter()
            .find(|series| series.id == id)
            .ok_or_else(|| ShelfError::SeriesNotFound(id.to_string()))
    }
}

fn unique_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> std::result::Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Load and validate a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<LibrarySnapshot> {
    let contents = fs::read_to_string(path)?;
    let snapshot = LibrarySnapshot::from_json(&contents)?;
    debug!(
        path = %path.display(),
        books = snapshot.books.len(),
        series = snapshot.series.len(),
        genres = snapshot.genres.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Write a snapshot as pretty JSON, creating parent directories.
pub fn save_snapshot(path: &Path, snapshot: &LibrarySnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}
