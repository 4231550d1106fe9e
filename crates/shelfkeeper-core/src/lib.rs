//! Shelfkeeper core — pure analysis over a user's book catalogue.
//!
//! Records are fetched and scoped by the surrounding application; this crate
//! validates them once at the boundary and then normalizes, de-duplicates,
//! health-checks, filters and sorts them without any I/O of its own.

pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod health;
pub mod models;
pub mod normalize;
pub mod query;
pub mod retention;
pub mod series;
pub mod stats;
pub mod storage;
pub mod validate;

pub use config::ShelfConfig;
pub use dedup::{Confidence, DuplicateDetector, DuplicateGroup, DuplicateMatch, find_duplicates};
pub use error::{ExitCode, Result, ShelfError, ValidationError};
pub use filter::{
    FilterSpec, SortDirection, SortField, SortSpec, apply_filters, apply_sort, filter_and_sort,
};
pub use health::{AffectedBook, HealthIssue, HealthReport, analyze, books_with_issues};
pub use models::*;
pub use normalize::{normalize, normalize_isbn};
pub use query::LibraryQuery;
pub use retention::{DEFAULT_RETENTION_DAYS, days_until_purge, purge_candidates};
pub use series::{SeriesProgress, series_progress};
pub use stats::{LibraryStats, library_stats};
pub use storage::{LibrarySnapshot, load_snapshot, save_snapshot};
pub use validate::{validate_book, validate_genre, validate_series};
