use chrono::{DateTime, TimeDelta, Utc};

use crate::models::BookRecord;

/// Days a soft-deleted book stays restorable.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Whole days left before a soft-deleted record may be purged; `None` for active records.
///
/// Returns zero once the window has elapsed and `i64::MAX` when the window
/// reaches past the representable calendar.
pub fn days_until_purge(book: &BookRecord, now: DateTime<Utc>, days: i64) -> Option<i64> {
    let deleted_at = book.deleted_at?;
    let Some(due) = purge_at(deleted_at, days) else {
        return Some(i64::MAX);
    };
    Some((due - now).num_days().max(0))
}

/// Instant a record deleted at `deleted_at` becomes purgeable.
///
/// `None` for a negative window or one that overflows the calendar, meaning never.
fn purge_at(deleted_at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    if days < 0 {
        return None;
    }
    deleted_at.checked_add_signed(TimeDelta::try_days(days)?)
}

/// Ids of soft-deleted records whose retention window has elapsed at `now`.
pub fn purge_candidates(books: &[BookRecord], now: DateTime<Utc>, days: i64) -> Vec<String> {
    books
        .iter()
        .filter(|book| {
            book.deleted_at
                .and_then(|deleted_at| purge_at(deleted_at, days))
                .is_some_and(|due| due <= now)
        })
        .map(|book| book.id.clone())
        .collect()
}
