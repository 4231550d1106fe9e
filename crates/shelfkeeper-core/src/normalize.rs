//! Canonical forms used for comparison: text folding, ISBNs and lenient dates.
//!
//! Everything here is best-effort. Inputs that cannot be canonicalized come
//! back empty (or `None`) instead of failing, because callers use these
//! values for matching and filtering, never for rejecting a record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{10}|[0-9]{9}X|[0-9]{13})$").expect("static ISBN pattern"));

/// Lower-case, trim and collapse internal whitespace runs to one space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whitespace-separated tokens of the normalized text.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip dashes and spaces and check the ISBN-10 / ISBN-13 shape.
///
/// The check digit `x` is accepted in either case and returned upper-cased.
/// Anything that does not fit the shape normalizes to an empty string.
pub fn normalize_isbn(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if ISBN_PATTERN.is_match(&stripped) {
        stripped
    } else {
        String::new()
    }
}

/// Normalized ISBN of an optional field, `None` when absent or invalid.
pub fn normalized_isbn_of(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_isbn).filter(|isbn| !isbn.is_empty())
}

/// Key under which two normalized ISBNs compare equal.
///
/// An ISBN-10 is lifted to its `978`-prefixed ISBN-13 form so both editions
/// of the same identifier collide. Expects output of [`normalize_isbn`].
pub fn isbn_match_key(normalized: &str) -> String {
    if normalized.len() != 10 {
        return normalized.to_string();
    }

    let mut digits: Vec<u32> = vec![9, 7, 8];
    digits.extend(normalized.chars().take(9).filter_map(|c| c.to_digit(10)));
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    digits.push((10 - (sum % 10)) % 10);
    digits.iter().map(u32::to_string).collect()
}

/// Normalized Levenshtein similarity of two already-normalized titles, in `0.0..=1.0`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Resolve a user-entered date to an instant.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD`,
/// `YYYY-MM` and bare `YYYY` (the latter two resolve to the first day).
pub fn resolve_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            (raw.len() == 4)
                .then(|| raw.parse::<i32>().ok())
                .flatten()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        })?;

    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn normalize_folds_case_and_whitespace() {
        assert_eq!(normalize("  The   Left Hand\tof Darkness "), "the left hand of darkness");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn tokens_split_on_whitespace() {
        assert_eq!(tokens("F.  Herbert"), vec!["f.", "herbert"]);
        assert!(tokens("   ").is_empty());
    }

    #[test]
    fn isbn_strips_separators() {
        assert_eq!(normalize_isbn("978-0-441-01359-3"), "9780441013593");
        assert_eq!(normalize_isbn("0 441 01359 7"), "0441013597");
    }

    #[test]
    fn isbn_check_digit_x_is_case_insensitive() {
        assert_eq!(normalize_isbn("007462542x"), "007462542X");
    }

    #[test]
    fn invalid_isbn_normalizes_to_empty() {
        assert_eq!(normalize_isbn("12345"), "");
        assert_eq!(normalize_isbn("97804410135X3"), "");
        assert_eq!(normalize_isbn("ISBN 9780441013593"), "");
        assert_eq!(normalize_isbn("９７８０４４１０１３５９３"), "");
        assert_eq!(normalize_isbn("٩٧٨٠٤٤١٠١٣٥٩٣"), "");
        assert_eq!(normalized_isbn_of(Some("abc")), None);
        assert_eq!(normalized_isbn_of(None), None);
    }

    #[test]
    fn isbn10_and_isbn13_share_match_key() {
        assert_eq!(isbn_match_key("0306406152"), "9780306406157");
        assert_eq!(isbn_match_key("9780306406157"), "9780306406157");
    }

    #[test]
    fn title_similarity_bounds() {
        assert_eq!(title_similarity("dune", "dune"), 1.0);
        assert_eq!(title_similarity("", "dune"), 0.0);
        assert!(title_similarity("the hobbit", "the hobbitt") > 0.9);
    }

    #[test]
    fn resolve_date_formats() {
        assert_eq!(resolve_date("2024-03-05").unwrap().day(), 5);
        assert_eq!(resolve_date("2024-03").unwrap().month(), 3);
        assert_eq!(resolve_date("1965").unwrap().year(), 1965);
        assert!(resolve_date("2024-01-01T12:30:00Z").is_some());
        assert!(resolve_date("2024-01-01T12:30:00").is_some());
        assert!(resolve_date("someday").is_none());
        assert!(resolve_date("").is_none());
    }
}
