//! Query language for library views.
//!
//! ```text
//! dune messiah           → search words (title / author / ISBN fragment)
//! author:"le guin"       → quotes keep an operator value together; bare
//!                          quoted words are still matched one by one
//! @herbert  author:le    → author substring
//! #sf  genre:sf          → genre filter (any of)
//! series:dune            → series filter (any of)
//! r:4  r:>=4  r:>3       → minimum rating
//! s:read  status:reading → reading status (any of)
//! sort:title_asc         → sort key
//! ```

use crate::filter::{FilterSpec, SortSpec};
use crate::models::ReadingStatus;

/// A parsed query: filter criteria plus an optional explicit sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryQuery {
    pub filter: FilterSpec,
    pub sort: Option<SortSpec>,
}

impl LibraryQuery {
    pub fn parse(input: &str) -> Self {
        let mut query = LibraryQuery::default();
        let mut search_terms: Vec<String> = Vec::new();
        let mut author_terms: Vec<String> = Vec::new();

        for token in tokenize(input) {
            match parse_token(&token) {
                Some(Term::Author(name)) => author_terms.push(name),
                Some(Term::Genre(id)) => {
                    query.filter.genres.insert(id);
                }
                Some(Term::Series(id)) => {
                    query.filter.series.insert(id);
                }
                Some(Term::MinRating(min)) => {
                    query.filter.min_rating = Some(query.filter.min_rating.map_or(min, |cur| cur.max(min)));
                }
                Some(Term::Status(status)) => {
                    query.filter.statuses.insert(status);
                }
                Some(Term::Sort(sort)) => query.sort = Some(sort),
                None => search_terms.push(token),
            }
        }

        query.filter.search = search_terms.join(" ");
        query.filter.author = author_terms.join(" ");
        query
    }
}

impl FilterSpec {
    /// Parse the filter part of a query string, ignoring any `sort:` term.
    pub fn parse(input: &str) -> Self {
        LibraryQuery::parse(input).filter
    }
}

enum Term {
    Author(String),
    Genre(String),
    Series(String),
    MinRating(u8),
    Status(ReadingStatus),
    Sort(SortSpec),
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn parse_token(token: &str) -> Option<Term> {
    if let Some(rest) = token
        .strip_prefix("author:")
        .or_else(|| token.strip_prefix('@'))
        .filter(|rest| !rest.is_empty())
    {
        return Some(Term::Author(rest.to_string()));
    }

    if let Some(rest) = token
        .strip_prefix("genre:")
        .or_else(|| token.strip_prefix('#'))
        .filter(|rest| !rest.is_empty())
    {
        return Some(Term::Genre(rest.to_string()));
    }

    if let Some(rest) = token.strip_prefix("series:").filter(|rest| !rest.is_empty()) {
        return Some(Term::Series(rest.to_string()));
    }

    if let Some(rest) = token
        .strip_prefix("r:")
        .or_else(|| token.strip_prefix("rating:"))
    {
        return parse_min_rating(rest).map(Term::MinRating);
    }

    if let Some(rest) = token
        .strip_prefix("s:")
        .or_else(|| token.strip_prefix("status:"))
    {
        return rest.parse().ok().map(Term::Status);
    }

    if let Some(rest) = token.strip_prefix("sort:") {
        return rest.parse().ok().map(Term::Sort);
    }

    None
}

fn parse_min_rating(s: &str) -> Option<u8> {
    if let Some(rest) = s.strip_prefix(">=") {
        return rest.parse().ok();
    }
    if let Some(rest) = s.strip_prefix('>') {
        return rest.parse::<u8>().ok().map(|n| n.saturating_add(1));
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortField;
    use crate::models::BookRecord;

    #[test]
    fn test_plain_words_become_search() {
        let q = LibraryQuery::parse("dune  messiah");
        assert_eq!(q.filter.search, "dune messiah");
        assert!(q.sort.is_none());
    }

    #[test]
    fn test_quoted_phrase() {
        let q = FilterSpec::parse("\"left hand\" #sf");
        assert_eq!(q.search, "left hand");
        assert!(q.genres.contains("sf"));
    }

    #[test]
    fn test_quoted_words_match_independently() {
        let q = FilterSpec::parse("\"left hand\"");
        assert!(q.matches(&BookRecord::new("a", "The Left Hand of Darkness", "Ursula K. Le Guin")));
        assert!(q.matches(&BookRecord::new("b", "Hand to the Left", "Anon")));
        assert!(!q.matches(&BookRecord::new("c", "Left Behind", "Anon")));
    }

    #[test]
    fn test_author_filters() {
        assert_eq!(FilterSpec::parse("@herbert").author, "herbert");
        assert_eq!(FilterSpec::parse("author:\"le guin\"").author, "le guin");
    }

    #[test]
    fn test_genre_series_status() {
        let q = FilterSpec::parse("#sf genre:classic series:dune s:read status:reading");
        assert_eq!(q.genres.len(), 2);
        assert!(q.series.contains("dune"));
        assert!(q.statuses.contains(&ReadingStatus::Read));
        assert!(q.statuses.contains(&ReadingStatus::Reading));
    }

    #[test]
    fn test_rating_forms() {
        assert_eq!(FilterSpec::parse("r:4").min_rating, Some(4));
        assert_eq!(FilterSpec::parse("r:>=3").min_rating, Some(3));
        assert_eq!(FilterSpec::parse("rating:>3").min_rating, Some(4));
        assert_eq!(FilterSpec::parse("r:2 r:4").min_rating, Some(4));
    }

    #[test]
    fn test_unknown_prefix_values_fall_back_to_search() {
        let q = FilterSpec::parse("s:shelved r:lots");
        assert_eq!(q.search, "s:shelved r:lots");
        assert!(q.statuses.is_empty());
        assert!(q.min_rating.is_none());
    }

    #[test]
    fn test_sort_term() {
        let q = LibraryQuery::parse("dune sort:rating_desc");
        assert_eq!(q.sort, Some(SortSpec::desc(SortField::Rating)));
        assert_eq!(q.filter.search, "dune");
    }

    #[test]
    fn test_empty_query() {
        assert!(FilterSpec::parse("   ").is_empty());
    }
}
