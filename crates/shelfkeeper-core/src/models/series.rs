use serde::{Deserialize, Serialize};

/// A named series with an optional list of the books it is expected to contain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRecord {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_books: Option<u32>,

    #[serde(default)]
    pub expected_books: Vec<ExpectedBook>,
}

impl SeriesRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Expected size of the series: `total_books` when known, otherwise the
    /// length of the expected-book list (if any).
    pub fn expected_count(&self) -> Option<usize> {
        self.total_books
            .map(|n| n as usize)
            .or_else(|| (!self.expected_books.is_empty()).then_some(self.expected_books.len()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedBook {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,

    #[serde(default)]
    pub source: ExpectedBookSource,
}

/// Where an expected-book entry came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedBookSource {
    Api,
    #[default]
    Manual,
}
