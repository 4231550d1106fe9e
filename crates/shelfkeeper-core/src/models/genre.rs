use serde::{Deserialize, Serialize};

/// A user-defined genre. `color` is only used for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreRecord {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl GenreRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_new() {
        let genre = GenreRecord::new("g1", "Science Fiction");
        assert_eq!(genre.name, "Science Fiction");
        assert!(genre.color.is_none());
    }
}
