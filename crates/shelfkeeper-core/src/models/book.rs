use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::resolve_date;

// ─── BookRecord ─────────────────────────────────────────────

/// A single catalogued book, as stored in the user's document store.
///
/// Records arrive already scoped to one user. `deleted_at` marks a soft
/// delete; such records are hidden from every active-library view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Free-form publication date as entered or fetched (`2005`, `2005-08-01`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_format: Option<PhysicalFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    #[serde(default)]
    pub genres: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_position: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub reads: Vec<ReadingSession>,

    /// Cover URLs keyed by source name (`openLibrary`, `googleBooks`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub covers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,

    #[serde(default)]
    pub images: Vec<BookImage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BookRecord {
    /// Create a record with the required descriptive fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether any cover source or explicit cover URL is present.
    pub fn has_cover(&self) -> bool {
        self.covers.values().any(|url| !url.trim().is_empty())
            || self
                .cover_image_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty())
    }

    /// Reading status derived from the recorded sessions.
    pub fn reading_status(&self) -> ReadingStatus {
        match self.reads.last() {
            None => ReadingStatus::Unread,
            Some(session) if session.finished().is_some() => ReadingStatus::Read,
            Some(_) => ReadingStatus::Reading,
        }
    }

    pub fn primary_image(&self) -> Option<&BookImage> {
        self.images.iter().find(|image| image.is_primary)
    }
}

// ─── Reading sessions ──────────────────────────────────────

/// One pass through a book. Dates are kept as entered and resolved lazily.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl ReadingSession {
    pub fn new(started_at: Option<&str>, finished_at: Option<&str>) -> Self {
        Self {
            started_at: started_at.map(str::to_string),
            finished_at: finished_at.map(str::to_string),
        }
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started_at.as_deref().and_then(resolve_date)
    }

    pub fn finished(&self) -> Option<DateTime<Utc>> {
        self.finished_at.as_deref().and_then(resolve_date)
    }

    /// A finish date without a start, or a finish before the start.
    pub fn is_inconsistent(&self) -> bool {
        match (self.started(), self.finished()) {
            (Some(started), Some(finished)) => finished < started,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Unread,
    Reading,
    Read,
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unread => write!(f, "unread"),
            Self::Reading => write!(f, "reading"),
            Self::Read => write!(f, "read"),
        }
    }
}

impl std::str::FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unread" | "want" | "to-read" => Ok(Self::Unread),
            "reading" | "current" => Ok(Self::Reading),
            "read" | "finished" => Ok(Self::Read),
            other => Err(format!("unknown reading status: {other}")),
        }
    }
}

// ─── Format ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhysicalFormat {
    Paperback,
    Hardcover,
    #[serde(rename = "Mass Market Paperback")]
    MassMarketPaperback,
    #[serde(rename = "eBook")]
    Ebook,
    #[serde(rename = "Audiobook")]
    Audiobook,
    Other,
}

impl std::fmt::Display for PhysicalFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Paperback => "Paperback",
            Self::Hardcover => "Hardcover",
            Self::MassMarketPaperback => "Mass Market Paperback",
            Self::Ebook => "eBook",
            Self::Audiobook => "Audiobook",
            Self::Other => "Other",
        };
        write!(f, "{s}")
    }
}

// ─── Images ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookImage {
    pub id: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(default)]
    pub is_primary: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

// ─── Tests ─────────────────────────────────────────────────
