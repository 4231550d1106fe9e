use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ShelfError};
use crate::filter::SortSpec;

/// Root configuration, loaded from `~/.config/shelfkeeper/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub library: LibraryConfig,
    pub duplicates: DuplicateConfig,
    pub display: DisplayConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// JSON snapshot exported from the document store.
    pub snapshot_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub title_similarity_threshold: f64,
    pub min_fuzzy_title_len: usize,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_sort: String,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a soft-deleted book is kept before it may be purged.
    pub days: i64,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for LibraryConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("shelfkeeper");

        Self {
            snapshot_path: data_dir.join("library.json").to_string_lossy().to_string(),
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.8,
            min_fuzzy_title_len: 5,
            include_deleted: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_sort: "updated_desc".to_string(),
            page_size: 50,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: crate::retention::DEFAULT_RETENTION_DAYS,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl ShelfConfig {
    /// Standard config file path: `~/.config/shelfkeeper/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHELFKEEPER_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelfkeeper")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the analysis cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.retention.days < 0 {
            return Err(ShelfError::Config(format!(
                "retention.days must not be negative, got {}",
                self.retention.days
            )));
        }
        let threshold = self.duplicates.title_similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ShelfError::Config(format!(
                "duplicates.title_similarity_threshold must be within 0..=1, got {threshold}"
            )));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn set_snapshot_path(&mut self, path: PathBuf) {
        self.library.snapshot_path = path.to_string_lossy().to_string();
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.library.snapshot_path)
    }

    /// The configured default sort; an unknown key falls back to `updated_desc`.
    pub fn default_sort(&self) -> SortSpec {
        self.display.default_sort.parse().unwrap_or_else(|err| {
            warn!(key = %self.display.default_sort, "{err}, using updated_desc");
            SortSpec::default()
        })
    }
}
