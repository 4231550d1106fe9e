use thiserror::Error;

/// All errors that can occur in shelfkeeper-core.
///
/// The analysis functions themselves never fail; errors only arise at the
/// boundaries (loading snapshots, reading config, validating records).
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// A structural defect found while admitting a record into the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind} record has an empty id")]
    EmptyId { kind: &'static str },

    #[error("book {id}: title must not be empty")]
    EmptyTitle { id: String },

    #[error("book {id}: author must not be empty")]
    EmptyAuthor { id: String },

    #[error("book {id}: page count must be positive")]
    ZeroPageCount { id: String },

    #[error("book {id}: rating {rating} is outside 0-5")]
    RatingOutOfRange { id: String, rating: u8 },

    #[error("book {id}: notes are {len} characters, limit is {max}")]
    NotesTooLong { id: String, len: usize, max: usize },

    #[error("book {id}: series position must be a non-negative number")]
    InvalidSeriesPosition { id: String },

    #[error("book {id}: {count} images are marked primary")]
    MultiplePrimaryImages { id: String, count: usize },

    #[error("{kind} {id}: name must not be empty")]
    EmptyName { kind: &'static str, id: String },

    #[error("series {id}: expected book positions must be finite numbers")]
    InvalidExpectedPosition { id: String },

    #[error("series {id}: expected books share position {position}")]
    DuplicateExpectedPosition { id: String, position: f64 },

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
}

/// Exit codes used by the command-line front end.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    ValidationError = 5,
}

impl ShelfError {
    /// Map an error onto the process exit code the CLI should report.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::BookNotFound(_) | Self::SeriesNotFound(_) => ExitCode::NotFound,
            Self::Validation(_) | Self::Json(_) => ExitCode::ValidationError,
            Self::Config(_) | Self::TomlParse(_) | Self::TomlSerialize(_) => ExitCode::InvalidArgs,
            Self::Io(_) => ExitCode::FileSystemError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
