use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistsupError {
    #[error("Rules file not found: {path}")]
    RulesNotFound { path: PathBuf },

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Failed to parse rules file {path}: {message}")]
    RulesParse { path: PathBuf, message: String },

    #[error("Unsupported keyword mode: '{mode}' - expected one of in, split, regex")]
    UnsupportedKeywordMode { mode: String },

    #[error("Unsupported group mode: '{mode}' - expected one of any, all")]
    UnsupportedGroupMode { mode: String },

    #[error("Criterion '{criterion}' declares category '{category}' more than once")]
    DuplicateCategory { criterion: String, category: String },

    #[error("Group criterion '{name}' needs at least one child criterion")]
    EmptyGroup { name: String },

    #[error(
        "Group criterion '{group}': child '{child}' has categories {found:?}, expected {expected:?}"
    )]
    CategoryMismatch {
        group: String,
        child: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Library pattern '{pattern}' in criterion '{criterion}' requires keyword_mode = \"regex\"")]
    LibraryPatternOutsideRegex { criterion: String, pattern: String },

    #[error("Invalid regex for keyword '{keyword}': {source}")]
    InvalidRegex {
        keyword: String,
        #[source]
        source: regex::Error,
    },

    #[error("Malformed record at {path}:{line}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, DistsupError>;

impl DistsupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RulesParse { .. }
            | Self::UnsupportedKeywordMode { .. }
            | Self::UnsupportedGroupMode { .. }
            | Self::DuplicateCategory { .. }
            | Self::EmptyGroup { .. }
            | Self::CategoryMismatch { .. }
            | Self::LibraryPatternOutsideRegex { .. }
            | Self::InvalidRegex { .. } => 2,
            Self::RulesNotFound { .. } | Self::InputNotFound { .. } => 3,
            Self::MalformedRecord { .. } => 4,
            _ => 1,
        }
    }
}
