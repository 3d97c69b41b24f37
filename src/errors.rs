use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for Orgaplex
#[derive(Error, Debug)]
pub enum OrgaplexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    /// The dataset layout could not be classified. Aborts the run.
    #[error("Dataset structure error: {0}")]
    Structure(String),

    /// A measurement file failed its numeric or range checks.
    #[error("Validation failed for {}: {reason}", path.display())]
    Validation {
        path: PathBuf,
        reason: String,
    },

    /// A whole bait or organelle produced no usable rows.
    #[error("No usable data for {0}")]
    EmptyResult(String),

    #[error("Unknown organelle '{name}'. Available: {available}")]
    UnknownOrganelle {
        name: String,
        available: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl OrgaplexError {
    pub(crate) fn validation<P: Into<PathBuf>>(path: P, reason: impl Into<String>) -> Self {
        OrgaplexError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, OrgaplexError>;
