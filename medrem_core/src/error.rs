//! Error types for the medrem_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medrem_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed time-of-day or date string
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Caller-level validation failure (empty name, empty skip reason, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced medication does not exist in the catalog
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote catalog import failed; nothing was merged
    #[error("Import error: {0}")]
    Import(#[source] Box<Error>),
}

impl Error {
    /// Wrap any error as the cause of a failed import.
    pub fn import(cause: impl Into<Error>) -> Self {
        Error::Import(Box::new(cause.into()))
    }
}
