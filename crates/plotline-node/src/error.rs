//! Error types for the Plotline node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in node operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Id prefix matches more than one entrant
    #[error("Ambiguous id: {0}")]
    Ambiguous(String),

    /// Email already on the waitlist
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Ordering or validation failure from the core
    #[error(transparent)]
    Core(#[from] plotline_core::Error),

    /// CAPTCHA verification could not be completed
    #[error("CAPTCHA error: {0}")]
    Captcha(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Captcha(e.to_string())
    }
}
