//! Error types for mysched-core

use thiserror::Error;

/// Result type alias using mysched-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mysched-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input, rejected before anything is stored
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote user data store rejected a request
    #[error("Remote error: {0}")]
    Remote(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error came from local storage (disk or database).
    ///
    /// The store never retries these; callers decide.
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_))
    }
}
