use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] mysched_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Session ID cannot be empty")]
    EmptySessionId,
    #[error("Nothing recorded for session: {0}")]
    SessionNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `mysched config init --remote <PATH|URL>`, set MYSCHED_REMOTE, or pass --remote."
    )]
    SyncNotConfigured,
}
