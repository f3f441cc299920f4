//! Error types for the `Ringside` core library.

use thiserror::Error;

/// Result type alias using `Ringside` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Ringside` session handling.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session data violates the "token and profile together" invariant
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Durable storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
