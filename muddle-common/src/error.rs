//! Common error types for muddle

use thiserror::Error;

/// Common result type for muddle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the muddle crates
///
/// The `NotFound` / `Duplicate` / `InvalidInput` / `Upstream` variants carry
/// the exact message shown to API clients, so their display form is the bare
/// payload.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record encoding/decoding error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("{0}")]
    NotFound(String),

    /// Identifier already taken on creation
    #[error("{0}")]
    Duplicate(String),

    /// Invalid user input or request parameter
    #[error("{0}")]
    InvalidInput(String),

    /// External service failure
    #[error("{0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
