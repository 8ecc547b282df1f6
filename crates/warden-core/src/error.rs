//! Error types for warden-core

use thiserror::Error;

/// Result type alias using warden-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in warden-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Primary backend error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local cache write failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}
