//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted value could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The backing store cannot be reached (lock poisoned, worker gone, injected outage).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tempgrant_core::CoreError> for StoreError {
    fn from(e: tempgrant_core::CoreError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
