//! Error types for the core types.

use thiserror::Error;

/// Errors raised while decoding or constructing core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown request status: {0}")]
    UnknownRequestStatus(String),

    #[error("unknown execution status: {0}")]
    UnknownExecutionStatus(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("invalid hour of day: {0}")]
    InvalidHour(u32),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
