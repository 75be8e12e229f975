//! Error types for the procedures module.

use thiserror::Error;

/// Errors surfaced by the grant and sweep procedures.
#[derive(Debug, Error)]
pub enum ProcedureError {
    /// The procedure ran and failed with a recognizable reason.
    #[error("{0}")]
    Rejected(String),

    /// The procedure could not be reached (connection or session lost).
    #[error("session unavailable: {0}")]
    Unavailable(String),

    /// The procedure's own bookkeeping failed.
    #[error("store error: {0}")]
    Store(#[from] tempgrant_store::StoreError),
}

/// Result type for procedure calls.
pub type Result<T> = std::result::Result<T, ProcedureError>;
