//! Error types for temporary-access orchestration.
//!
//! Every failure is surfaced with its reason text intact. None is retried
//! automatically and none leaves the session unusable.

use std::fmt;

use serde::Serialize;
use tempgrant_core::RequestId;
use tempgrant_procs::ProcedureError;
use tempgrant_store::StoreError;
use thiserror::Error;

/// Which half of a manual revocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStep {
    /// Pulling the scheduled end forward to now.
    Reschedule,
    /// Running the revocation sweep after a successful reschedule.
    Sweep,
}

impl fmt::Display for ReconciliationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationStep::Reschedule => f.write_str("reschedule"),
            ReconciliationStep::Sweep => f.write_str("sweep"),
        }
    }
}

/// Errors that can occur during temporary-access operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// No attributable acting user; nothing was executed.
    #[error("could not determine the acting user; grants require an attributable user")]
    IdentityUnresolved,

    /// The grant statement was blank.
    #[error("grant statement is empty")]
    EmptyStatement,

    /// The grant procedure ran and failed.
    #[error("grant execution failed: {0}")]
    GrantExecutionFailed(String),

    /// The procedure could not be reached.
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    /// A manual revocation failed part-way.
    ///
    /// For `Sweep`, `rescheduled` carries the successful reschedule report.
    #[error("{step} failed for request {request_id}: {reason}{}", rescheduled_suffix(.rescheduled))]
    ReconciliationFailure {
        request_id: RequestId,
        step: ReconciliationStep,
        reason: String,
        rescheduled: Option<String>,
    },

    /// The request store could not be read or written.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// No request with that id.
    #[error("request {0} not found")]
    RequestNotFound(RequestId),
}

fn rescheduled_suffix(rescheduled: &Option<String>) -> String {
    match rescheduled {
        Some(report) => format!(" (after: {})", report),
        None => String::new(),
    }
}

impl From<StoreError> for AccessError {
    fn from(e: StoreError) -> Self {
        AccessError::StoreUnavailable(e.to_string())
    }
}

impl From<ProcedureError> for AccessError {
    fn from(e: ProcedureError) -> Self {
        match e {
            ProcedureError::Rejected(reason) => AccessError::GrantExecutionFailed(reason),
            ProcedureError::Unavailable(reason) => AccessError::SessionUnavailable(reason),
            ProcedureError::Store(e) => AccessError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Result type for temporary-access operations.
pub type Result<T> = std::result::Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_failure_mentions_both_steps() {
        let err = AccessError::ReconciliationFailure {
            request_id: RequestId::new(42),
            step: ReconciliationStep::Sweep,
            reason: "warehouse suspended".into(),
            rescheduled: Some("request 42 end time moved to 2024-03-01 12:00 UTC".into()),
        };
        let text = err.to_string();
        assert!(text.starts_with("sweep failed for request 42: warehouse suspended"));
        assert!(text.contains("end time moved"));
    }

    #[test]
    fn test_procedure_errors_map_to_taxonomy() {
        assert_eq!(
            AccessError::from(ProcedureError::Rejected("bad".into())),
            AccessError::GrantExecutionFailed("bad".into())
        );
        assert_eq!(
            AccessError::from(ProcedureError::Unavailable("gone".into())),
            AccessError::SessionUnavailable("gone".into())
        );
    }
}
