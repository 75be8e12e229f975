//! Display rows for the operator's tables.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempgrant_core::{statement, ExecutionLogEntry, GrantRequest, RequestId, RequestStatus};

use crate::revocation::RevocationOutcome;

/// One row of the recent-requests table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRow {
    pub request_id: RequestId,
    pub user_name: String,
    pub scheduled_end_ts_utc: DateTime<Utc>,
    pub statement_preview: String,
    pub status: RequestStatus,
    /// Only pending requests offer early revocation.
    pub can_revoke: bool,
}

impl RequestRow {
    pub fn from_request(request: &GrantRequest, preview_chars: usize) -> Self {
        Self {
            request_id: request.request_id,
            user_name: request.user_name.clone(),
            scheduled_end_ts_utc: request.scheduled_end_ts_utc,
            statement_preview: statement::preview(&request.grant_statement, preview_chars),
            status: request.status,
            can_revoke: request.is_pending(),
        }
    }
}

/// Counts shown above the requests table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub shown: usize,
    pub pending: usize,
}

impl RequestSummary {
    pub fn from_rows(rows: &[RequestRow]) -> Self {
        Self {
            shown: rows.len(),
            pending: rows.iter().filter(|row| row.can_revoke).count(),
        }
    }
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shown == 0 {
            return f.write_str("No revocation requests found");
        }
        write!(
            f,
            "Showing {} revocation request(s): {} pending",
            self.shown, self.pending
        )
    }
}

/// Everything one render of the operator view needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Revocation outcomes held for display, by request id.
    pub outcomes: Vec<RevocationOutcome>,
    pub requests: Vec<RequestRow>,
    pub summary: RequestSummary,
    pub executions: Vec<ExecutionLogEntry>,
    /// The grant statement being edited, if any.
    pub staged_grant_input: Option<String>,
}
