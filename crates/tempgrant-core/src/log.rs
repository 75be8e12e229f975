//! Execution log entries.
//!
//! Every privilege-mutating action attempted by the grant or revoke
//! procedure leaves one entry. The log is append-only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::LogId;

/// Outcome of a logged execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Completed,
    Error,
}

impl ExecutionStatus {
    /// The persisted spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(ExecutionStatus::Completed),
            "ERROR" => Ok(ExecutionStatus::Error),
            other => Err(CoreError::UnknownExecutionStatus(other.to_string())),
        }
    }
}

/// A persisted execution log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub log_id: LogId,
    pub user_name: String,
    /// The statement or action that was attempted.
    pub executed_statement_or_action: String,
    pub exe_ts_utc: DateTime<Utc>,
    /// Identifier handed back by the executing engine (e.g. a query id).
    pub external_reference: Option<String>,
    pub status: ExecutionStatus,
}

/// Fields supplied when appending to the log; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub user_name: String,
    pub executed_statement_or_action: String,
    pub exe_ts_utc: DateTime<Utc>,
    pub external_reference: Option<String>,
    pub status: ExecutionStatus,
}

impl NewLogEntry {
    /// A successful execution.
    pub fn completed(
        user_name: impl Into<String>,
        statement: impl Into<String>,
        at: DateTime<Utc>,
        external_reference: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            executed_statement_or_action: statement.into(),
            exe_ts_utc: at,
            external_reference: Some(external_reference.into()),
            status: ExecutionStatus::Completed,
        }
    }

    /// A failed execution. No external reference is available.
    pub fn failed(
        user_name: impl Into<String>,
        statement: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            executed_statement_or_action: statement.into(),
            exe_ts_utc: at,
            external_reference: None,
            status: ExecutionStatus::Error,
        }
    }

    /// Attach a store-assigned id.
    pub fn into_entry(self, log_id: LogId) -> ExecutionLogEntry {
        ExecutionLogEntry {
            log_id,
            user_name: self.user_name,
            executed_statement_or_action: self.executed_statement_or_action,
            exe_ts_utc: self.exe_ts_utc,
            external_reference: self.external_reference,
            status: self.status,
        }
    }
}
