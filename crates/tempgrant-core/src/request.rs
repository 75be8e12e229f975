//! Grant requests: one row per temporary grant, tracked until revocation.
//!
//! A request is created only after the privilege mutation succeeded. Its
//! user and statement never change. The scheduled end may be pulled
//! forward once by a manual revocation, and the status moves from
//! `Pending` to `Revoked` exactly once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::RequestId;

/// Lifecycle status of a grant request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Granted and waiting for its scheduled revocation.
    Pending,
    /// Revoked by a sweep. Terminal.
    Revoked,
}

impl RequestStatus {
    /// The persisted spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Revoked => "REVOKED",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Staying put is always legal; the only move is `Pending -> Revoked`.
    pub fn can_become(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, _) | (RequestStatus::Revoked, RequestStatus::Revoked)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "REVOKED" => Ok(RequestStatus::Revoked),
            other => Err(CoreError::UnknownRequestStatus(other.to_string())),
        }
    }
}

/// A persisted grant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub request_id: RequestId,

    /// The principal the grant applies to (the acting user recorded at grant time).
    pub user_name: String,

    /// The statement that was executed. Kept for audit, never re-parsed here.
    pub grant_statement: String,

    /// When the grant should be revoked (UTC, minute granularity).
    pub scheduled_end_ts_utc: DateTime<Utc>,

    pub status: RequestStatus,
}

impl GrantRequest {
    /// Whether the request still awaits revocation.
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Whether a sweep at `now` must revoke this request.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.scheduled_end_ts_utc <= now
    }
}

/// Fields supplied when inserting a request; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrantRequest {
    pub user_name: String,
    pub grant_statement: String,
    pub scheduled_end_ts_utc: DateTime<Utc>,
}

impl NewGrantRequest {
    /// Attach a store-assigned id. New requests always start `Pending`.
    pub fn into_request(self, request_id: RequestId) -> GrantRequest {
        GrantRequest {
            request_id,
            user_name: self.user_name,
            grant_statement: self.grant_statement,
            scheduled_end_ts_utc: self.scheduled_end_ts_utc,
            status: RequestStatus::Pending,
        }
    }
}
