//! Store trait: the abstract interface for request and log persistence.
//!
//! The orchestration layer only ever touches one row per logical action,
//! so every operation here is atomic at the row level and no multi-row
//! transaction is exposed. Implementations include SQLite (primary) and
//! in-memory (for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempgrant_core::{ExecutionLogEntry, GrantRequest, LogId, NewGrantRequest, NewLogEntry, RequestId};

use crate::error::Result;

/// Result of rewriting a request's scheduled end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// The pending request now ends at the new time.
    Updated,
    /// The request exists but has already been revoked; nothing changed.
    NotPending,
    /// No request with that id.
    NotFound,
}

/// The Store trait: async interface for the request store and execution log.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, `spawn_blocking` keeps the runtime free.
///
/// # Design Notes
///
/// - **Monotonic status**: `mark_revoked` only moves `Pending -> Revoked`.
/// - **Revoked rows are frozen**: `update_end_time` refuses revoked rows so
///   they can never become due again.
/// - **Append-only log**: there is no update or delete for log entries.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Request Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new `Pending` request and return its assigned id.
    async fn insert_request(&self, request: &NewGrantRequest) -> Result<RequestId>;

    /// Get a request by id.
    async fn get_request(&self, id: RequestId) -> Result<Option<GrantRequest>>;

    /// Rewrite the scheduled end of a pending request.
    async fn update_end_time(&self, id: RequestId, end_ts_utc: DateTime<Utc>)
        -> Result<UpdateResult>;

    /// Move a pending request to `Revoked`.
    ///
    /// Returns `false` (and changes nothing) if the request is unknown or
    /// already revoked.
    async fn mark_revoked(&self, id: RequestId) -> Result<bool>;

    /// The `limit` requests with the latest scheduled end, latest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<GrantRequest>>;

    /// Every pending request with `scheduled_end_ts_utc <= now`, by id.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<GrantRequest>>;

    /// Number of requests in the store.
    async fn count_requests(&self) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Log Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an entry to the execution log.
    async fn append_log(&self, entry: &NewLogEntry) -> Result<LogId>;

    /// The `limit` most recent log entries, newest execution first.
    async fn recent_log(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>>;

    /// Number of entries in the execution log.
    async fn count_log(&self) -> Result<usize>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn insert_request(&self, request: &NewGrantRequest) -> Result<RequestId> {
        (**self).insert_request(request).await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<GrantRequest>> {
        (**self).get_request(id).await
    }

    async fn update_end_time(
        &self,
        id: RequestId,
        end_ts_utc: DateTime<Utc>,
    ) -> Result<UpdateResult> {
        (**self).update_end_time(id, end_ts_utc).await
    }

    async fn mark_revoked(&self, id: RequestId) -> Result<bool> {
        (**self).mark_revoked(id).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<GrantRequest>> {
        (**self).list_recent(limit).await
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<GrantRequest>> {
        (**self).list_due(now).await
    }

    async fn count_requests(&self) -> Result<usize> {
        (**self).count_requests().await
    }

    async fn append_log(&self, entry: &NewLogEntry) -> Result<LogId> {
        (**self).append_log(entry).await
    }

    async fn recent_log(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        (**self).recent_log(limit).await
    }

    async fn count_log(&self) -> Result<usize> {
        (**self).count_log().await
    }
}
