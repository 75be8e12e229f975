//! In-process grant and sweep procedures over any [`Store`].
//!
//! Behaves like the host-database procedures: a grant executes first and
//! is only recorded as a pending request once execution succeeded; a sweep
//! revokes every pending request that is due at call time and logs each
//! attempt.
//!
//! A grant that executed but could not be recorded is undone with its
//! mirrored `REVOKE`. Sweeps on one instance never overlap.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempgrant_core::{
    floor_to_minute, statement, Clock, GrantRequest, NewGrantRequest, NewLogEntry, RequestId,
};
use tempgrant_store::{Store, StoreError};
use tokio::sync::Mutex;

use crate::error::{ProcedureError, Result};
use crate::executor::PrivilegeExecutor;
use crate::procedures::{GrantReceipt, Procedures, SweepSummary};

/// Reference implementation of the grant and sweep procedures.
pub struct LocalProcedures<S: Store, E: PrivilegeExecutor> {
    store: Arc<S>,
    executor: E,
    clock: Arc<dyn Clock>,
    /// Held for a whole sweep pass.
    sweep_lock: Mutex<()>,
}

impl<S: Store, E: PrivilegeExecutor> LocalProcedures<S, E> {
    pub fn new(store: Arc<S>, executor: E, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            executor,
            clock,
            sweep_lock: Mutex::new(()),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the executor reference.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Revoke one due request. Returns the failure reason if it stays pending.
    async fn revoke_one(
        &self,
        request: &GrantRequest,
        now: DateTime<Utc>,
    ) -> Result<std::result::Result<bool, String>> {
        let Some(revoke) = statement::revoke_statement_for(&request.grant_statement) else {
            let reason = format!(
                "cannot derive a revoke statement from: {}",
                request.grant_statement
            );
            self.store
                .append_log(&NewLogEntry::failed(
                    &request.user_name,
                    &request.grant_statement,
                    now,
                ))
                .await?;
            return Ok(Err(reason));
        };

        match self.executor.execute(&revoke).await {
            Ok(query_id) => {
                self.store
                    .append_log(&NewLogEntry::completed(
                        &request.user_name,
                        &revoke,
                        now,
                        query_id,
                    ))
                    .await?;
                Ok(Ok(self.store.mark_revoked(request.request_id).await?))
            }
            Err(ProcedureError::Rejected(reason)) => {
                self.store
                    .append_log(&NewLogEntry::failed(&request.user_name, &revoke, now))
                    .await?;
                Ok(Err(reason))
            }
            Err(other) => Err(other),
        }
    }

    /// Log a completed grant and schedule its revocation.
    async fn record_grant(
        &self,
        acting_user: &str,
        statement: &str,
        now: DateTime<Utc>,
        query_id: &str,
        expiry: DateTime<Utc>,
    ) -> std::result::Result<RequestId, StoreError> {
        self.store
            .append_log(&NewLogEntry::completed(acting_user, statement, now, query_id))
            .await?;
        self.store
            .insert_request(&NewGrantRequest {
                user_name: acting_user.to_string(),
                grant_statement: statement.to_string(),
                scheduled_end_ts_utc: expiry,
            })
            .await
    }

    /// Undo an executed grant that has no request row to revoke it later.
    ///
    /// Logging here is best effort.
    async fn undo_unrecorded_grant(
        &self,
        acting_user: &str,
        statement: &str,
        now: DateTime<Utc>,
        cause: &StoreError,
    ) {
        let Some(revoke) = statement::revoke_statement_for(statement) else {
            tracing::error!(
                user = acting_user,
                error = %cause,
                "grant executed but not recorded, and no revoke statement can undo it"
            );
            return;
        };

        let entry = match self.executor.execute(&revoke).await {
            Ok(query_id) => {
                tracing::warn!(
                    user = acting_user,
                    query_id = %query_id,
                    error = %cause,
                    "grant undone after store failure"
                );
                NewLogEntry::completed(acting_user, &revoke, now, query_id)
            }
            Err(err) => {
                tracing::error!(
                    user = acting_user,
                    error = %err,
                    cause = %cause,
                    "grant executed but not recorded, and undoing it failed"
                );
                NewLogEntry::failed(acting_user, &revoke, now)
            }
        };
        if let Err(err) = self.store.append_log(&entry).await {
            tracing::warn!(error = %err, "could not log undo of unrecorded grant");
        }
    }
}

#[async_trait]
impl<S: Store, E: PrivilegeExecutor> Procedures for LocalProcedures<S, E> {
    async fn grant(
        &self,
        statement: &str,
        expiry_utc: DateTime<Utc>,
        acting_user: &str,
    ) -> Result<GrantReceipt> {
        let now = self.clock.now_utc();
        let expiry = floor_to_minute(expiry_utc);

        let query_id = match self.executor.execute(statement).await {
            Ok(query_id) => query_id,
            Err(ProcedureError::Rejected(reason)) => {
                self.store
                    .append_log(&NewLogEntry::failed(acting_user, statement, now))
                    .await?;
                return Err(ProcedureError::Rejected(reason));
            }
            Err(other) => return Err(other),
        };

        let request_id = match self
            .record_grant(acting_user, statement, now, &query_id, expiry)
            .await
        {
            Ok(request_id) => request_id,
            Err(err) => {
                self.undo_unrecorded_grant(acting_user, statement, now, &err)
                    .await;
                return Err(err.into());
            }
        };

        tracing::info!(
            request_id = %request_id,
            user = acting_user,
            query_id = %query_id,
            "grant executed"
        );

        Ok(GrantReceipt {
            request_id,
            message: format!(
                "SUCCESS: grant executed (query {}); request {} is scheduled for revocation at {} UTC",
                query_id,
                request_id,
                expiry.format("%Y-%m-%d %H:%M")
            ),
        })
    }

    async fn sweep_due_revocations(&self) -> Result<SweepSummary> {
        // Listing happens under the lock so a second pass never sees rows
        // the first one is still revoking.
        let _pass = self.sweep_lock.lock().await;
        let now = self.clock.now_utc();
        let due = self.store.list_due(now).await?;

        let mut revoked = Vec::new();
        let mut failed: Vec<(RequestId, String)> = Vec::new();

        for request in &due {
            match self.revoke_one(request, now).await? {
                Ok(true) => revoked.push(request.request_id),
                // Someone else revoked it between listing and marking.
                Ok(false) => {}
                Err(reason) => {
                    tracing::warn!(request_id = %request.request_id, %reason, "revocation failed");
                    failed.push((request.request_id, reason));
                }
            }
        }

        if !failed.is_empty() {
            let details: Vec<String> = failed
                .iter()
                .map(|(id, reason)| format!("request {}: {}", id, reason))
                .collect();
            return Err(ProcedureError::Rejected(format!(
                "ERROR: {} of {} due grant(s) could not be revoked ({})",
                failed.len(),
                due.len(),
                details.join("; ")
            )));
        }

        tracing::info!(revoked = revoked.len(), "revocation sweep completed");
        Ok(SweepSummary {
            swept_at: now,
            revoked,
        })
    }
}
