//! TempAccess: unified API for temporary privilege grants.
//!
//! Brings the request store, the grant and sweep procedures, and the
//! per-session revocation state together behind one handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempgrant_core::{default_expiry, Clock, ExecutionLogEntry, GrantRequest, IdentityProvider, RequestId};
use tempgrant_procs::{GrantReceipt, LocalProcedures, PrivilegeExecutor, Procedures, SweepSummary};
use tempgrant_store::Store;

use crate::error::{AccessError, Result};
use crate::grant::GrantOrchestrator;
use crate::revocation::{RevocationCoordinator, RevocationOutcome};
use crate::session::{RevocationAck, SessionContext};
use crate::views::{Dashboard, RequestRow, RequestSummary};

/// Configuration for TempAccess.
#[derive(Debug, Clone)]
pub struct TempAccessConfig {
    /// Rows shown in the recent requests and executions tables.
    pub recent_limit: usize,
    /// Characters of a stored statement shown before it is cut.
    pub statement_preview_chars: usize,
    /// Hours ahead the default expiry is placed.
    pub default_grant_hours: i64,
}

impl Default for TempAccessConfig {
    fn default() -> Self {
        Self {
            recent_limit: 20,
            statement_preview_chars: 50,
            default_grant_hours: 1,
        }
    }
}

/// The main TempAccess struct.
///
/// Provides a unified API for:
/// - Granting privileges with a scheduled expiry
/// - Revoking a pending grant early
/// - Running the scheduled revocation sweep
/// - Reading the recent requests and execution log
pub struct TempAccess<S: Store, P: Procedures> {
    store: Arc<S>,
    procedures: Arc<P>,
    clock: Arc<dyn Clock>,
    config: TempAccessConfig,
    grants: GrantOrchestrator<P>,
    revocations: RevocationCoordinator<S, P>,
}

impl<S: Store, P: Procedures> TempAccess<S, P> {
    /// Create a new instance over a store and the procedures that write to it.
    pub fn new(
        store: Arc<S>,
        procedures: Arc<P>,
        clock: Arc<dyn Clock>,
        config: TempAccessConfig,
    ) -> Self {
        Self {
            grants: GrantOrchestrator::new(procedures.clone()),
            revocations: RevocationCoordinator::new(
                store.clone(),
                procedures.clone(),
                clock.clone(),
            ),
            store,
            procedures,
            clock,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the procedures reference.
    pub fn procedures(&self) -> &P {
        &self.procedures
    }

    pub fn config(&self) -> &TempAccessConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// The expiry offered when the operator has not picked one.
    pub fn default_expiry(&self) -> DateTime<Utc> {
        default_expiry(self.clock.now_utc(), self.config.default_grant_hours)
    }

    /// Grant a privilege that expires at `expiry_utc`.
    pub async fn grant(
        &self,
        session: &SessionContext,
        identity: &dyn IdentityProvider,
        statement: &str,
        expiry_utc: DateTime<Utc>,
    ) -> Result<GrantReceipt> {
        self.grants
            .submit(session, identity, statement, expiry_utc)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revocation
    // ─────────────────────────────────────────────────────────────────────────

    /// Flag a request for early revocation. No I/O happens here.
    pub fn request_revocation(
        &self,
        session: &SessionContext,
        request_id: RequestId,
    ) -> RevocationAck {
        session.request_revocation(request_id)
    }

    /// Run the accepted revocation for one request, if any.
    pub async fn process_revocation(
        &self,
        session: &SessionContext,
        request_id: RequestId,
    ) -> Option<RevocationOutcome> {
        self.revocations.process(session, request_id).await
    }

    /// Run every accepted revocation in the session.
    pub async fn process_revocations(&self, session: &SessionContext) -> Vec<RevocationOutcome> {
        self.revocations.process_all(session).await
    }

    /// The scheduled revocation pass.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        match self.procedures.sweep_due_revocations().await {
            Ok(summary) => {
                tracing::debug!(revoked = summary.revoked.len(), "scheduled sweep completed");
                Ok(summary)
            }
            Err(e) => {
                let err = AccessError::from(e);
                tracing::warn!(error = %err, "scheduled sweep failed");
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a single request.
    pub async fn request(&self, request_id: RequestId) -> Result<GrantRequest> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or(AccessError::RequestNotFound(request_id))
    }

    /// The most recent requests, latest scheduled end first.
    pub async fn recent_requests(&self) -> Result<Vec<RequestRow>> {
        let requests = self.store.list_recent(self.config.recent_limit).await?;
        Ok(requests
            .iter()
            .map(|request| RequestRow::from_request(request, self.config.statement_preview_chars))
            .collect())
    }

    /// The most recent execution log entries, latest first.
    pub async fn recent_executions(&self) -> Result<Vec<ExecutionLogEntry>> {
        Ok(self.store.recent_log(self.config.recent_limit).await?)
    }

    /// Process accepted revocations, then read everything one render shows.
    ///
    /// Held outcomes are delivered by this call, and only when every read
    /// succeeded; a failed render leaves them undelivered.
    pub async fn render(&self, session: &SessionContext) -> Result<Dashboard> {
        self.revocations.process_all(session).await;

        let requests = self.recent_requests().await?;
        let summary = RequestSummary::from_rows(&requests);
        let executions = self.recent_executions().await?;
        let outcomes = session.deliver_outcomes();

        Ok(Dashboard {
            outcomes,
            requests,
            summary,
            executions,
            staged_grant_input: session.staged_grant_input(),
        })
    }
}

impl<S: Store, E: PrivilegeExecutor> TempAccess<S, LocalProcedures<S, E>> {
    /// Wire the in-process procedures over `store`.
    pub fn local(
        store: Arc<S>,
        executor: E,
        clock: Arc<dyn Clock>,
        config: TempAccessConfig,
    ) -> Self {
        let procedures = Arc::new(LocalProcedures::new(store.clone(), executor, clock.clone()));
        Self::new(store, procedures, clock, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempgrant_core::{FixedClock, RequestStatus, StaticIdentity};
    use tempgrant_procs::RecordingExecutor;
    use tempgrant_store::MemoryStore;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 17, 45).unwrap()
    }

    fn setup() -> (
        TempAccess<MemoryStore, LocalProcedures<MemoryStore, RecordingExecutor>>,
        Arc<FixedClock>,
    ) {
        let clock = Arc::new(FixedClock::new(base()));
        let access = TempAccess::local(
            Arc::new(MemoryStore::new()),
            RecordingExecutor::new(),
            clock.clone(),
            TempAccessConfig::default(),
        );
        (access, clock)
    }

    #[test]
    fn test_default_config() {
        let config = TempAccessConfig::default();
        assert_eq!(config.recent_limit, 20);
        assert_eq!(config.statement_preview_chars, 50);
        assert_eq!(config.default_grant_hours, 1);
    }

    #[test]
    fn test_default_expiry_is_top_of_next_hour() {
        let (access, _) = setup();
        assert_eq!(
            access.default_expiry(),
            Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_request_not_found() {
        let (access, _) = setup();
        let err = access.request(RequestId::new(5)).await.unwrap_err();
        assert_eq!(err, AccessError::RequestNotFound(RequestId::new(5)));
    }

    #[tokio::test]
    async fn test_render_processes_and_delivers() {
        let (access, _) = setup();
        let session = SessionContext::new();
        let alice = StaticIdentity::named("alice");

        let receipt = access
            .grant(&session, &alice, "GRANT ROLE a TO USER b;", access.default_expiry())
            .await
            .unwrap();
        assert_eq!(
            access.request_revocation(&session, receipt.request_id),
            RevocationAck::Accepted { superseded: false }
        );

        let view = access.render(&session).await.unwrap();
        assert_eq!(view.outcomes.len(), 1);
        assert!(view.outcomes[0].is_success());
        assert_eq!(view.summary, RequestSummary { shown: 1, pending: 0 });
        assert_eq!(view.requests[0].status, RequestStatus::Revoked);
        assert_eq!(view.executions.len(), 2);
        assert!(view.staged_grant_input.is_none());

        let again = access.render(&session).await.unwrap();
        assert_eq!(again.outcomes.len(), 1);
        session.dismiss(receipt.request_id);
        assert!(access.render(&session).await.unwrap().outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_sweep() {
        let (access, clock) = setup();
        let session = SessionContext::new();
        let id = access
            .grant(
                &session,
                &StaticIdentity::named("alice"),
                "GRANT ROLE a TO USER b;",
                base() + Duration::minutes(30),
            )
            .await
            .unwrap()
            .request_id;

        assert!(access.sweep().await.unwrap().is_noop());
        clock.advance(Duration::minutes(30));
        assert_eq!(access.sweep().await.unwrap().revoked, vec![id]);
        assert_eq!(access.request(id).await.unwrap().status, RequestStatus::Revoked);
    }
}
