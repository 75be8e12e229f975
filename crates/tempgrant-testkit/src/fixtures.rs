//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempgrant::{SessionContext, TempAccess, TempAccessConfig};
use tempgrant_core::{FixedClock, RequestId, StaticIdentity};
use tempgrant_procs::{LocalProcedures, RecordingExecutor};
use tempgrant_store::{MemoryStore, Store};

/// The fixed instant every fixture starts at.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A grant statement for role `role` to user `user`.
pub fn grant_statement(role: &str, user: &str) -> String {
    format!("GRANT ROLE {} TO USER {};", role, user)
}

/// A test fixture with a fixed clock, a store, and in-process procedures.
pub struct TestFixture<S: Store = MemoryStore> {
    pub clock: Arc<FixedClock>,
    pub store: Arc<S>,
    pub procedures: Arc<LocalProcedures<S, RecordingExecutor>>,
    pub access: TempAccess<S, LocalProcedures<S, RecordingExecutor>>,
    pub session: SessionContext,
    pub operator: StaticIdentity,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Create a fixture over `store`, starting at [`epoch`].
    pub fn with_store(store: S) -> Self {
        let clock = Arc::new(FixedClock::new(epoch()));
        let store = Arc::new(store);
        let procedures = Arc::new(LocalProcedures::new(
            store.clone(),
            RecordingExecutor::new(),
            clock.clone(),
        ));
        let access = TempAccess::new(
            store.clone(),
            procedures.clone(),
            clock.clone(),
            TempAccessConfig::default(),
        );
        Self {
            clock,
            store,
            procedures,
            access,
            session: SessionContext::new(),
            operator: StaticIdentity::named("ops@example.com"),
        }
    }

    /// The in-memory executor behind the procedures.
    pub fn executor(&self) -> &RecordingExecutor {
        self.procedures.executor()
    }

    pub fn now(&self) -> DateTime<Utc> {
        use tempgrant_core::Clock;
        self.clock.now_utc()
    }

    /// Grant `role` to `user` for `minutes` from now, as the operator.
    ///
    /// Panics if the grant fails; fixtures are for tests.
    pub async fn grant_for(&self, role: &str, user: &str, minutes: i64) -> RequestId {
        let statement = grant_statement(role, user);
        match self
            .access
            .grant(
                &self.session,
                &self.operator,
                &statement,
                self.now() + Duration::minutes(minutes),
            )
            .await
        {
            Ok(receipt) => receipt.request_id,
            Err(e) => panic!("fixture grant of {} failed: {}", statement, e),
        }
    }
}
