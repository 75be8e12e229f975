//! Overlapping revocations and duplicate triggers.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;
use tempgrant::core::{Clock, FixedClock};
use tempgrant::procs::{LocalProcedures, RecordingExecutor};
use tempgrant::{
    AccessError, MemoryStore, Procedures, RequestId, RequestStatus, RevocationAck,
    RevocationState, SessionContext, SqliteStore, StaticIdentity, Store, TempAccess,
    TempAccessConfig,
};
use tempgrant_testkit::{
    epoch, grant_statement, FlakyStore, InstrumentedProcedures, TestFixture,
};

type Procs = InstrumentedProcedures<LocalProcedures<FlakyStore<MemoryStore>, RecordingExecutor>>;

struct Harness {
    clock: Arc<FixedClock>,
    store: Arc<FlakyStore<MemoryStore>>,
    procs: Arc<Procs>,
    access: Arc<TempAccess<FlakyStore<MemoryStore>, Procs>>,
    session: Arc<SessionContext>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(FixedClock::new(epoch()));
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        let procs = Arc::new(InstrumentedProcedures::new(LocalProcedures::new(
            store.clone(),
            RecordingExecutor::new(),
            clock.clone(),
        )));
        let access = Arc::new(TempAccess::new(
            store.clone(),
            procs.clone(),
            clock.clone(),
            TempAccessConfig::default(),
        ));
        Self {
            clock,
            store,
            procs,
            access,
            session: Arc::new(SessionContext::new()),
        }
    }

    async fn grant(&self, role: &str, minutes: i64) -> RequestId {
        self.access
            .grant(
                &self.session,
                &StaticIdentity::named("ops@example.com"),
                &grant_statement(role, "bob"),
                self.clock.now_utc() + Duration::minutes(minutes),
            )
            .await
            .unwrap()
            .request_id
    }
}

#[tokio::test]
async fn test_retrigger_while_sweeping_is_noop() {
    let h = Harness::new();
    let id = h.grant("analyst", 60).await;
    let gate = h.procs.hold_sweeps();

    assert!(h.access.request_revocation(&h.session, id).is_accepted());
    let task = tokio::spawn({
        let access = h.access.clone();
        let session = h.session.clone();
        async move { access.process_revocation(&session, id).await }
    });

    h.procs.sweep_started().await;
    assert_eq!(h.session.state(id), RevocationState::Sweeping);

    assert_eq!(
        h.access.request_revocation(&h.session, id),
        RevocationAck::AlreadyInProgress
    );
    assert!(h.access.process_revocation(&h.session, id).await.is_none());
    assert!(h.access.process_revocations(&h.session).await.is_empty());
    assert_eq!(h.store.update_calls(), 1);
    assert_eq!(h.procs.sweep_calls(), 1);

    gate.release(1);
    let outcome = task.await.unwrap().unwrap();
    assert!(outcome.is_success());
    assert_eq!(h.store.update_calls(), 1);
    assert_eq!(h.procs.sweep_calls(), 1);
    assert_eq!(
        h.access.request(id).await.unwrap().status,
        RequestStatus::Revoked
    );
}

fn sqlite_fixture(dir: &TempDir, name: &str) -> Arc<TestFixture<SqliteStore>> {
    let store = SqliteStore::open(dir.path().join(name)).unwrap();
    Arc::new(TestFixture::with_store(store))
}

fn revokes_of(fx: &TestFixture<SqliteStore>, statement: &str) -> usize {
    fx.executor()
        .executed()
        .iter()
        .filter(|s| s.as_str() == statement)
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sweeps_revoke_each_request_once() {
    let dir = tempfile::tempdir().unwrap();

    for round in 0..20 {
        let fx = sqlite_fixture(&dir, &format!("grants-{}.db", round));
        let mut ids = BTreeSet::new();
        for n in 0..5 {
            ids.insert(fx.grant_for("analyst", &format!("u{}", n), 1).await);
        }
        fx.clock.advance(Duration::minutes(2));

        let sweeps: Vec<_> = (0..2)
            .map(|_| {
                let fx = fx.clone();
                tokio::spawn(async move { fx.procedures.sweep_due_revocations().await })
            })
            .collect();
        let mut revoked = Vec::new();
        for sweep in sweeps {
            revoked.extend(sweep.await.unwrap().unwrap().revoked);
        }

        assert_eq!(revoked.len(), 5, "round {}", round);
        assert_eq!(revoked.into_iter().collect::<BTreeSet<_>>(), ids);
        for n in 0..5 {
            let revoke = format!("REVOKE ROLE analyst FROM USER u{};", n);
            assert_eq!(revokes_of(&fx, &revoke), 1, "round {}", round);
        }

        let log = fx.store.recent_log(usize::MAX).await.unwrap();
        let logged_revokes = log
            .iter()
            .filter(|e| e.executed_statement_or_action.starts_with("REVOKE"))
            .count();
        assert_eq!(logged_revokes, 5, "round {}", round);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_requests_revoke_independently() {
    let dir = tempfile::tempdir().unwrap();
    let fx = sqlite_fixture(&dir, "grants.db");
    let a = fx.grant_for("analyst", "bob", 60).await;
    let b = fx.grant_for("auditor", "bob", 90).await;

    assert!(fx.access.request_revocation(&fx.session, a).is_accepted());
    assert!(fx.access.request_revocation(&fx.session, b).is_accepted());

    let tasks: Vec<_> = [a, b]
        .into_iter()
        .map(|id| {
            let fx = fx.clone();
            tokio::spawn(async move { fx.access.process_revocation(&fx.session, id).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_success());
    }

    // Either sweep may have revoked both; each privilege is revoked once.
    assert_eq!(revokes_of(&fx, "REVOKE ROLE analyst FROM USER bob;"), 1);
    assert_eq!(revokes_of(&fx, "REVOKE ROLE auditor FROM USER bob;"), 1);
    for id in [a, b] {
        assert_eq!(
            fx.access.request(id).await.unwrap().status,
            RequestStatus::Revoked
        );
    }
}

#[tokio::test]
async fn test_revocation_does_not_block_other_requests() {
    let h = Harness::new();
    let a = h.grant("analyst", 60).await;
    let b = h.grant("auditor", 90).await;
    let gate = h.procs.hold_sweeps();

    h.access.request_revocation(&h.session, a);
    let task = tokio::spawn({
        let access = h.access.clone();
        let session = h.session.clone();
        async move { access.process_revocation(&session, a).await }
    });
    h.procs.sweep_started().await;

    assert_eq!(
        h.access.request_revocation(&h.session, b),
        RevocationAck::Accepted { superseded: false }
    );
    assert_eq!(h.session.flagged_revocations(), vec![b]);

    gate.release(2);
    let b_outcome = h.access.process_revocation(&h.session, b).await.unwrap();
    let a_outcome = task.await.unwrap().unwrap();

    assert!(a_outcome.is_success());
    assert!(b_outcome.is_success());
}

#[tokio::test]
async fn test_reschedule_failure_skips_sweep() {
    let h = Harness::new();
    let id = h.grant("analyst", 60).await;
    let original_end = h.access.request(id).await.unwrap().scheduled_end_ts_utc;
    h.store.fail_updates(Some("database is locked".into()));

    h.access.request_revocation(&h.session, id);
    let outcome = h.access.process_revocation(&h.session, id).await.unwrap();

    assert_eq!(outcome.state(), RevocationState::RescheduleFailed);
    assert!(outcome.message().contains("database is locked"));
    assert!(matches!(
        outcome.error(),
        Some(AccessError::ReconciliationFailure { rescheduled: None, .. })
    ));
    assert_eq!(h.procs.sweep_calls(), 0);

    let request = h.access.request(id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.scheduled_end_ts_utc, original_end);
}

#[tokio::test]
async fn test_unresolved_identity_never_reaches_procedures() {
    let h = Harness::new();

    let err = h
        .access
        .grant(
            &h.session,
            &StaticIdentity::anonymous(),
            &grant_statement("analyst", "bob"),
            h.access.default_expiry(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, AccessError::IdentityUnresolved);
    assert_eq!(h.procs.grant_calls(), 0);
    assert!(h.procs.inner().executor().executed().is_empty());
    assert_eq!(h.store.inner().count_requests().await.unwrap(), 0);
}
