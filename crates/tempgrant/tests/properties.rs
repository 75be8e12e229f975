//! Property tests for sweep correctness and status monotonicity.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use proptest::prelude::*;
use tempgrant::core::{FixedClock, NewGrantRequest};
use tempgrant::procs::{LocalProcedures, RecordingExecutor};
use tempgrant::{MemoryStore, Procedures, RequestId, RequestStatus, Store};
use tempgrant_testkit::generators::{grant_statement, lifecycle_ops, seeded_requests};
use tempgrant_testkit::{epoch, LifecycleOp, TestFixture};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sweep_revokes_exactly_the_due(requests in seeded_requests(16), statement in grant_statement()) {
        runtime().block_on(async {
            let store = Arc::new(MemoryStore::new());
            let procs = LocalProcedures::new(
                store.clone(),
                RecordingExecutor::new(),
                Arc::new(FixedClock::new(epoch())),
            );

            let mut expected = BTreeSet::new();
            let mut ids = Vec::new();
            for seeded in &requests {
                let id = store
                    .insert_request(&NewGrantRequest {
                        user_name: "ops".into(),
                        grant_statement: statement.clone(),
                        scheduled_end_ts_utc: epoch() + Duration::minutes(seeded.end_offset_minutes),
                    })
                    .await
                    .unwrap();
                if seeded.revoked_beforehand {
                    store.mark_revoked(id).await.unwrap();
                }
                if seeded.due_at_sweep() {
                    expected.insert(id);
                }
                ids.push((id, seeded.clone()));
            }

            let summary = procs.sweep_due_revocations().await.unwrap();
            let revoked: BTreeSet<RequestId> = summary.revoked.iter().copied().collect();
            assert_eq!(revoked, expected);

            for (id, seeded) in ids {
                let request = store.get_request(id).await.unwrap().unwrap();
                let should_be_revoked = seeded.revoked_beforehand || seeded.end_offset_minutes <= 0;
                assert_eq!(request.status == RequestStatus::Revoked, should_be_revoked);
            }
        });
    }

    #[test]
    fn revoked_requests_stay_revoked(
        requests in seeded_requests(8),
        ops in lifecycle_ops(24),
    ) {
        runtime().block_on(async {
            let fx = TestFixture::new();
            let mut ids = Vec::new();
            for (n, seeded) in requests.iter().enumerate() {
                let minutes = seeded.end_offset_minutes.abs() + 1;
                ids.push(fx.grant_for("analyst", &format!("u{}", n), minutes).await);
            }

            let mut revoked: BTreeSet<RequestId> = BTreeSet::new();
            for op in ops {
                match op {
                    LifecycleOp::Advance { minutes } => fx.clock.advance(Duration::minutes(minutes)),
                    LifecycleOp::Sweep => {
                        fx.access.sweep().await.unwrap();
                    }
                    LifecycleOp::RevokeEarly { index } => {
                        if ids.is_empty() {
                            continue;
                        }
                        let id = ids[index % ids.len()];
                        fx.session.dismiss(id);
                        if fx.access.request_revocation(&fx.session, id).is_accepted() {
                            fx.access.process_revocation(&fx.session, id).await;
                        }
                    }
                }

                for request in fx.store.list_recent(usize::MAX).await.unwrap() {
                    if revoked.contains(&request.request_id) {
                        assert_eq!(request.status, RequestStatus::Revoked);
                    } else if request.status == RequestStatus::Revoked {
                        revoked.insert(request.request_id);
                    }
                }
            }
        });
    }
}
