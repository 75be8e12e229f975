//! Manual early revocation.
//!
//! A revocation is two steps: pull the request's scheduled end forward to
//! now, then run the same sweep the scheduled path runs. Each request moves
//! through its own state machine:
//!
//! ```text
//! Idle ─request─> RevokeRequested ─process─> Rescheduling ─┬─> RescheduleFailed
//!                                                          └─> Sweeping ─┬─> SweepSucceeded
//!                                                                        └─> SweepFailed
//! ```
//!
//! Terminal states hold an outcome until it is delivered to the operator,
//! after which the request reads as `Idle` again.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempgrant_core::{floor_to_minute, Clock, RequestId};
use tempgrant_procs::{Procedures, SweepSummary};
use tempgrant_store::{Store, UpdateResult};

use crate::error::{AccessError, ReconciliationStep};
use crate::session::SessionContext;

/// Where a single request is in its manual revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationState {
    Idle,
    RevokeRequested,
    Rescheduling,
    RescheduleFailed,
    Sweeping,
    SweepSucceeded,
    SweepFailed,
}

impl RevocationState {
    /// Whether work for this request has been accepted and not finished.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            RevocationState::RevokeRequested
                | RevocationState::Rescheduling
                | RevocationState::Sweeping
        )
    }

    /// Whether this state carries an outcome.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RevocationState::RescheduleFailed
                | RevocationState::SweepSucceeded
                | RevocationState::SweepFailed
        )
    }

    /// Check if transition to `next` is allowed.
    pub fn can_transition_to(self, next: RevocationState) -> bool {
        use RevocationState::*;
        matches!(
            (self, next),
            (Idle, RevokeRequested)
                | (RevokeRequested, Rescheduling)
                | (Rescheduling, RescheduleFailed)
                | (Rescheduling, Sweeping)
                | (Sweeping, SweepSucceeded)
                | (Sweeping, SweepFailed)
                | (RescheduleFailed, Idle)
                | (SweepSucceeded, Idle)
                | (SweepFailed, Idle)
        )
    }
}

impl fmt::Display for RevocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RevocationState::Idle => "idle",
            RevocationState::RevokeRequested => "revoke requested",
            RevocationState::Rescheduling => "rescheduling",
            RevocationState::RescheduleFailed => "reschedule failed",
            RevocationState::Sweeping => "sweeping",
            RevocationState::SweepSucceeded => "sweep succeeded",
            RevocationState::SweepFailed => "sweep failed",
        };
        f.write_str(s)
    }
}

/// The result of one manual revocation, held for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevocationOutcome {
    /// Rescheduled and swept.
    Revoked {
        request_id: RequestId,
        rescheduled_to: DateTime<Utc>,
        summary: SweepSummary,
    },
    /// The end time could not be moved; nothing was swept.
    RescheduleFailed {
        request_id: RequestId,
        reason: String,
    },
    /// The end time moved but the sweep failed. The request stays due.
    SweepFailed {
        request_id: RequestId,
        rescheduled_to: DateTime<Utc>,
        reason: String,
    },
}

impl RevocationOutcome {
    pub fn request_id(&self) -> RequestId {
        match self {
            RevocationOutcome::Revoked { request_id, .. }
            | RevocationOutcome::RescheduleFailed { request_id, .. }
            | RevocationOutcome::SweepFailed { request_id, .. } => *request_id,
        }
    }

    /// The terminal state this outcome represents.
    pub fn state(&self) -> RevocationState {
        match self {
            RevocationOutcome::Revoked { .. } => RevocationState::SweepSucceeded,
            RevocationOutcome::RescheduleFailed { .. } => RevocationState::RescheduleFailed,
            RevocationOutcome::SweepFailed { .. } => RevocationState::SweepFailed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RevocationOutcome::Revoked { .. })
    }

    /// The error for a failed outcome.
    pub fn error(&self) -> Option<AccessError> {
        match self {
            RevocationOutcome::Revoked { .. } => None,
            RevocationOutcome::RescheduleFailed { request_id, reason } => {
                Some(AccessError::ReconciliationFailure {
                    request_id: *request_id,
                    step: ReconciliationStep::Reschedule,
                    reason: reason.clone(),
                    rescheduled: None,
                })
            }
            RevocationOutcome::SweepFailed {
                request_id,
                rescheduled_to,
                reason,
            } => Some(AccessError::ReconciliationFailure {
                request_id: *request_id,
                step: ReconciliationStep::Sweep,
                reason: reason.clone(),
                rescheduled: Some(reschedule_report(*request_id, *rescheduled_to)),
            }),
        }
    }

    /// Operator-facing text.
    pub fn message(&self) -> String {
        match self {
            RevocationOutcome::Revoked {
                request_id,
                summary,
                ..
            } => format!("Request {} successfully revoked.\n{}", request_id, summary),
            RevocationOutcome::RescheduleFailed { reason, .. } => {
                format!("Failed to update request end time:\n{}", reason)
            }
            RevocationOutcome::SweepFailed {
                request_id,
                rescheduled_to,
                reason,
            } => format!(
                "Failed to execute revocation procedure:\n{}\n{}",
                reschedule_report(*request_id, *rescheduled_to),
                reason
            ),
        }
    }
}

fn reschedule_report(request_id: RequestId, at: DateTime<Utc>) -> String {
    format!(
        "SUCCESS: request {} end time updated to {} UTC",
        request_id,
        at.format("%Y-%m-%d %H:%M")
    )
}

/// Runs accepted manual revocations.
///
/// Scheduled expiry needs no coordinator: the sweep picks due requests up
/// on its own. This type only handles the operator pulling one forward.
pub struct RevocationCoordinator<S: Store, P: Procedures> {
    store: Arc<S>,
    procedures: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<S: Store, P: Procedures> RevocationCoordinator<S, P> {
    pub fn new(store: Arc<S>, procedures: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            procedures,
            clock,
        }
    }

    /// Run the revocation for `request_id` if the session accepted one.
    ///
    /// Returns `None` when nothing was pending for that id, which makes
    /// repeated processing of the same request a no-op.
    pub async fn process(
        &self,
        session: &SessionContext,
        request_id: RequestId,
    ) -> Option<RevocationOutcome> {
        if !session.advance(
            request_id,
            RevocationState::RevokeRequested,
            RevocationState::Rescheduling,
        ) {
            tracing::debug!(request_id = %request_id, "no accepted revocation to process");
            return None;
        }

        let now = floor_to_minute(self.clock.now_utc());
        let outcome = match self.reschedule(request_id, now).await {
            Err(reason) => {
                tracing::warn!(request_id = %request_id, step = "reschedule", %reason, "manual revocation failed");
                RevocationOutcome::RescheduleFailed { request_id, reason }
            }
            Ok(()) => {
                tracing::info!(request_id = %request_id, rescheduled_to = %now, "end time moved");
                if !session.advance(
                    request_id,
                    RevocationState::Rescheduling,
                    RevocationState::Sweeping,
                ) {
                    // Only this task leaves Rescheduling, so the session lost track.
                    tracing::warn!(
                        request_id = %request_id,
                        state = %session.state(request_id),
                        "revocation state changed while rescheduling"
                    );
                }
                match self.procedures.sweep_due_revocations().await {
                    Ok(summary) => {
                        tracing::info!(request_id = %request_id, revoked = summary.revoked.len(), "manual revocation completed");
                        RevocationOutcome::Revoked {
                            request_id,
                            rescheduled_to: now,
                            summary,
                        }
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        tracing::warn!(request_id = %request_id, step = "sweep", %reason, "manual revocation failed");
                        RevocationOutcome::SweepFailed {
                            request_id,
                            rescheduled_to: now,
                            reason,
                        }
                    }
                }
            }
        };

        session.complete(outcome.clone());
        Some(outcome)
    }

    /// Process every accepted revocation in the session, lowest id first.
    pub async fn process_all(&self, session: &SessionContext) -> Vec<RevocationOutcome> {
        let mut outcomes = Vec::new();
        for request_id in session.flagged_revocations() {
            if let Some(outcome) = self.process(session, request_id).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn reschedule(
        &self,
        request_id: RequestId,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), String> {
        match self.store.update_end_time(request_id, now).await {
            Ok(UpdateResult::Updated) => Ok(()),
            Ok(UpdateResult::NotPending) => Err(format!(
                "ERROR: request {} is no longer pending",
                request_id
            )),
            Ok(UpdateResult::NotFound) => {
                Err(format!("ERROR: request {} not found", request_id))
            }
            Err(e) => Err(format!("ERROR: {}", e)),
        }
    }
}
