//! Per-operator session state.
//!
//! Holds what survives between renders of one operator's view: the grant
//! statement being edited, and one revocation slot per request id. Nothing
//! here is shared between operators.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tempgrant_core::RequestId;

use crate::revocation::{RevocationOutcome, RevocationState};

/// Answer to a revocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationAck {
    /// Accepted. `superseded` is set when a delivered outcome was replaced.
    Accepted { superseded: bool },
    /// A revocation for this id is already being worked on.
    AlreadyInProgress,
    /// The previous outcome for this id has not been shown yet.
    OutcomeUndelivered,
}

impl RevocationAck {
    pub fn is_accepted(self) -> bool {
        matches!(self, RevocationAck::Accepted { .. })
    }
}

#[derive(Debug, Clone)]
enum Slot {
    InFlight(RevocationState),
    Finished {
        outcome: RevocationOutcome,
        delivered: bool,
    },
}

#[derive(Debug, Default)]
struct SessionInner {
    staged_grant: Option<String>,
    revocations: BTreeMap<RequestId, Slot>,
}

/// State for one operator session.
#[derive(Debug, Default)]
pub struct SessionContext {
    inner: Mutex<SessionInner>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant input
    // ─────────────────────────────────────────────────────────────────────────

    /// Remember the statement as typed.
    pub fn stage_grant_input(&self, statement: &str) {
        self.lock().staged_grant = Some(statement.to_string());
    }

    /// The statement as last typed, if any.
    pub fn staged_grant_input(&self) -> Option<String> {
        self.lock().staged_grant.clone()
    }

    pub(crate) fn clear_grant_input(&self) {
        self.lock().staged_grant = None;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revocations
    // ─────────────────────────────────────────────────────────────────────────

    /// Flag `request_id` for revocation. Does no I/O.
    pub fn request_revocation(&self, request_id: RequestId) -> RevocationAck {
        let mut inner = self.lock();
        let superseded = match inner.revocations.get(&request_id) {
            None => false,
            Some(Slot::InFlight(_)) => return RevocationAck::AlreadyInProgress,
            Some(Slot::Finished {
                delivered: false, ..
            }) => return RevocationAck::OutcomeUndelivered,
            Some(Slot::Finished {
                delivered: true, ..
            }) => true,
        };
        inner.revocations.insert(
            request_id,
            Slot::InFlight(RevocationState::RevokeRequested),
        );
        tracing::debug!(request_id = %request_id, superseded, "revocation requested");
        RevocationAck::Accepted { superseded }
    }

    /// Current state for `request_id`. Delivered outcomes read as `Idle`.
    pub fn state(&self, request_id: RequestId) -> RevocationState {
        match self.lock().revocations.get(&request_id) {
            None => RevocationState::Idle,
            Some(Slot::InFlight(state)) => *state,
            Some(Slot::Finished {
                delivered: true, ..
            }) => RevocationState::Idle,
            Some(Slot::Finished { outcome, .. }) => outcome.state(),
        }
    }

    /// Requests accepted for revocation and not yet picked up, by id.
    pub fn flagged_revocations(&self) -> Vec<RequestId> {
        self.lock()
            .revocations
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::InFlight(RevocationState::RevokeRequested)))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every held outcome, by id. Marks all of them delivered.
    pub fn deliver_outcomes(&self) -> Vec<RevocationOutcome> {
        let mut inner = self.lock();
        let mut outcomes = Vec::new();
        for slot in inner.revocations.values_mut() {
            if let Slot::Finished { outcome, delivered } = slot {
                *delivered = true;
                outcomes.push(outcome.clone());
            }
        }
        outcomes
    }

    /// Peek at the outcome for `request_id` without delivering it.
    pub fn outcome(&self, request_id: RequestId) -> Option<RevocationOutcome> {
        match self.lock().revocations.get(&request_id) {
            Some(Slot::Finished { outcome, .. }) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Remove the outcome for `request_id`. In-flight work is left alone.
    pub fn dismiss(&self, request_id: RequestId) -> Option<RevocationOutcome> {
        let mut inner = self.lock();
        if !matches!(inner.revocations.get(&request_id), Some(Slot::Finished { .. })) {
            return None;
        }
        match inner.revocations.remove(&request_id) {
            Some(Slot::Finished { outcome, .. }) => Some(outcome),
            _ => None,
        }
    }

    /// Compare-and-set an in-flight state.
    pub(crate) fn advance(
        &self,
        request_id: RequestId,
        from: RevocationState,
        to: RevocationState,
    ) -> bool {
        debug_assert!(from.can_transition_to(to));
        let mut inner = self.lock();
        match inner.revocations.get_mut(&request_id) {
            Some(Slot::InFlight(state)) if *state == from => {
                *state = to;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn complete(&self, outcome: RevocationOutcome) {
        self.lock().revocations.insert(
            outcome.request_id(),
            Slot::Finished {
                outcome,
                delivered: false,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(id: i64) -> RevocationOutcome {
        RevocationOutcome::RescheduleFailed {
            request_id: RequestId::new(id),
            reason: "ERROR: request not found".into(),
        }
    }

    #[test]
    fn test_staged_input_round_trip() {
        let session = SessionContext::new();
        assert!(session.staged_grant_input().is_none());

        session.stage_grant_input("GRANT ROLE a TO USER b;");
        assert_eq!(
            session.staged_grant_input().as_deref(),
            Some("GRANT ROLE a TO USER b;")
        );

        session.clear_grant_input();
        assert!(session.staged_grant_input().is_none());
    }

    #[test]
    fn test_duplicate_request_is_refused() {
        let session = SessionContext::new();
        let id = RequestId::new(7);

        assert_eq!(
            session.request_revocation(id),
            RevocationAck::Accepted { superseded: false }
        );
        assert_eq!(session.request_revocation(id), RevocationAck::AlreadyInProgress);
        assert_eq!(session.flagged_revocations(), vec![id]);
        assert_eq!(session.state(id), RevocationState::RevokeRequested);
    }

    #[test]
    fn test_advance_is_compare_and_set() {
        let session = SessionContext::new();
        let id = RequestId::new(7);
        session.request_revocation(id);

        assert!(session.advance(id, RevocationState::RevokeRequested, RevocationState::Rescheduling));
        assert!(!session.advance(id, RevocationState::RevokeRequested, RevocationState::Rescheduling));
        assert!(session.flagged_revocations().is_empty());
        assert_eq!(session.request_revocation(id), RevocationAck::AlreadyInProgress);
    }

    #[test]
    fn test_outcome_lifecycle() {
        let session = SessionContext::new();
        let id = RequestId::new(3);
        session.request_revocation(id);
        session.advance(id, RevocationState::RevokeRequested, RevocationState::Rescheduling);
        session.complete(failed(3));

        assert_eq!(session.state(id), RevocationState::RescheduleFailed);
        assert_eq!(session.request_revocation(id), RevocationAck::OutcomeUndelivered);

        let delivered = session.deliver_outcomes();
        assert_eq!(delivered, vec![failed(3)]);
        assert_eq!(session.state(id), RevocationState::Idle);
        assert_eq!(session.outcome(id), Some(failed(3)));

        assert_eq!(
            session.request_revocation(id),
            RevocationAck::Accepted { superseded: true }
        );
        assert!(session.outcome(id).is_none());
    }

    #[test]
    fn test_dismiss_leaves_in_flight_work() {
        let session = SessionContext::new();
        let id = RequestId::new(5);
        session.request_revocation(id);
        assert!(session.dismiss(id).is_none());
        assert_eq!(session.state(id), RevocationState::RevokeRequested);

        session.advance(id, RevocationState::RevokeRequested, RevocationState::Rescheduling);
        session.complete(failed(5));
        assert_eq!(session.dismiss(id), Some(failed(5)));
        assert_eq!(session.state(id), RevocationState::Idle);
        assert!(session.deliver_outcomes().is_empty());
    }

    #[test]
    fn test_revocations_are_independent_per_request() {
        let session = SessionContext::new();
        let a = RequestId::new(1);
        let b = RequestId::new(2);

        session.request_revocation(a);
        session.advance(a, RevocationState::RevokeRequested, RevocationState::Rescheduling);

        assert!(session.request_revocation(b).is_accepted());
        assert_eq!(session.flagged_revocations(), vec![b]);
        assert_eq!(session.state(a), RevocationState::Rescheduling);
    }
}
