//! Proptest generators for property-based testing.

use proptest::prelude::*;

/// A request to seed: its end relative to the sweep instant, and whether it
/// is revoked before the sweep runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRequest {
    pub end_offset_minutes: i64,
    pub revoked_beforehand: bool,
}

impl SeededRequest {
    /// Whether a sweep at offset zero must revoke this request.
    pub fn due_at_sweep(&self) -> bool {
        !self.revoked_beforehand && self.end_offset_minutes <= 0
    }
}

/// Generate an end offset within two hours either side of the sweep.
pub fn end_offset_minutes() -> impl Strategy<Value = i64> {
    -120i64..=120
}

/// Generate one seeded request.
pub fn seeded_request() -> impl Strategy<Value = SeededRequest> {
    (end_offset_minutes(), prop::bool::weighted(0.25)).prop_map(
        |(end_offset_minutes, revoked_beforehand)| SeededRequest {
            end_offset_minutes,
            revoked_beforehand,
        },
    )
}

/// Generate up to `max_len` seeded requests.
pub fn seeded_requests(max_len: usize) -> impl Strategy<Value = Vec<SeededRequest>> {
    prop::collection::vec(seeded_request(), 0..=max_len)
}

/// An operation applied to a request between sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOp {
    /// Move the clock forward.
    Advance { minutes: i64 },
    /// Run the scheduled sweep.
    Sweep,
    /// Revoke request `index` (modulo the seeded count) early.
    RevokeEarly { index: usize },
}

/// Generate a lifecycle operation.
pub fn lifecycle_op() -> impl Strategy<Value = LifecycleOp> {
    prop_oneof![
        (1i64..=90).prop_map(|minutes| LifecycleOp::Advance { minutes }),
        Just(LifecycleOp::Sweep),
        any::<usize>().prop_map(|index| LifecycleOp::RevokeEarly { index }),
    ]
}

/// Generate up to `max_len` lifecycle operations.
pub fn lifecycle_ops(max_len: usize) -> impl Strategy<Value = Vec<LifecycleOp>> {
    prop::collection::vec(lifecycle_op(), 1..=max_len)
}

/// Generate a grant statement with a plausible role and user.
pub fn grant_statement() -> impl Strategy<Value = String> {
    ("[a-z][a-z_]{0,15}", "[a-z][a-z0-9]{0,11}")
        .prop_map(|(role, user)| format!("GRANT ROLE {} TO USER {};", role, user))
}
