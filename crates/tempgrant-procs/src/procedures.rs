//! The procedure contract consumed by the orchestration layer.
//!
//! Two capabilities exist: grant a privilege (which also records the
//! request) and sweep every due request. Scheduled expiry and manual
//! revocation both end in the same sweep.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tempgrant_core::RequestId;

use crate::error::Result;

/// What a successful grant hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantReceipt {
    /// The request row created in the same transaction as the grant.
    pub request_id: RequestId,
    /// Human-readable outcome, surfaced verbatim.
    pub message: String,
}

/// What a successful sweep hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// The instant requests were compared against.
    pub swept_at: DateTime<Utc>,
    /// Requests moved to `Revoked` by this pass, by id.
    pub revoked: Vec<RequestId>,
}

impl SweepSummary {
    /// Whether the pass found nothing due.
    pub fn is_noop(&self) -> bool {
        self.revoked.is_empty()
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revoked.is_empty() {
            return write!(f, "SUCCESS: no grants due for revocation");
        }
        let ids: Vec<String> = self.revoked.iter().map(ToString::to_string).collect();
        write!(
            f,
            "SUCCESS: revoked {} grant(s): {}",
            self.revoked.len(),
            ids.join(", ")
        )
    }
}

/// The grant and sweep procedures.
///
/// Implementations must make `sweep_due_revocations` safe to call with
/// nothing due (a no-op success) and must never revoke a request that is
/// not both pending and due at call time.
#[async_trait]
pub trait Procedures: Send + Sync {
    /// Execute `statement` on behalf of `acting_user` and record a pending
    /// request that expires at `expiry_utc`.
    async fn grant(
        &self,
        statement: &str,
        expiry_utc: DateTime<Utc>,
        acting_user: &str,
    ) -> Result<GrantReceipt>;

    /// Revoke every pending request whose scheduled end is at or before now.
    async fn sweep_due_revocations(&self) -> Result<SweepSummary>;
}

#[async_trait]
impl<P: Procedures + ?Sized> Procedures for Arc<P> {
    async fn grant(
        &self,
        statement: &str,
        expiry_utc: DateTime<Utc>,
        acting_user: &str,
    ) -> Result<GrantReceipt> {
        (**self).grant(statement, expiry_utc, acting_user).await
    }

    async fn sweep_due_revocations(&self) -> Result<SweepSummary> {
        (**self).sweep_due_revocations().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_summary_display() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let empty = SweepSummary {
            swept_at: at,
            revoked: vec![],
        };
        assert!(empty.is_noop());
        assert_eq!(empty.to_string(), "SUCCESS: no grants due for revocation");

        let two = SweepSummary {
            swept_at: at,
            revoked: vec![RequestId::new(4), RequestId::new(42)],
        };
        assert_eq!(two.to_string(), "SUCCESS: revoked 2 grant(s): 4, 42");
    }
}
