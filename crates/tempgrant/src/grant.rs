//! Issuing time-bounded grants.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempgrant_core::{floor_to_minute, statement, IdentityProvider};
use tempgrant_procs::{GrantReceipt, Procedures};

use crate::error::{AccessError, Result};
use crate::session::SessionContext;

/// Validates and submits grant requests.
///
/// Identity is checked first: a grant nobody can be held accountable for
/// is never executed, whatever the statement says.
pub struct GrantOrchestrator<P: Procedures> {
    procedures: Arc<P>,
}

impl<P: Procedures> GrantOrchestrator<P> {
    pub fn new(procedures: Arc<P>) -> Self {
        Self { procedures }
    }

    /// Execute `statement` for the resolved user, expiring at `expiry_utc`
    /// floored to the minute.
    ///
    /// The session keeps the statement as typed until a grant succeeds.
    pub async fn submit(
        &self,
        session: &SessionContext,
        identity: &dyn IdentityProvider,
        statement: &str,
        expiry_utc: DateTime<Utc>,
    ) -> Result<GrantReceipt> {
        session.stage_grant_input(statement);

        let Some(user) = identity.resolve() else {
            tracing::warn!("grant refused: acting user could not be resolved");
            return Err(AccessError::IdentityUnresolved);
        };

        if statement::is_blank(statement) {
            return Err(AccessError::EmptyStatement);
        }

        let expiry = floor_to_minute(expiry_utc);
        match self.procedures.grant(statement, expiry, &user).await {
            Ok(receipt) => {
                session.clear_grant_input();
                tracing::info!(
                    request_id = %receipt.request_id,
                    user = %user,
                    expiry = %expiry,
                    "grant submitted"
                );
                Ok(receipt)
            }
            Err(e) => {
                let err = AccessError::from(e);
                tracing::warn!(user = %user, error = %err, "grant failed");
                Err(err)
            }
        }
    }
}
