//! # Tempgrant
//!
//! Time-bounded privilege grants with scheduled expiry and manual early
//! revocation.
//!
//! ## Overview
//!
//! A grant executes immediately and records a pending request with a
//! scheduled end. A periodic sweep revokes every pending request whose end
//! has passed. An operator can revoke early: the request's end is moved to
//! now and the same sweep runs, so both paths share one revocation
//! mechanism.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tempgrant::{TempAccess, TempAccessConfig, SessionContext};
//! use tempgrant::core::{StaticIdentity, SystemClock};
//! use tempgrant::procs::RecordingExecutor;
//! use tempgrant::store::SqliteStore;
//!
//! let store = Arc::new(SqliteStore::open("grants.db")?);
//! let access = TempAccess::local(store, RecordingExecutor::new(), Arc::new(SystemClock), TempAccessConfig::default());
//! let session = SessionContext::new();
//!
//! let receipt = access
//!     .grant(&session, &StaticIdentity::named("alice"), "GRANT ROLE analyst TO USER bob;", access.default_expiry())
//!     .await?;
//!
//! // Later, from the operator's view:
//! access.request_revocation(&session, receipt.request_id);
//! let view = access.render(&session).await?;
//! ```
//!
//! ## Crate Structure
//!
//! - `tempgrant-core`: requests, log entries, time and identity
//! - `tempgrant-store`: request store and execution log (memory, SQLite)
//! - `tempgrant-procs`: grant and sweep procedures
//! - `tempgrant`: orchestration and session state (this crate)

pub mod access;
pub mod error;
pub mod grant;
pub mod revocation;
pub mod session;
pub mod views;

pub use access::{TempAccess, TempAccessConfig};
pub use error::{AccessError, ReconciliationStep, Result};
pub use grant::GrantOrchestrator;
pub use revocation::{RevocationCoordinator, RevocationOutcome, RevocationState};
pub use session::{RevocationAck, SessionContext};
pub use views::{Dashboard, RequestRow, RequestSummary};

// Re-export sub-crates for convenience
pub use tempgrant_core as core;
pub use tempgrant_procs as procs;
pub use tempgrant_store as store;

// Re-export commonly used types
pub use tempgrant_core::{
    Clock, ExecutionLogEntry, ExecutionStatus, GrantRequest, IdentityProvider, RequestId,
    RequestStatus, StaticIdentity, SystemClock, UserProfile,
};
pub use tempgrant_procs::{GrantReceipt, Procedures, SweepSummary};
pub use tempgrant_store::{MemoryStore, SqliteStore, Store};
