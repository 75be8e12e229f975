//! # Tempgrant Procedures
//!
//! The two privilege-mutating capabilities the orchestration layer relies
//! on: granting a time-bounded privilege and sweeping due revocations.
//!
//! ## Overview
//!
//! - [`Procedures`] - The contract: `grant` and `sweep_due_revocations`
//! - [`PrivilegeExecutor`] - Runs the literal GRANT/REVOKE text
//! - [`LocalProcedures`] - Reference implementation over any store
//! - [`RecordingExecutor`] - In-memory executor with failure injection
//!
//! ## Flow
//!
//! ```text
//! grant(statement, expiry, user)
//!   ├── executor.execute(statement) ── ok ──> log COMPLETED, insert PENDING request
//!   └──────────────────────────────── err ──> log ERROR, no request
//!
//! sweep_due_revocations()
//!   └── for each PENDING request with end <= now:
//!         executor.execute(REVOKE …) ── ok ──> log COMPLETED, mark REVOKED
//!                                      err ──> log ERROR, stays PENDING and due
//! ```

pub mod error;
pub mod executor;
pub mod local;
pub mod procedures;

pub use error::{ProcedureError, Result};
pub use executor::{memory::RecordingExecutor, PrivilegeExecutor};
pub use local::LocalProcedures;
pub use procedures::{GrantReceipt, Procedures, SweepSummary};
