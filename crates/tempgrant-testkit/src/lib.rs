//! # Tempgrant Testkit
//!
//! Testing utilities for tempgrant.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A fixed clock, store, procedures and session wired together
//! - **Doubles**: Procedure and store wrappers that count calls, inject
//!   failures, and hold sweeps in flight
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use tempgrant_testkit::TestFixture;
//!
//! let fx = TestFixture::new();
//! let id = fx.grant_for("analyst", "bob", 60).await;
//! fx.clock.advance(chrono::Duration::hours(1));
//! fx.access.sweep().await?;
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tempgrant_testkit::generators::seeded_requests;
//!
//! proptest! {
//!     #[test]
//!     fn sweep_revokes_exactly_the_due(requests in seeded_requests(16)) {
//!         // seed, sweep, compare against SeededRequest::due_at_sweep
//!     }
//! }
//! ```

pub mod doubles;
pub mod fixtures;
pub mod generators;

pub use doubles::{FlakyStore, InstrumentedProcedures, SweepGate};
pub use fixtures::{epoch, grant_statement, TestFixture};
pub use generators::{LifecycleOp, SeededRequest};
