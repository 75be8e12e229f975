//! # Tempgrant Core
//!
//! Pure types for time-bounded privilege grants: requests, execution log
//! entries, UTC schedules, and acting-user identity.
//!
//! This crate contains no I/O, no storage, no procedure calls.
//!
//! ## Key Types
//!
//! - [`GrantRequest`] - A granted privilege awaiting scheduled revocation
//! - [`RequestStatus`] - `Pending` until a sweep revokes it, then `Revoked` forever
//! - [`ExecutionLogEntry`] - Append-only record of an attempted grant or revoke
//! - [`Clock`] - Source of "now" in UTC; schedules have minute granularity
//! - [`IdentityProvider`] - Resolves the user a grant is attributed to

pub mod error;
pub mod identity;
pub mod log;
pub mod request;
pub mod statement;
pub mod time;
pub mod types;

pub use error::{CoreError, Result};
pub use identity::{IdentityProvider, StaticIdentity, UserProfile};
pub use log::{ExecutionLogEntry, ExecutionStatus, NewLogEntry};
pub use request::{GrantRequest, NewGrantRequest, RequestStatus};
pub use time::{
    default_expiry, expiry_at_hour, floor_to_hour, floor_to_minute, from_unix_seconds, Clock,
    FixedClock, SystemClock,
};
pub use types::{LogId, RequestId};
