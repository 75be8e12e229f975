//! Strong type definitions for temporary grants.
//!
//! Store-assigned identifiers are newtypes to prevent mixing a request id
//! with a log id at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a grant request, assigned monotonically by the store on insert.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl RequestId {
    /// Create a request id from its raw value.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RequestId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for RequestId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Identifier of an execution log entry, insertion-ordered.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub i64);

impl LogId {
    /// Create a log id from its raw value.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogId({})", self.0)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for LogId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
