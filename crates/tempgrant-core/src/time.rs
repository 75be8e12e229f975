//! UTC time handling.
//!
//! Schedules have minute granularity and are always UTC. Converting to a
//! viewer's local timezone is left to the presentation layer.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};

use crate::error::{CoreError, Result};

/// Truncate a timestamp to the start of its minute.
pub fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts - Duration::seconds(i64::from(ts.second()))
        - Duration::nanoseconds(i64::from(ts.nanosecond()))
}

/// Truncate a timestamp to the start of its hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    floor_to_minute(ts) - Duration::minutes(i64::from(ts.minute()))
}

/// Decode a persisted Unix-seconds value.
pub fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(CoreError::TimestampOutOfRange(secs))
}

/// Build an expiry from a calendar date and a whole hour (00..=23).
pub fn expiry_at_hour(date: NaiveDate, hour: u32) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or(CoreError::InvalidHour(hour))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// The expiry offered by default: the top of the hour `hours` from now.
pub fn default_expiry(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    floor_to_hour(now + Duration::hours(hours))
}

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_utc(&self) -> DateTime<Utc> {
        (**self).now_utc()
    }
}
