//! Clock abstraction for determinism.
//!
//! Both workers decide "is this row due?" and stamp `processed_at` /
//! `next_retry_at` from a `Clock` rather than calling `Utc::now()` directly,
//! so backoff arithmetic is testable without sleeping.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
