//! Retry policy with exponential backoff.
//!
//! Both pipeline stages share the same policy shape: a bounded number of
//! attempts, with the wait before attempt `n` growing as
//! `base_delay * 2^n`. Only the defaults differ (the relay retries on a
//! seconds scale, the DLQ processor on a minutes scale).

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Shifts beyond this would overflow the millisecond arithmetic long before
/// any realistic `max_retries`.
const MAX_BACKOFF_EXPONENT: i32 = 20;

/// Bounded exponential-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts allowed before a row becomes permanently
    /// failed.
    pub max_retries: i32,
    /// Delay before the first retry; doubles with each subsequent attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_retries: i32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// True once `retry_count` attempts have been used up.
    #[must_use]
    pub fn is_exhausted(&self, retry_count: i32) -> bool {
        retry_count >= self.max_retries
    }

    /// The wait before attempt number `attempt` (1-based):
    /// `base_delay * 2^attempt`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: i32) -> Duration {
        let exponent = attempt.clamp(0, MAX_BACKOFF_EXPONENT);
        #[allow(clippy::cast_possible_truncation)]
        let base_ms = self.base_delay.as_millis() as u64;
        Duration::from_millis(base_ms.saturating_mul(1_u64 << exponent))
    }

    /// The earliest instant attempt number `attempt` may run, measured from
    /// `now`.
    ///
    /// # Panics
    ///
    /// Panics only if the computed delay exceeds what `chrono` can
    /// represent, which `MAX_BACKOFF_EXPONENT` rules out for any sane
    /// `base_delay`.
    #[must_use]
    pub fn next_retry_at(&self, now: DateTime<Utc>, attempt: i32) -> DateTime<Utc> {
        let delay = self.backoff_delay(attempt);
        #[allow(clippy::cast_possible_truncation)]
        let delay_ms = delay.as_millis() as i64;
        now + chrono::Duration::milliseconds(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy_60s() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(60_000))
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = policy_60s();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(120_000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(240_000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(480_000));
    }

    #[test]
    fn test_next_retry_at_first_failure() {
        // A message failing with prior retry_count = 0 schedules its next
        // attempt at t0 + base * 2^1.
        let policy = policy_60s();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let next = policy.next_retry_at(t0, 1);

        assert_eq!(next, t0 + chrono::Duration::milliseconds(120_000));
    }

    #[test]
    fn test_next_retry_at_second_consecutive_failure() {
        let policy = policy_60s();
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 2, 0).unwrap();

        let next = policy.next_retry_at(t1, 2);

        assert_eq!(next, t1 + chrono::Duration::milliseconds(240_000));
    }

    #[test]
    fn test_exhaustion_boundary() {
        let policy = policy_60s();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn test_large_attempt_numbers_do_not_overflow() {
        let policy = RetryPolicy::new(i32::MAX, Duration::from_millis(1));
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let next = policy.next_retry_at(t0, 10_000);

        assert!(next > t0);
    }
}
