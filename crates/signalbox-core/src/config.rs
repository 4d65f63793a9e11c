//! Worker configuration, read from the environment.
//!
//! All knobs are plain integers (milliseconds or counts) with documented
//! defaults; there is no CLI surface. Parsing goes through a lookup closure
//! so tests can supply values without touching process environment.

use std::time::Duration;

use crate::error::DeliveryError;
use crate::retry::RetryPolicy;

/// Configuration for the Outbox Relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Time between ticks. Default 1s.
    pub poll_interval: Duration,
    /// Maximum rows fetched per tick. Default 100.
    pub batch_size: i64,
    /// Retry bound and backoff base. Defaults: 5 attempts, 1s base.
    pub retry: RetryPolicy,
    /// Upper bound on a single publish call. Default 10s.
    pub publish_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
            retry: RetryPolicy::new(5, Duration::from_secs(1)),
            publish_timeout: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    /// Reads `SIGNALBOX_RELAY_*` variables from the process environment,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Config` when a variable is present but
    /// unparseable.
    pub fn from_env() -> Result<Self, DeliveryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, but values come from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Config` when a value is unparseable.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DeliveryError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: parse_ms(
                &lookup,
                "SIGNALBOX_RELAY_POLL_INTERVAL_MS",
                defaults.poll_interval,
            )?,
            batch_size: parse_int(&lookup, "SIGNALBOX_RELAY_BATCH_SIZE", defaults.batch_size)?,
            retry: RetryPolicy::new(
                parse_int(
                    &lookup,
                    "SIGNALBOX_RELAY_MAX_RETRIES",
                    i64::from(defaults.retry.max_retries),
                )?
                .try_into()
                .map_err(|_| config_error("SIGNALBOX_RELAY_MAX_RETRIES", "out of range"))?,
                parse_ms(
                    &lookup,
                    "SIGNALBOX_RELAY_BASE_DELAY_MS",
                    defaults.retry.base_delay,
                )?,
            ),
            publish_timeout: parse_ms(
                &lookup,
                "SIGNALBOX_RELAY_PUBLISH_TIMEOUT_MS",
                defaults.publish_timeout,
            )?,
        })
    }
}

/// Configuration for the DLQ Processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlqConfig {
    /// Time between ticks. Default 5 minutes.
    pub poll_interval: Duration,
    /// Maximum rows fetched per tick. Default 100.
    pub batch_size: i64,
    /// Retry bound and backoff base. Defaults: 5 attempts, 60s base.
    pub retry: RetryPolicy,
    /// Upper bound on a single publish call. Default 10s.
    pub publish_timeout: Duration,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            batch_size: 100,
            retry: RetryPolicy::new(5, Duration::from_millis(60_000)),
            publish_timeout: Duration::from_secs(10),
        }
    }
}

impl DlqConfig {
    /// Reads `SIGNALBOX_DLQ_*` variables from the process environment,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Config` when a variable is present but
    /// unparseable.
    pub fn from_env() -> Result<Self, DeliveryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, but values come from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Config` when a value is unparseable.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DeliveryError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: parse_ms(
                &lookup,
                "SIGNALBOX_DLQ_POLL_INTERVAL_MS",
                defaults.poll_interval,
            )?,
            batch_size: parse_int(&lookup, "SIGNALBOX_DLQ_BATCH_SIZE", defaults.batch_size)?,
            retry: RetryPolicy::new(
                parse_int(
                    &lookup,
                    "SIGNALBOX_DLQ_MAX_RETRIES",
                    i64::from(defaults.retry.max_retries),
                )?
                .try_into()
                .map_err(|_| config_error("SIGNALBOX_DLQ_MAX_RETRIES", "out of range"))?,
                parse_ms(
                    &lookup,
                    "SIGNALBOX_DLQ_BASE_DELAY_MS",
                    defaults.retry.base_delay,
                )?,
            ),
            publish_timeout: parse_ms(
                &lookup,
                "SIGNALBOX_DLQ_PUBLISH_TIMEOUT_MS",
                defaults.publish_timeout,
            )?,
        })
    }
}

fn config_error(key: &str, detail: &str) -> DeliveryError {
    DeliveryError::Config(format!("{key}: {detail}"))
}

fn parse_int(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
) -> Result<i64, DeliveryError> {
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| config_error(key, &format!("expected an integer, got {raw:?}"))),
        None => Ok(default),
    }
}

fn parse_ms(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, DeliveryError> {
    match lookup(key) {
        Some(raw) => {
            let ms: u64 = raw
                .parse()
                .map_err(|_| config_error(key, &format!("expected milliseconds, got {raw:?}")))?;
            Ok(Duration::from_millis(ms))
        }
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_relay_config_defaults() {
        let config = RelayConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn test_dlq_config_defaults() {
        let config = DlqConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.retry.base_delay, Duration::from_millis(60_000));
    }

    #[test]
    fn test_overrides_are_applied() {
        let lookup = lookup_from(&[
            ("SIGNALBOX_RELAY_POLL_INTERVAL_MS", "250"),
            ("SIGNALBOX_RELAY_BATCH_SIZE", "10"),
            ("SIGNALBOX_RELAY_MAX_RETRIES", "3"),
            ("SIGNALBOX_RELAY_BASE_DELAY_MS", "500"),
        ]);

        let config = RelayConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_unparseable_value_is_a_config_error() {
        let lookup = lookup_from(&[("SIGNALBOX_DLQ_BATCH_SIZE", "lots")]);

        let error = DlqConfig::from_lookup(lookup).unwrap_err();

        assert!(matches!(error, DeliveryError::Config(_)));
    }
}
