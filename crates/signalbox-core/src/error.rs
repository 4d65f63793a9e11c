//! Pipeline error types.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the delivery pipeline.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The durable store rejected or failed an operation.
    #[error("store error: {0}")]
    Store(String),

    /// The message bus rejected a publish.
    #[error("publish error: {0}")]
    Publish(String),

    /// A publish call exceeded the configured timeout. Treated as a
    /// retryable failure, same as any other publish error.
    #[error("publish timed out after {0:?}")]
    PublishTimeout(Duration),

    /// No dead-letter message exists with the given id.
    #[error("message not found: {0}")]
    MessageNotFound(Uuid),

    /// The message is in a state that does not permit the operation
    /// (e.g. manually retrying an already-processed message).
    #[error("message {id} is {status}; {operation} is not permitted")]
    InvalidState {
        /// The message the operation targeted.
        id: Uuid,
        /// Its current status.
        status: String,
        /// The operation that was refused.
        operation: &'static str,
    },

    /// A required configuration value is missing or unparseable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeliveryError {
    /// True for failures that the retry machinery may attempt again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Publish(_) | Self::PublishTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_errors_are_retryable() {
        assert!(DeliveryError::Publish("broker down".into()).is_retryable());
        assert!(DeliveryError::PublishTimeout(Duration::from_secs(10)).is_retryable());
    }

    #[test]
    fn test_store_and_state_errors_are_not_retryable() {
        assert!(!DeliveryError::Store("connection refused".into()).is_retryable());
        assert!(!DeliveryError::MessageNotFound(Uuid::new_v4()).is_retryable());
    }
}
