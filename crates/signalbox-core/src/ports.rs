//! Ports the pipeline stages depend on.
//!
//! The stores are the single source of truth for delivery state; the relay
//! and processor hold no authoritative in-memory state of their own. The
//! publisher and escalation sink are external collaborators behind traits so
//! tests can substitute deterministic doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::event::{
    DeadLetterEvent, DeadLetterStats, NewDeadLetterEvent, OutboundMessage, OutboxEvent,
    OutboxStats,
};

/// Hands a message to the bus.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `message` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Publish` when the bus rejects the message.
    async fn publish(&self, topic: &str, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

/// A publisher that only logs. Stands in for a real broker adapter in
/// environments without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

#[async_trait]
impl Publisher for TracingPublisher {
    async fn publish(&self, topic: &str, message: &OutboundMessage) -> Result<(), DeliveryError> {
        tracing::info!(
            topic,
            event_type = %message.event_type,
            headers = ?message.headers,
            "publishing message"
        );
        Ok(())
    }
}

/// Store operations the Outbox Relay needs. Enqueueing is deliberately not
/// part of this trait: it requires the caller's transaction handle and lives
/// with the concrete store implementation.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns up to `batch_size` `Pending` rows that are due at `now`,
    /// oldest first.
    async fn fetch_pending(
        &self,
        now: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<Vec<OutboxEvent>, DeliveryError>;

    /// Atomically transitions the row from `Pending` to `Processing`.
    /// Returns `false` when the row was no longer `Pending`, meaning another
    /// relay instance claimed it first.
    async fn claim(&self, id: Uuid) -> Result<bool, DeliveryError>;

    /// Marks the row `Processed` and stamps `processed_at`.
    async fn mark_processed(
        &self,
        id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError>;

    /// Returns the row to `Pending` after a failed attempt, recording the
    /// failure and the earliest time of the next attempt.
    async fn release_for_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError>;

    /// Marks the row permanently `Failed`.
    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
    ) -> Result<(), DeliveryError>;

    /// Counts rows per status.
    async fn statistics(&self) -> Result<OutboxStats, DeliveryError>;
}

/// Store operations for the dead-letter stage.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    /// Records a failed message for later replay. Called by the consumer's
    /// failure handler once its local retry budget is exhausted.
    async fn insert(&self, new: NewDeadLetterEvent) -> Result<DeadLetterEvent, DeliveryError>;

    /// Fetches a single message by id.
    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEvent>, DeliveryError>;

    /// Returns up to `limit` pending rows whose backoff window has elapsed
    /// at `now` and whose `retry_count` is below `max_retries`, oldest
    /// first.
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        max_retries: i32,
    ) -> Result<Vec<DeadLetterEvent>, DeliveryError>;

    /// Marks the row `Processed` after a successful republish.
    async fn mark_processed(
        &self,
        id: Uuid,
        retry_count: i32,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError>;

    /// Records a failed republish and pushes `next_retry_at` forward; the
    /// row stays pending.
    async fn schedule_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        last_error: &str,
        next_retry_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError>;

    /// Marks the row permanently `Failed`.
    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: i32,
        last_error: &str,
    ) -> Result<(), DeliveryError>;

    /// Resets the row for an operator-forced retry: status pending,
    /// `retry_count` 0, `next_retry_at` = `now`. Returns the updated row.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::MessageNotFound` when no such row exists.
    async fn reset_for_retry(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DeadLetterEvent, DeliveryError>;

    /// Counts rows per status plus pending counts grouped by topic.
    async fn statistics(&self) -> Result<DeadLetterStats, DeliveryError>;
}

/// Out-of-band alerting for messages that exhausted their retries.
#[async_trait]
pub trait EscalationSink: Send + Sync {
    /// Raises an alert for a permanently failed message. Implementations
    /// own their delivery failures; the processor does not retry alerts.
    async fn escalate(&self, title: &str, message: &str, payload: &serde_json::Value);
}

/// Default sink that drops alerts after logging them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEscalation;

#[async_trait]
impl EscalationSink for NoopEscalation {
    async fn escalate(&self, title: &str, message: &str, _payload: &serde_json::Value) {
        tracing::error!(title, message, "dead-letter escalation (no sink configured)");
    }
}
