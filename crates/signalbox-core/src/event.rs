//! Event record shapes for both pipeline stages.
//!
//! `OutboxEvent` rows live on the producer side and are written in the same
//! transaction as the business mutation they announce. `DeadLetterEvent`
//! rows live on the consumer side and capture messages whose processing
//! failed after the consumer's local retry budget ran out. Neither record is
//! ever deleted; terminal rows remain for audit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an outbox event.
///
/// `Processed` and `Failed` are permanent; only the relay moves a row out of
/// `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Awaiting (re)delivery by the relay.
    Pending,
    /// Claimed by a relay instance for the current tick.
    Processing,
    /// Successfully handed to the message bus.
    Processed,
    /// Retries exhausted; requires operator follow-up.
    Failed,
}

impl OutboxStatus {
    /// Stable string form used in the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Parses the stored string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle status of a dead-letter message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterStatus {
    /// Awaiting a retry once its backoff window elapses.
    Pending,
    /// Successfully republished to the original topic.
    Processed,
    /// Retries exhausted; escalated, never retried automatically again.
    Failed,
}

impl DeadLetterStatus {
    /// Stable string form used in the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Parses the stored string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A durable outbox row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Unique event identifier, generated at enqueue time.
    pub id: Uuid,
    /// Kind of business entity the event describes (e.g. `"order"`).
    pub aggregate_type: String,
    /// Identifier of that entity.
    pub aggregate_id: String,
    /// Topic discriminator (e.g. `"payment.created"`).
    pub event_type: String,
    /// Opaque structured payload; the pipeline never inspects it.
    pub payload: serde_json::Value,
    /// Current lifecycle status.
    pub status: OutboxStatus,
    /// Optional cross-service trace identifier.
    pub correlation_id: Option<Uuid>,
    /// Number of publish attempts that have failed so far.
    pub retry_count: i32,
    /// Detail of the most recent failure.
    pub error_message: Option<String>,
    /// Earliest time the relay may (re)attempt delivery.
    pub next_attempt_at: DateTime<Utc>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// Set once the event reaches `Processed`.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Parameters for enqueueing a new outbox event.
#[derive(Debug, Clone)]
pub struct NewOutboxEvent {
    /// Kind of business entity the event describes.
    pub aggregate_type: String,
    /// Identifier of that entity.
    pub aggregate_id: String,
    /// Topic discriminator.
    pub event_type: String,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// Optional cross-service trace identifier.
    pub correlation_id: Option<Uuid>,
}

impl OutboxEvent {
    /// Materializes a `Pending` row from enqueue parameters, immediately due.
    #[must_use]
    pub fn pending(new: NewOutboxEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_type: new.aggregate_type,
            aggregate_id: new.aggregate_id,
            event_type: new.event_type,
            payload: new.payload,
            status: OutboxStatus::Pending,
            correlation_id: new.correlation_id,
            retry_count: 0,
            error_message: None,
            next_attempt_at: now,
            created_at: now,
            processed_at: None,
        }
    }
}

/// A durable dead-letter row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEvent {
    /// Unique message identifier.
    pub id: Uuid,
    /// Topic the message was originally published on; replay targets it.
    pub original_topic: String,
    /// The original payload, captured verbatim.
    pub payload: serde_json::Value,
    /// The original headers/metadata bag, captured verbatim.
    pub metadata: HashMap<String, String>,
    /// Current lifecycle status.
    pub status: DeadLetterStatus,
    /// Number of republish attempts made by the processor.
    pub retry_count: i32,
    /// Detail of the most recent failure.
    pub last_error: Option<String>,
    /// Earliest time a retry may occur. Only moves forward, except via
    /// manual retry which resets it to now.
    pub next_retry_at: DateTime<Utc>,
    /// Intake time.
    pub created_at: DateTime<Utc>,
    /// Set once the message reaches `Processed`.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Parameters for recording a message into the dead-letter store.
#[derive(Debug, Clone)]
pub struct NewDeadLetterEvent {
    /// Topic the message was originally published on.
    pub original_topic: String,
    /// The original payload.
    pub payload: serde_json::Value,
    /// The original headers/metadata bag.
    pub metadata: HashMap<String, String>,
    /// Why consumer-side processing gave up.
    pub last_error: Option<String>,
}

impl DeadLetterEvent {
    /// Materializes a pending row from intake parameters, immediately due.
    #[must_use]
    pub fn pending(new: NewDeadLetterEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_topic: new.original_topic,
            payload: new.payload,
            metadata: new.metadata,
            status: DeadLetterStatus::Pending,
            retry_count: 0,
            last_error: new.last_error,
            next_retry_at: now,
            created_at: now,
            processed_at: None,
        }
    }
}

/// The unit handed to the message bus by either pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Type discriminator the consumer routes on.
    pub event_type: String,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// Transport headers.
    pub headers: HashMap<String, String>,
}

/// Aggregate counts over the outbox table, one per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxStats {
    /// Rows awaiting delivery.
    pub pending: i64,
    /// Rows currently claimed by a relay tick.
    pub processing: i64,
    /// Rows delivered successfully.
    pub processed: i64,
    /// Rows whose retries were exhausted.
    pub failed: i64,
}

/// Pending-message count for a single topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    /// The original topic.
    pub topic: String,
    /// Number of pending dead-letter messages on it.
    pub count: i64,
}

/// Aggregate counts over the dead-letter table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterStats {
    /// Messages awaiting retry.
    pub pending: i64,
    /// Messages successfully republished.
    pub processed: i64,
    /// Messages escalated after retry exhaustion.
    pub failed: i64,
    /// Pending counts broken down by original topic.
    pub pending_by_topic: Vec<TopicCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_status_round_trips_through_store_form() {
        for status in [
            OutboxStatus::Pending,
            OutboxStatus::Processing,
            OutboxStatus::Processed,
            OutboxStatus::Failed,
        ] {
            assert_eq!(OutboxStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OutboxStatus::parse("archived"), None);
    }

    #[test]
    fn test_dead_letter_status_round_trips_through_store_form() {
        for status in [
            DeadLetterStatus::Pending,
            DeadLetterStatus::Processed,
            DeadLetterStatus::Failed,
        ] {
            assert_eq!(DeadLetterStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeadLetterStatus::parse("quarantined"), None);
    }

    #[test]
    fn test_pending_outbox_event_is_immediately_due() {
        let now = Utc::now();
        let event = OutboxEvent::pending(
            NewOutboxEvent {
                aggregate_type: "order".into(),
                aggregate_id: "order-1".into(),
                event_type: "order.created".into(),
                payload: serde_json::json!({"total": 42}),
                correlation_id: None,
            },
            now,
        );

        assert_eq!(event.status, OutboxStatus::Pending);
        assert_eq!(event.retry_count, 0);
        assert_eq!(event.next_attempt_at, now);
        assert!(event.processed_at.is_none());
    }
}
