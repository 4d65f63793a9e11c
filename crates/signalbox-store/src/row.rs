//! Row mappings between the tables and the core record types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use signalbox_core::error::DeliveryError;
use signalbox_core::event::{DeadLetterEvent, DeadLetterStatus, OutboxEvent, OutboxStatus};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub correlation_id: Option<Uuid>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OutboxEventRow> for OutboxEvent {
    type Error = DeliveryError;

    fn try_from(row: OutboxEventRow) -> Result<Self, Self::Error> {
        let status = OutboxStatus::parse(&row.status).ok_or_else(|| {
            DeliveryError::Store(format!(
                "outbox event {} has unknown status {:?}",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: row.id,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            status,
            correlation_id: row.correlation_id,
            retry_count: row.retry_count,
            error_message: row.error_message,
            next_attempt_at: row.next_attempt_at,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DeadLetterEventRow {
    pub id: Uuid,
    pub original_topic: String,
    pub payload: serde_json::Value,
    pub metadata: Json<HashMap<String, String>>,
    pub status: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub next_retry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeadLetterEventRow> for DeadLetterEvent {
    type Error = DeliveryError;

    fn try_from(row: DeadLetterEventRow) -> Result<Self, Self::Error> {
        let status = DeadLetterStatus::parse(&row.status).ok_or_else(|| {
            DeliveryError::Store(format!(
                "dead-letter message {} has unknown status {:?}",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: row.id,
            original_topic: row.original_topic,
            payload: row.payload,
            metadata: row.metadata.0,
            status,
            retry_count: row.retry_count,
            last_error: row.last_error,
            next_retry_at: row.next_retry_at,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}
