//! PostgreSQL implementation of the `DeadLetterStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use signalbox_core::error::DeliveryError;
use signalbox_core::event::{
    DeadLetterEvent, DeadLetterStats, NewDeadLetterEvent, TopicCount,
};
use signalbox_core::ports::DeadLetterStore;

use crate::row::DeadLetterEventRow;
use crate::store_error;

const SELECT_COLUMNS: &str = "id, original_topic, payload, metadata, status, retry_count, \
     last_error, next_retry_at, created_at, processed_at";

/// PostgreSQL-backed dead-letter table.
#[derive(Debug, Clone)]
pub struct PgDeadLetterStore {
    pool: PgPool,
}

impl PgDeadLetterStore {
    /// Creates a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeadLetterStore for PgDeadLetterStore {
    async fn insert(&self, new: NewDeadLetterEvent) -> Result<DeadLetterEvent, DeliveryError> {
        let event = DeadLetterEvent::pending(new, Utc::now());
        sqlx::query(
            "INSERT INTO dead_letter_events \
             (id, original_topic, payload, metadata, status, retry_count, \
              last_error, next_retry_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(event.id)
        .bind(&event.original_topic)
        .bind(&event.payload)
        .bind(Json(&event.metadata))
        .bind(event.status.as_str())
        .bind(event.retry_count)
        .bind(&event.last_error)
        .bind(event.next_retry_at)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(event)
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEvent>, DeliveryError> {
        let row: Option<DeadLetterEventRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM dead_letter_events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(DeadLetterEvent::try_from).transpose()
    }

    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        max_retries: i32,
    ) -> Result<Vec<DeadLetterEvent>, DeliveryError> {
        let rows: Vec<DeadLetterEventRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM dead_letter_events \
             WHERE status = 'pending' AND retry_count < $1 AND next_retry_at <= $2 \
             ORDER BY created_at ASC \
             LIMIT $3"
        ))
        .bind(max_retries)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(DeadLetterEvent::try_from).collect()
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        retry_count: i32,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        sqlx::query(
            "UPDATE dead_letter_events \
             SET status = 'processed', retry_count = $2, processed_at = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(processed_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        last_error: &str,
        next_retry_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        sqlx::query(
            "UPDATE dead_letter_events \
             SET retry_count = $2, last_error = $3, next_retry_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(last_error)
        .bind(next_retry_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: i32,
        last_error: &str,
    ) -> Result<(), DeliveryError> {
        sqlx::query(
            "UPDATE dead_letter_events \
             SET status = 'failed', retry_count = $2, last_error = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(last_error)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn reset_for_retry(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DeadLetterEvent, DeliveryError> {
        let row: Option<DeadLetterEventRow> = sqlx::query_as(&format!(
            "UPDATE dead_letter_events \
             SET status = 'pending', retry_count = 0, next_retry_at = $2 \
             WHERE id = $1 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(DeadLetterEvent::try_from)
            .transpose()?
            .ok_or(DeliveryError::MessageNotFound(id))
    }

    async fn statistics(&self) -> Result<DeadLetterStats, DeliveryError> {
        let status_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM dead_letter_events GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;

        let mut stats = DeadLetterStats::default();
        for (status, count) in status_rows {
            match status.as_str() {
                "pending" => stats.pending = count,
                "processed" => stats.processed = count,
                "failed" => stats.failed = count,
                other => {
                    return Err(DeliveryError::Store(format!(
                        "dead-letter table contains unknown status {other:?}"
                    )));
                }
            }
        }

        let topic_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT original_topic, COUNT(*) FROM dead_letter_events \
             WHERE status = 'pending' \
             GROUP BY original_topic \
             ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        stats.pending_by_topic = topic_rows
            .into_iter()
            .map(|(topic, count)| TopicCount { topic, count })
            .collect();

        Ok(stats)
    }
}
