//! PostgreSQL implementation of the `OutboxStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use signalbox_core::error::DeliveryError;
use signalbox_core::event::{OutboxEvent, OutboxStats};
use signalbox_core::ports::OutboxStore;

use crate::row::OutboxEventRow;
use crate::store_error;

const SELECT_COLUMNS: &str = "id, aggregate_type, aggregate_id, event_type, payload, status, \
     correlation_id, retry_count, error_message, next_attempt_at, created_at, processed_at";

/// PostgreSQL-backed outbox table.
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    /// Creates a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_pending(
        &self,
        now: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<Vec<OutboxEvent>, DeliveryError> {
        let rows: Vec<OutboxEventRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM outbox_events \
             WHERE status = 'pending' AND next_attempt_at <= $1 \
             ORDER BY created_at ASC \
             LIMIT $2"
        ))
        .bind(now)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(OutboxEvent::try_from).collect()
    }

    async fn claim(&self, id: Uuid) -> Result<bool, DeliveryError> {
        // Conditional update: the affected-row count decides the race when
        // multiple relay replicas fetched the same pending row.
        let result = sqlx::query(
            "UPDATE outbox_events SET status = 'processing' \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        sqlx::query(
            "UPDATE outbox_events \
             SET status = 'processed', processed_at = $2, error_message = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(processed_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn release_for_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        sqlx::query(
            "UPDATE outbox_events \
             SET status = 'pending', retry_count = $2, error_message = $3, \
                 next_attempt_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(error_message)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
    ) -> Result<(), DeliveryError> {
        sqlx::query(
            "UPDATE outbox_events \
             SET status = 'failed', retry_count = $2, error_message = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn statistics(&self) -> Result<OutboxStats, DeliveryError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM outbox_events GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;

        let mut stats = OutboxStats::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => stats.pending = count,
                "processing" => stats.processing = count,
                "processed" => stats.processed = count,
                "failed" => stats.failed = count,
                other => {
                    return Err(DeliveryError::Store(format!(
                        "outbox table contains unknown status {other:?}"
                    )));
                }
            }
        }
        Ok(stats)
    }
}
