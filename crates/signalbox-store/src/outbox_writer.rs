//! Transactional outbox writer.

use sqlx::{Postgres, Transaction};
use tracing::debug;

use signalbox_core::clock::Clock;
use signalbox_core::error::DeliveryError;
use signalbox_core::event::{NewOutboxEvent, OutboxEvent};

use crate::store_error;

/// Inserts one `Pending` outbox row using the caller's transaction.
///
/// This performs no commit and no network I/O: the caller is expected to be
/// inside an active transaction that also performs the business write, so
/// the event row and the business row commit or roll back together. Broker
/// availability never enters the business transaction's critical path.
///
/// # Errors
///
/// Returns `DeliveryError::Store` when the insert fails.
pub async fn enqueue(
    tx: &mut Transaction<'_, Postgres>,
    clock: &dyn Clock,
    new_event: NewOutboxEvent,
) -> Result<OutboxEvent, DeliveryError> {
    let event = OutboxEvent::pending(new_event, clock.now());

    sqlx::query(
        "INSERT INTO outbox_events \
         (id, aggregate_type, aggregate_id, event_type, payload, status, \
          correlation_id, retry_count, error_message, next_attempt_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(event.id)
    .bind(&event.aggregate_type)
    .bind(&event.aggregate_id)
    .bind(&event.event_type)
    .bind(&event.payload)
    .bind(event.status.as_str())
    .bind(event.correlation_id)
    .bind(event.retry_count)
    .bind(&event.error_message)
    .bind(event.next_attempt_at)
    .bind(event.created_at)
    .execute(&mut **tx)
    .await
    .map_err(store_error)?;

    debug!(
        event_id = %event.id,
        topic = %event.event_type,
        aggregate_id = %event.aggregate_id,
        "outbox event enqueued"
    );
    Ok(event)
}
