//! Consumer-side dead-letter intake.

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::warn;

use signalbox_core::clock::Clock;
use signalbox_core::error::DeliveryError;
use signalbox_core::event::{DeadLetterEvent, NewDeadLetterEvent};

use crate::store_error;

/// Records a message whose consumer-side processing gave up.
///
/// Topic, payload, and metadata are captured verbatim so a later replay can
/// reproduce the original publish. The row starts pending with
/// `retry_count = 0` and `next_retry_at = now`, so the processor may pick it
/// up on its next tick.
///
/// # Errors
///
/// Returns `DeliveryError::Store` when the insert fails.
pub async fn record_dead_letter(
    pool: &PgPool,
    clock: &dyn Clock,
    new_event: NewDeadLetterEvent,
) -> Result<DeadLetterEvent, DeliveryError> {
    let event = DeadLetterEvent::pending(new_event, clock.now());

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
    .execute(pool)
    .await
    .map_err(store_error)?;

    warn!(
        message_id = %event.id,
        topic = %event.original_topic,
        last_error = event.last_error.as_deref().unwrap_or("unknown"),
        "message recorded to dead-letter store"
    );
    Ok(event)
}
