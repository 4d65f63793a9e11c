//! Signalbox Store — PostgreSQL persistence for the delivery pipeline.
//!
//! Holds the transactional outbox writer (the only piece that runs inside a
//! caller's transaction), the consumer-side dead-letter intake helper, and
//! the `OutboxStore` / `DeadLetterStore` implementations the workers poll.

pub mod dead_letter_intake;
pub mod outbox_writer;
pub mod pg_dead_letter_store;
pub mod pg_outbox_store;
pub mod schema;

mod row;

pub use dead_letter_intake::record_dead_letter;
pub use outbox_writer::enqueue;
pub use pg_dead_letter_store::PgDeadLetterStore;
pub use pg_outbox_store::PgOutboxStore;

use signalbox_core::error::DeliveryError;

/// Maps a database failure into the pipeline error type.
pub(crate) fn store_error(error: sqlx::Error) -> DeliveryError {
    DeliveryError::Store(error.to_string())
}
