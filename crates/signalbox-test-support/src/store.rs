//! In-memory stores — faithful `OutboxStore` / `DeadLetterStore`
//! implementations backed by a mutex-guarded vector.
//!
//! These honor the same contracts as the PostgreSQL implementations,
//! including the conditional claim transition, due-time filtering, and
//! oldest-first ordering, so worker logic can be tested without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use signalbox_core::error::DeliveryError;
use signalbox_core::event::{
    DeadLetterEvent, DeadLetterStats, DeadLetterStatus, NewDeadLetterEvent, OutboxEvent,
    OutboxStats, OutboxStatus, TopicCount,
};
use signalbox_core::ports::{DeadLetterStore, OutboxStore};
use uuid::Uuid;

/// In-memory outbox table.
#[derive(Debug, Default)]
pub struct InMemoryOutboxStore {
    rows: Mutex<Vec<OutboxEvent>>,
}

impl InMemoryOutboxStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as-is, standing in for the transactional writer.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, event: OutboxEvent) {
        self.rows.lock().unwrap().push(event);
    }

    /// Returns the row with the given id, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, id: Uuid) -> Option<OutboxEvent> {
        self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    fn update<R>(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut OutboxEvent) -> R,
    ) -> Result<R, DeliveryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(DeliveryError::MessageNotFound(id))?;
        Ok(apply(row))
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch_pending(
        &self,
        now: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<Vec<OutboxEvent>, DeliveryError> {
        let rows = self.rows.lock().unwrap();
        let mut due: Vec<OutboxEvent> = rows
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending && e.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| e.created_at);
        due.truncate(usize::try_from(batch_size).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn claim(&self, id: Uuid) -> Result<bool, DeliveryError> {
        // Same contract as the conditional UPDATE in PostgreSQL: an unknown
        // or already-claimed row simply affects nothing.
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|e| e.id == id) {
            Some(row) if row.status == OutboxStatus::Pending => {
                row.status = OutboxStatus::Processing;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        self.update(id, |row| {
            row.status = OutboxStatus::Processed;
            row.processed_at = Some(processed_at);
            row.error_message = None;
        })
    }

    async fn release_for_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        self.update(id, |row| {
            row.status = OutboxStatus::Pending;
            row.retry_count = retry_count;
            row.error_message = Some(error_message.to_string());
            row.next_attempt_at = next_attempt_at;
        })
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
    ) -> Result<(), DeliveryError> {
        self.update(id, |row| {
            row.status = OutboxStatus::Failed;
            row.retry_count = retry_count;
            row.error_message = Some(error_message.to_string());
        })
    }

    async fn statistics(&self) -> Result<OutboxStats, DeliveryError> {
        let rows = self.rows.lock().unwrap();
        let mut stats = OutboxStats::default();
        for row in rows.iter() {
            match row.status {
                OutboxStatus::Pending => stats.pending += 1,
                OutboxStatus::Processing => stats.processing += 1,
                OutboxStatus::Processed => stats.processed += 1,
                OutboxStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}

/// In-memory dead-letter table.
#[derive(Debug, Default)]
pub struct InMemoryDeadLetterStore {
    rows: Mutex<Vec<DeadLetterEvent>>,
}

impl InMemoryDeadLetterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as-is, for tests that need full control over status,
    /// retry count, or schedule.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, event: DeadLetterEvent) {
        self.rows.lock().unwrap().push(event);
    }

    fn update<R>(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut DeadLetterEvent) -> R,
    ) -> Result<R, DeliveryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(DeliveryError::MessageNotFound(id))?;
        Ok(apply(row))
    }
}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn insert(&self, new: NewDeadLetterEvent) -> Result<DeadLetterEvent, DeliveryError> {
        let event = DeadLetterEvent::pending(new, Utc::now());
        self.rows.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEvent>, DeliveryError> {
        Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        max_retries: i32,
    ) -> Result<Vec<DeadLetterEvent>, DeliveryError> {
        let rows = self.rows.lock().unwrap();
        let mut due: Vec<DeadLetterEvent> = rows
            .iter()
            .filter(|e| {
                e.status == DeadLetterStatus::Pending
                    && e.retry_count < max_retries
                    && e.next_retry_at <= now
            })
            .cloned()
            .collect();
        due.sort_by_key(|e| e.created_at);
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        retry_count: i32,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        self.update(id, |row| {
            row.status = DeadLetterStatus::Processed;
            row.retry_count = retry_count;
            row.processed_at = Some(processed_at);
        })
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        last_error: &str,
        next_retry_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        self.update(id, |row| {
            row.retry_count = retry_count;
            row.last_error = Some(last_error.to_string());
            row.next_retry_at = next_retry_at;
        })
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: i32,
        last_error: &str,
    ) -> Result<(), DeliveryError> {
        self.update(id, |row| {
            row.status = DeadLetterStatus::Failed;
            row.retry_count = retry_count;
            row.last_error = Some(last_error.to_string());
        })
    }

    async fn reset_for_retry(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DeadLetterEvent, DeliveryError> {
        self.update(id, |row| {
            row.status = DeadLetterStatus::Pending;
            row.retry_count = 0;
            row.next_retry_at = now;
            row.clone()
        })
    }

    async fn statistics(&self) -> Result<DeadLetterStats, DeliveryError> {
        let rows = self.rows.lock().unwrap();
        let mut stats = DeadLetterStats::default();
        for row in rows.iter() {
            match row.status {
                DeadLetterStatus::Pending => {
                    stats.pending += 1;
                    match stats
                        .pending_by_topic
                        .iter_mut()
                        .find(|t| t.topic == row.original_topic)
                    {
                        Some(topic) => topic.count += 1,
                        None => stats.pending_by_topic.push(TopicCount {
                            topic: row.original_topic.clone(),
                            count: 1,
                        }),
                    }
                }
                DeadLetterStatus::Processed => stats.processed += 1,
                DeadLetterStatus::Failed => stats.failed += 1,
            }
        }
        stats.pending_by_topic.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(stats)
    }
}
