//! The timer-driven outbox relay.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use signalbox_core::clock::Clock;
use signalbox_core::config::RelayConfig;
use signalbox_core::error::DeliveryError;
use signalbox_core::event::{OutboundMessage, OutboxEvent};
use signalbox_core::ports::{OutboxStore, Publisher};

/// Outcome counts for a single relay tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Events handed to the bus and marked processed.
    pub published: usize,
    /// Events released back to pending with a backoff window.
    pub retried: usize,
    /// Events that exhausted their retries this tick.
    pub failed: usize,
    /// Events whose claim was lost to another relay instance.
    pub skipped: usize,
}

impl TickSummary {
    fn total(self) -> usize {
        self.published + self.retried + self.failed + self.skipped
    }
}

/// Background worker that drains the outbox table.
///
/// State machine per event: `Pending` → `Processing` → `Processed`, back to
/// `Pending` with a backoff window, or `Failed` once retries are exhausted.
/// Rows are claimed with an atomic conditional update, so concurrent relay
/// replicas never publish the same row twice.
pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
    config: RelayConfig,
}

impl OutboxRelay {
    /// Creates a relay over the given store and publisher.
    #[must_use]
    pub fn new(
        store: Arc<dyn OutboxStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
        config: RelayConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            config,
        }
    }

    /// Runs the relay until `shutdown` flips to `true`. A batch that is
    /// already in flight when shutdown arrives drains to completion, so no
    /// row is left `Processing` by a clean stop.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_interval = ?self.config.poll_interval,
            batch_size = self.config.batch_size,
            "outbox relay started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            // The batch runs outside the select, so shutdown never
            // interrupts it mid-row.
            if let Err(error) = self.tick().await {
                warn!(%error, "relay tick aborted; the store is authoritative, retrying next tick");
            }
            if *shutdown.borrow() {
                break;
            }
        }

        info!("outbox relay stopped");
    }

    /// Processes one batch of due pending events.
    ///
    /// Publish failures are isolated per row and never abort the batch; a
    /// store failure does abort the tick and is retried on the next timer
    /// fire.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Store` when the store is unavailable.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickSummary, DeliveryError> {
        let now = self.clock.now();
        let batch = self
            .store
            .fetch_pending(now, self.config.batch_size)
            .await?;

        let mut summary = TickSummary::default();
        for event in batch {
            if !self.store.claim(event.id).await? {
                debug!(event_id = %event.id, "claim lost to another relay instance");
                summary.skipped += 1;
                continue;
            }
            self.deliver(event, &mut summary).await?;
        }

        if summary.total() > 0 {
            info!(
                published = summary.published,
                retried = summary.retried,
                failed = summary.failed,
                skipped = summary.skipped,
                "relay tick complete"
            );
        }
        Ok(summary)
    }

    async fn deliver(
        &self,
        event: OutboxEvent,
        summary: &mut TickSummary,
    ) -> Result<(), DeliveryError> {
        let message = outbound_message(&event);
        match self.publish_bounded(&event.event_type, &message).await {
            Ok(()) => {
                self.store
                    .mark_processed(event.id, self.clock.now())
                    .await?;
                summary.published += 1;
            }
            Err(error) => {
                let retry_count = event.retry_count + 1;
                if self.config.retry.is_exhausted(retry_count) {
                    error!(
                        event_id = %event.id,
                        topic = %event.event_type,
                        retry_count,
                        %error,
                        "outbox event failed permanently"
                    );
                    self.store
                        .mark_failed(event.id, retry_count, &error.to_string())
                        .await?;
                    summary.failed += 1;
                } else {
                    let next_attempt_at =
                        self.config.retry.next_retry_at(self.clock.now(), retry_count);
                    warn!(
                        event_id = %event.id,
                        topic = %event.event_type,
                        retry_count,
                        %next_attempt_at,
                        %error,
                        "publish failed; released for retry"
                    );
                    self.store
                        .release_for_retry(
                            event.id,
                            retry_count,
                            &error.to_string(),
                            next_attempt_at,
                        )
                        .await?;
                    summary.retried += 1;
                }
            }
        }
        Ok(())
    }

    async fn publish_bounded(
        &self,
        topic: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        match tokio::time::timeout(
            self.config.publish_timeout,
            self.publisher.publish(topic, message),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::PublishTimeout(self.config.publish_timeout)),
        }
    }
}

/// Builds the bus message for an outbox event. The topic is the event type;
/// identifying fields travel as headers so consumers can trace delivery.
fn outbound_message(event: &OutboxEvent) -> OutboundMessage {
    let mut headers = HashMap::new();
    headers.insert("event_id".to_string(), event.id.to_string());
    headers.insert(
        "aggregate_type".to_string(),
        event.aggregate_type.clone(),
    );
    headers.insert("aggregate_id".to_string(), event.aggregate_id.clone());
    if let Some(correlation_id) = event.correlation_id {
        headers.insert("correlation_id".to_string(), correlation_id.to_string());
    }
    OutboundMessage {
        event_type: event.event_type.clone(),
        payload: event.payload.clone(),
        headers,
    }
}
