//! The timer-driven dead-letter processor.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use signalbox_core::clock::Clock;
use signalbox_core::config::DlqConfig;
use signalbox_core::error::DeliveryError;
use signalbox_core::event::{DeadLetterEvent, DeadLetterStats, DeadLetterStatus, OutboundMessage};
use signalbox_core::ports::{DeadLetterStore, EscalationSink, Publisher};

/// What happened to a single dead-letter message during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterOutcome {
    /// Republished successfully; the row is processed.
    Published,
    /// Republish failed; the row stays pending with a later retry window.
    Rescheduled,
    /// Retries exhausted; the row is failed and an alert was raised.
    Escalated,
}

impl DeadLetterOutcome {
    /// Stable string form for API responses and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Rescheduled => "rescheduled",
            Self::Escalated => "escalated",
        }
    }
}

/// Outcome counts for a single processor tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Messages republished successfully.
    pub published: usize,
    /// Messages rescheduled with a later backoff window.
    pub rescheduled: usize,
    /// Messages escalated after retry exhaustion.
    pub escalated: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: DeadLetterOutcome) {
        match outcome {
            DeadLetterOutcome::Published => self.published += 1,
            DeadLetterOutcome::Rescheduled => self.rescheduled += 1,
            DeadLetterOutcome::Escalated => self.escalated += 1,
        }
    }

    fn total(self) -> usize {
        self.published + self.rescheduled + self.escalated
    }
}

/// Background worker that replays dead-letter messages.
pub struct DlqProcessor {
    store: Arc<dyn DeadLetterStore>,
    publisher: Arc<dyn Publisher>,
    escalation: Arc<dyn EscalationSink>,
    clock: Arc<dyn Clock>,
    config: DlqConfig,
}

impl DlqProcessor {
    /// Creates a processor over the given store, publisher, and sink.
    #[must_use]
    pub fn new(
        store: Arc<dyn DeadLetterStore>,
        publisher: Arc<dyn Publisher>,
        escalation: Arc<dyn EscalationSink>,
        clock: Arc<dyn Clock>,
        config: DlqConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            escalation,
            clock,
            config,
        }
    }

    /// Runs the processor until `shutdown` flips to `true`. An in-flight
    /// batch drains to completion before the loop exits. Takes `Arc<Self>`
    /// so the operator API can keep calling `retry_message` and
    /// `statistics` on the same instance.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_interval = ?self.config.poll_interval,
            batch_size = self.config.batch_size,
            "dlq processor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            if let Err(error) = self.tick().await {
                warn!(%error, "dlq tick aborted; the store is authoritative, retrying next tick");
            }
            if *shutdown.borrow() {
                break;
            }
        }

        info!("dlq processor stopped");
    }

    /// Processes one batch of due pending messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Store` when the store is unavailable; per-row
    /// publish failures are absorbed into reschedule/escalate transitions.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickSummary, DeliveryError> {
        let now = self.clock.now();
        let batch = self
            .store
            .fetch_due(now, self.config.batch_size, self.config.retry.max_retries)
            .await?;

        let mut summary = TickSummary::default();
        for message in batch {
            let outcome = self.process_message(message).await?;
            summary.record(outcome);
        }

        if summary.total() > 0 {
            info!(
                published = summary.published,
                rescheduled = summary.rescheduled,
                escalated = summary.escalated,
                "dlq tick complete"
            );
        }
        Ok(summary)
    }

    /// Operator-forced retry of a single message, bypassing the schedule.
    ///
    /// Resets `retry_count` to 0 and `next_retry_at` to now, then runs the
    /// regular per-row logic synchronously.
    ///
    /// # Errors
    ///
    /// Returns `MessageNotFound` for an unknown id and `InvalidState` when
    /// the message was already processed.
    #[instrument(skip(self), fields(message_id = %id))]
    pub async fn retry_message(&self, id: Uuid) -> Result<DeadLetterOutcome, DeliveryError> {
        let message = self
            .store
            .get(id)
            .await?
            .ok_or(DeliveryError::MessageNotFound(id))?;

        if message.status == DeadLetterStatus::Processed {
            return Err(DeliveryError::InvalidState {
                id,
                status: message.status.as_str().to_string(),
                operation: "manual retry",
            });
        }

        let message = self.store.reset_for_retry(id, self.clock.now()).await?;
        info!(message_id = %id, topic = %message.original_topic, "manual retry requested");
        self.process_message(message).await
    }

    /// Aggregate counts for the operator surface. Observability only; no
    /// control flow depends on these numbers.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Store` when the store is unavailable.
    pub async fn statistics(&self) -> Result<DeadLetterStats, DeliveryError> {
        self.store.statistics().await
    }

    async fn process_message(
        &self,
        message: DeadLetterEvent,
    ) -> Result<DeadLetterOutcome, DeliveryError> {
        let attempt = message.retry_count + 1;
        let outbound = retry_message_for(&message, attempt);

        match self
            .publish_bounded(&message.original_topic, &outbound)
            .await
        {
            Ok(()) => {
                self.store
                    .mark_processed(message.id, attempt, self.clock.now())
                    .await?;
                info!(
                    message_id = %message.id,
                    topic = %message.original_topic,
                    retry_count = attempt,
                    "dead-letter message republished"
                );
                Ok(DeadLetterOutcome::Published)
            }
            Err(publish_error) => {
                if self.config.retry.is_exhausted(attempt) {
                    self.store
                        .mark_failed(message.id, attempt, &publish_error.to_string())
                        .await?;
                    error!(
                        message_id = %message.id,
                        topic = %message.original_topic,
                        retry_count = attempt,
                        %publish_error,
                        "dead-letter message failed permanently"
                    );
                    self.escalation
                        .escalate(
                            "Dead-letter message exhausted retries",
                            &format!(
                                "message {} on topic {} failed {} retries; last error: {}",
                                message.id, message.original_topic, attempt, publish_error
                            ),
                            &message.payload,
                        )
                        .await;
                    Ok(DeadLetterOutcome::Escalated)
                } else {
                    let next_retry_at =
                        self.config.retry.next_retry_at(self.clock.now(), attempt);
                    self.store
                        .schedule_retry(
                            message.id,
                            attempt,
                            &publish_error.to_string(),
                            next_retry_at,
                        )
                        .await?;
                    warn!(
                        message_id = %message.id,
                        topic = %message.original_topic,
                        retry_count = attempt,
                        %next_retry_at,
                        %publish_error,
                        "republish failed; rescheduled with backoff"
                    );
                    Ok(DeadLetterOutcome::Rescheduled)
                }
            }
        }
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

/// Rebuilds the original message with retry headers attached, so consumers
/// can detect and log repeated deliveries.
fn retry_message_for(message: &DeadLetterEvent, attempt: i32) -> OutboundMessage {
    let mut headers = message.metadata.clone();
    headers.insert("retry".to_string(), "true".to_string());
    headers.insert("retry_count".to_string(), attempt.to_string());
    headers.insert("original_id".to_string(), message.id.to_string());
    OutboundMessage {
        event_type: message.original_topic.clone(),
        payload: message.payload.clone(),
        headers,
    }
}
