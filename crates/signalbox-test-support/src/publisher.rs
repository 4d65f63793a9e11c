//! Test publishers — scripted `Publisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use signalbox_core::error::DeliveryError;
use signalbox_core::event::OutboundMessage;
use signalbox_core::ports::Publisher;

/// When a `RecordingPublisher` should report failure.
#[derive(Debug, Clone)]
pub enum PublishFailure {
    /// Every publish succeeds.
    Never,
    /// Every publish fails.
    Always,
    /// The first `n` publishes fail, the rest succeed.
    FirstN(usize),
    /// Publishes to this topic fail; all others succeed.
    ForTopic(String),
}

/// A publisher that records every call and fails according to a script.
/// Successful and failed calls are both recorded.
#[derive(Debug)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<(String, OutboundMessage)>>,
    failure: PublishFailure,
    attempts: Mutex<usize>,
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPublisher {
    /// A publisher that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_failure(PublishFailure::Never)
    }

    /// A publisher that always fails.
    #[must_use]
    pub fn always_failing() -> Self {
        Self::with_failure(PublishFailure::Always)
    }

    /// A publisher failing according to `failure`.
    #[must_use]
    pub fn with_failure(failure: PublishFailure) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure,
            attempts: Mutex::new(0),
        }
    }

    /// Snapshot of all `(topic, message)` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<(String, OutboundMessage)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of publish calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn should_fail(&self, topic: &str, attempt: usize) -> bool {
        match &self.failure {
            PublishFailure::Never => false,
            PublishFailure::Always => true,
            PublishFailure::FirstN(n) => attempt < *n,
            PublishFailure::ForTopic(failing) => topic == failing,
        }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let current = *attempts;
            *attempts += 1;
            current
        };
        self.calls
            .lock()
            .unwrap()
            .push((topic.to_string(), message.clone()));

        if self.should_fail(topic, attempt) {
            Err(DeliveryError::Publish("scripted failure".into()))
        } else {
            Ok(())
        }
    }
}
