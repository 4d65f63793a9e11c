//! Recording `EscalationSink` for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use signalbox_core::ports::EscalationSink;

/// Captures every escalation call as `(title, message, payload)`.
#[derive(Debug, Default)]
pub struct RecordingEscalation {
    alerts: Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl RecordingEscalation {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all alerts raised so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn alerts(&self) -> Vec<(String, String, serde_json::Value)> {
        self.alerts.lock().unwrap().clone()
    }

    /// Number of alerts raised so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl EscalationSink for RecordingEscalation {
    async fn escalate(&self, title: &str, message: &str, payload: &serde_json::Value) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string(), payload.clone()));
    }
}
