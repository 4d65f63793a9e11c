//! Shared application state.

use std::sync::Arc;

use signalbox_core::ports::OutboxStore;
use signalbox_dlq::DlqProcessor;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The DLQ processor, shared with the background worker task so manual
    /// retries go through the exact per-row logic the schedule uses.
    pub processor: Arc<DlqProcessor>,
    /// Outbox store, used read-only for statistics.
    pub outbox_store: Arc<dyn OutboxStore>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(processor: Arc<DlqProcessor>, outbox_store: Arc<dyn OutboxStore>) -> Self {
        Self {
            processor,
            outbox_store,
        }
    }
}
