//! Shared test doubles for the Signalbox pipeline.

mod clock;
mod escalation;
mod publisher;
mod store;

pub use clock::{FixedClock, MutableClock};
pub use escalation::RecordingEscalation;
pub use publisher::{PublishFailure, RecordingPublisher};
pub use store::{InMemoryDeadLetterStore, InMemoryOutboxStore};
