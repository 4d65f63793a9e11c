//! Signalbox Outbox — the producer-side relay worker.
//!
//! Events are enqueued into the outbox table inside the caller's business
//! transaction (see `signalbox-store`); this crate drains that table. The
//! relay polls for due `Pending` rows on a timer, claims each one, hands it
//! to the message bus, and records the outcome with bounded exponential
//! backoff. Durability lives entirely in the store: a relay restart loses
//! nothing and simply resumes on the next tick.

mod relay;

pub use relay::{OutboxRelay, TickSummary};
