//! Signalbox DLQ — the consumer-side dead-letter retry processor.
//!
//! Consumers record messages here after their own local retry budget runs
//! out. The processor polls for rows whose backoff window has elapsed,
//! republishes them to their original topic tagged as retries, and escalates
//! permanent failures to an operator-facing sink. It also exposes the
//! operator operations: forced retry of a single message and aggregate
//! statistics.

mod processor;

pub use processor::{DeadLetterOutcome, DlqProcessor, TickSummary};
