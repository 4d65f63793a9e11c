//! Signalbox API — operator-facing HTTP surface.
//!
//! Exposed as a library so integration tests can build the router against
//! test doubles; the binary in `main.rs` wires the real stores and workers.

pub mod error;
pub mod routes;
pub mod state;
