//! Signalbox Core — shared types and ports for the event-delivery pipeline.
//!
//! This crate defines the event record shapes, the traits the pipeline
//! stages depend on (stores, publisher, escalation sink, clock), the retry
//! policy, and configuration. It contains no infrastructure code.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod ports;
pub mod retry;
