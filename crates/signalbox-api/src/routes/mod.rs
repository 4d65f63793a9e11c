//! Route modules for the operator API.

pub mod dead_letters;
pub mod health;
pub mod outbox;
