//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - transactional in-memory store
//! - `postgres` - PostgreSQL stores (sqlx)
//! - `events` - transports and the outbox relay
//! - `consumer` - inbound delivery handling and acknowledgement policy
//! - `metrics` - metrics sinks
//! - `hooks` - pre-mutation hooks

pub mod consumer;
pub mod events;
pub mod hooks;
pub mod memory;
pub mod metrics;
pub mod postgres;
