//! Idempotent Consumer - exactly-once business effect over at-least-once delivery.
//!
//! This crate deduplicates redelivered events against a unique-keyed
//! processed-events table and makes "update local state" plus "emit a
//! follow-on event" atomic through a transactional outbox drained by a relay.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
