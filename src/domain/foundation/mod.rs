//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps and error types used across the processing
//! engine, its stores and the relay.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EventId, OrderId, OutboxEntryId};
pub use timestamp::Timestamp;
