//! ProcessedEventStore port - the deduplication store.
//!
//! Holds the set of logical event ids that have already been handled.
//! Uniqueness is enforced by the storage layer (a primary key), never by
//! application-level locking, so concurrent deliveries of the same event
//! are serialized by the store itself.
//!
//! The mark participates in the ambient unit of work: if the transaction
//! rolls back, the mark is rolled back too and a redelivery can succeed.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId};
use crate::domain::processing::DedupOutcome;

/// Transaction-scoped deduplication store.
///
/// Implementations must be linearizable per event id: exactly one caller
/// observes `Accepted`, every other caller (concurrent or later) observes
/// `AlreadyProcessed`. A uniqueness conflict is translated into
/// `AlreadyProcessed`, never into an error.
///
/// If another in-flight transaction holds the same id, the call waits for
/// that transaction to finish, as a unique index would.
#[async_trait]
pub trait ProcessedEventStore: Send {
    /// Insert the event id into the processed set.
    async fn try_mark_processed(&mut self, event_id: &EventId)
        -> Result<DedupOutcome, DomainError>;
}
