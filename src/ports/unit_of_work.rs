//! UnitOfWork port - explicit transaction demarcation.
//!
//! One unit of work spans the deduplication mark, the state mutation and
//! the outbox write. Either all three are committed or none are.
//!
//! ```ignore
//! let mut uow = transactions.begin().await?;
//! if uow.try_mark_processed(&event_id).await? == DedupOutcome::AlreadyProcessed {
//!     uow.rollback().await?;
//!     return Ok(ProcessingOutcome::Duplicate(event_id));
//! }
//! uow.insert_order(&order).await?;
//! uow.enqueue(entry).await?;
//! uow.commit().await?;
//! ```

use async_trait::async_trait;

use super::{OutboxWriter, ProcessedEventStore, PurchaseOrderStore};
use crate::domain::foundation::DomainError;

/// A single local transaction over all three stores.
///
/// Dropping a unit of work without committing rolls it back.
#[async_trait]
pub trait UnitOfWork: ProcessedEventStore + PurchaseOrderStore + OutboxWriter + Send {
    /// Make every staged write durable and visible.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discard every staged write, including the deduplication mark.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Factory for units of work.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn TransactionManager, _: Box<dyn UnitOfWork>) {}
}
