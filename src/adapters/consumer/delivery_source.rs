//! DeliverySource - the transport side of the consumer loop.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

use super::{Acknowledgement, InboundDelivery};

/// A delivery together with the transport handle needed to settle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedDelivery {
    /// Transport-specific position, e.g. a stream entry id.
    pub receipt: String,
    pub delivery: InboundDelivery,
}

/// Transport client feeding the consumer loop.
///
/// Anything received but never settled with `Ack` or `DeadLetter` must be
/// handed out again by a later `receive`.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Receive at most `max` deliveries. May wait for new ones.
    async fn receive(&self, max: usize) -> Result<Vec<SourcedDelivery>, DomainError>;

    /// Apply the consumer's decision for one delivery.
    async fn settle(
        &self,
        delivery: &SourcedDelivery,
        acknowledgement: Acknowledgement,
    ) -> Result<(), DomainError>;
}
