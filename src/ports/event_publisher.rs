//! EventPublisher port - direct publish to the message transport.
//!
//! Used on the hot path by the non-outbox strategies and by the outbox
//! relay. A publish has no transactional link to local storage.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::processing::DeliveryReceipt;

/// A message to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub destination: String,
    pub key: String,
    /// Event id header, for downstream deduplication.
    pub event_id: Option<String>,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn new(
        destination: impl Into<String>,
        key: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            destination: destination.into(),
            key: key.into(),
            event_id: None,
            payload: payload.into(),
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

/// Port for publishing to the transport.
///
/// Returns once the transport confirmed the publish. Errors are
/// `ErrorCode::TransportError`.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError>;
}
