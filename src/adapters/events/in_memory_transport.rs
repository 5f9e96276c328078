//! In-memory transport implementation for testing.
//!
//! Records every confirmed publish so tests can assert on what reached the
//! transport, and can be switched into a failing mode to exercise the
//! `TransportError` paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::DomainError;
use crate::domain::processing::DeliveryReceipt;
use crate::ports::{EventPublisher, OutboundMessage};

/// Recording transport.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(InMemoryTransport::new());
/// transport.publish(message).await?;
///
/// assert_eq!(transport.count("demo-outbound-topic"), 1);
/// ```
#[derive(Default)]
pub struct InMemoryTransport {
    published: Mutex<Vec<OutboundMessage>>,
    offsets: Mutex<HashMap<String, u64>>,
    failing: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every publish fails with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // === Test Helpers ===

    /// Returns all published messages, in publish order.
    pub fn published(&self) -> Vec<OutboundMessage> {
        lock(&self.published).clone()
    }

    /// Returns messages published to a destination.
    pub fn messages_for(&self, destination: &str) -> Vec<OutboundMessage> {
        lock(&self.published)
            .iter()
            .filter(|m| m.destination == destination)
            .cloned()
            .collect()
    }

    /// Number of messages published to a destination.
    pub fn count(&self, destination: &str) -> usize {
        lock(&self.published)
            .iter()
            .filter(|m| m.destination == destination)
            .count()
    }

    /// Clears recorded messages (for test isolation).
    pub fn clear(&self) {
        lock(&self.published).clear();
        lock(&self.offsets).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl EventPublisher for InMemoryTransport {
    async fn publish(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::transport(format!(
                "Error sending message to topic {}",
                message.destination
            ))
            .with_detail("destination", message.destination));
        }

        let position = {
            let mut offsets = lock(&self.offsets);
            let offset = offsets.entry(message.destination.clone()).or_insert(0);
            let position = *offset;
            *offset += 1;
            position
        };

        let receipt = DeliveryReceipt {
            destination: message.destination.clone(),
            position: position.to_string(),
        };
        lock(&self.published).push(message);
        Ok(receipt)
    }
}
