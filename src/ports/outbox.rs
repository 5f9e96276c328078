//! Outbox ports - Interfaces for transactional event persistence.
//!
//! Implements the two halves of the Transactional Outbox Pattern:
//!
//! 1. `OutboxWriter` - the processing engine enqueues the follow-on event
//!    in the same unit of work as the state mutation
//! 2. `OutboxReader` - the relay lists pending entries, publishes them and
//!    deletes each one only after the transport confirmed the publish
//!
//! Relaying is at-least-once: a crash between publish and delete publishes
//! the entry again, so downstream consumers must be idempotent too.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, OutboxEntryId, Timestamp};

/// A follow-on event to be enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboxEntry {
    /// Logical topic the relay publishes to.
    pub destination: String,
    pub schema_version: String,
    /// Partition key the relay publishes with.
    pub partition_key: Option<String>,
    pub payload: String,
}

/// An entry in the outbox table, waiting for relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: OutboxEntryId,
    pub schema_version: String,
    pub destination: String,
    pub partition_key: Option<String>,
    pub payload: String,
    pub created_at: Timestamp,
}

impl OutboxEntry {
    /// Stamps a new entry with a fresh id and the current time.
    pub fn from_new(entry: NewOutboxEntry) -> Self {
        Self {
            id: OutboxEntryId::new(),
            schema_version: entry.schema_version,
            destination: entry.destination,
            partition_key: entry.partition_key,
            payload: entry.payload,
            created_at: Timestamp::now(),
        }
    }

    /// Key to publish with: the partition key, else the entry id.
    pub fn publish_key(&self) -> String {
        self.partition_key
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Transaction-scoped outbox writer.
#[async_trait]
pub trait OutboxWriter: Send {
    /// Stage an entry in the current unit of work.
    async fn enqueue(&mut self, entry: NewOutboxEntry) -> Result<OutboxEntryId, DomainError>;
}

/// Relay-side access to the outbox, outside any processing transaction.
#[async_trait]
pub trait OutboxReader: Send + Sync {
    /// Returns committed entries, oldest first, at most `limit` of them.
    async fn list_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError>;

    /// Deletes an entry. Deleting a missing entry is a no-op returning `false`.
    async fn delete(&self, id: OutboxEntryId) -> Result<bool, DomainError>;

    /// Number of committed entries still waiting for relay.
    async fn count_pending(&self) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(partition_key: Option<&str>) -> NewOutboxEntry {
        NewOutboxEntry {
            destination: "demo-outbox-outbound".to_string(),
            schema_version: "v1".to_string(),
            partition_key: partition_key.map(str::to_string),
            payload: "someData".to_string(),
        }
    }

    #[test]
    fn from_new_copies_fields_and_assigns_identity() {
        let a = OutboxEntry::from_new(new_entry(Some("someKey")));
        let b = OutboxEntry::from_new(new_entry(Some("someKey")));

        assert_eq!(a.destination, "demo-outbox-outbound");
        assert_eq!(a.schema_version, "v1");
        assert_eq!(a.payload, "someData");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn publish_key_prefers_partition_key() {
        let entry = OutboxEntry::from_new(new_entry(Some("someKey")));
        assert_eq!(entry.publish_key(), "someKey");
    }

    #[test]
    fn publish_key_falls_back_to_entry_id() {
        let entry = OutboxEntry::from_new(new_entry(None));
        assert_eq!(entry.publish_key(), entry.id.to_string());
    }

    #[allow(dead_code)]
    fn assert_reader_object_safe(_: &dyn OutboxReader) {}
}
