//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Logical event identifier, supplied by the producer and stable across
/// redeliveries.
///
/// Opaque: any non-empty string is accepted (UUID, ULID, broker-specific).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates an EventId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("event_id"));
        }
        Ok(Self(id))
    }

    /// Creates a new random EventId using UUID v4.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Unique identifier for a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random OrderId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an OrderId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an outbox entry.
///
/// Also used as the outbound event id when the entry is relayed, so
/// downstream consumers can deduplicate repeated relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxEntryId(Uuid);

impl OutboxEntryId {
    /// Creates a new random OutboxEntryId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an OutboxEntryId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OutboxEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutboxEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OutboxEntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_rejects_empty_string() {
        assert!(EventId::new("").is_err());
        assert!(EventId::new("   ").is_err());
    }

    #[test]
    fn event_id_preserves_opaque_value() {
        let id = EventId::new("evt-123").unwrap();
        assert_eq!(id.as_str(), "evt-123");
        assert_eq!(id.to_string(), "evt-123");
    }

    #[test]
    fn event_id_serializes_transparently() {
        let id = EventId::new("evt-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""evt-1""#);
    }

    #[test]
    fn generated_event_ids_are_unique() {
        assert_ne!(EventId::generate(), EventId::generate());
    }

    #[test]
    fn order_ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn outbox_entry_id_parses_from_uuid_string() {
        let id = OutboxEntryId::new();
        let parsed: OutboxEntryId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn outbox_entry_id_rejects_invalid_uuid() {
        assert!("not-a-uuid".parse::<OutboxEntryId>().is_err());
    }
}
