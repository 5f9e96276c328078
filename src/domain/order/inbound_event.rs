//! InboundEvent - payload carried by an inbound delivery.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};

/// Decoded body of an inbound delivery.
///
/// The relay also emits this shape, with `id` set to the outbox entry id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub data: String,
}

impl InboundEvent {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            data: data.into(),
        }
    }

    /// Decodes an event from a JSON byte payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(payload).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationFailed,
                format!("Invalid inbound payload: {}", e),
            )
        })
    }

    /// Encodes the event as a JSON byte payload.
    pub fn to_vec(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(self).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationFailed,
                format!("Failed to encode event: {}", e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payload_with_id_and_data() {
        let event = InboundEvent::from_slice(br#"{"id":"someKey","data":"someData"}"#).unwrap();

        assert_eq!(event.id.as_deref(), Some("someKey"));
        assert_eq!(event.data, "someData");
    }

    #[test]
    fn id_is_optional() {
        let event = InboundEvent::from_slice(br#"{"data":"someData"}"#).unwrap();
        assert!(event.id.is_none());
    }

    #[test]
    fn rejects_payload_without_data() {
        let err = InboundEvent::from_slice(br#"{"id":"x"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::SerializationFailed);
    }

    #[test]
    fn rejects_non_json_payload() {
        assert!(InboundEvent::from_slice(b"not json").is_err());
    }
}
