//! Redis-backed transport for deployments without a dedicated broker.
//!
//! Each destination is a Redis stream. A publish is an `XADD` with the
//! partition key, optional event id header and payload as fields; the
//! returned stream entry id is the delivery receipt position.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::DomainError;
use crate::domain::processing::DeliveryReceipt;
use crate::ports::{EventPublisher, OutboundMessage};

/// Header field carrying the event id, readable by downstream consumers.
pub const EVENT_ID_FIELD: &str = "demo_eventIdHeader";
/// Field carrying the partition key.
pub const KEY_FIELD: &str = "key";
/// Field carrying the message body.
pub const PAYLOAD_FIELD: &str = "payload";

/// Redis streams publisher.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn: MultiplexedConnection,
    stream_prefix: String,
}

impl RedisStreamPublisher {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            stream_prefix: String::new(),
        }
    }

    /// Prefix every stream key, e.g. with an environment name.
    pub fn with_stream_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.stream_prefix = prefix.into();
        self
    }

    fn stream_key(&self, destination: &str) -> String {
        stream_key(&self.stream_prefix, destination)
    }
}

/// Stream key for a destination under an optional prefix.
pub fn stream_key(prefix: &str, destination: &str) -> String {
    if prefix.is_empty() {
        destination.to_string()
    } else {
        format!("{}:{}", prefix, destination)
    }
}

fn message_fields(message: OutboundMessage) -> Vec<(&'static str, Vec<u8>)> {
    let mut fields = vec![
        (KEY_FIELD, message.key.into_bytes()),
        (PAYLOAD_FIELD, message.payload),
    ];
    if let Some(event_id) = message.event_id {
        fields.push((EVENT_ID_FIELD, event_id.into_bytes()));
    }
    fields
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError> {
        let destination = message.destination.clone();
        let key = self.stream_key(&destination);
        let fields = message_fields(message);

        let mut conn = self.conn.clone();
        let position: String = conn
            .xadd(&key, "*", fields.as_slice())
            .await
            .map_err(|e: redis::RedisError| {
                tracing::error!(destination = %destination, error = %e, "Error sending message to stream");
                DomainError::transport(format!("Failed to publish to {}: {}", destination, e))
                    .with_detail("destination", destination.clone())
            })?;

        tracing::debug!(destination = %destination, position = %position, "Sent record");

        Ok(DeliveryReceipt {
            destination,
            position,
        })
    }
}
