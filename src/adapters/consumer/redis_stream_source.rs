//! Redis streams delivery source.
//!
//! Reads the inbound stream through a consumer group. Entries stay in the
//! group's pending list until settled:
//!
//! - `Ack` - `XACK`
//! - `DeadLetter` - `XADD` to `<stream>:dead-letter`, then `XACK`
//! - `Redeliver` - nothing; the entry is read again from the pending list
//!
//! Each `receive` first re-reads this consumer's pending entries and only
//! blocks for new ones when none are left.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use crate::adapters::events::{EVENT_ID_FIELD, KEY_FIELD, PAYLOAD_FIELD};
use crate::domain::foundation::DomainError;

use super::{Acknowledgement, DeliverySource, InboundDelivery, SourcedDelivery};

/// Field recording the original entry id on dead-lettered copies.
pub const SOURCE_ID_FIELD: &str = "source_id";

/// Consumer-group reader over one inbound stream.
#[derive(Clone)]
pub struct RedisStreamSource {
    conn: MultiplexedConnection,
    stream: String,
    group: String,
    consumer: String,
    block: Duration,
}

impl RedisStreamSource {
    /// The connection should not be shared with publishers: blocking reads
    /// hold it for up to the block timeout.
    pub fn new(
        conn: MultiplexedConnection,
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            block: Duration::from_secs(1),
        }
    }

    /// How long a read waits for new entries.
    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    pub fn dead_letter_stream(&self) -> String {
        dead_letter_key(&self.stream)
    }

    /// Create the consumer group (and the stream) if missing.
    pub async fn ensure_group(&self) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let created: Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(&self.stream, &self.group, "0")
            .await;

        match created {
            Ok(()) => {
                tracing::info!(stream = %self.stream, group = %self.group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(self.stream_error("create consumer group", e)),
        }
    }

    async fn read(
        &self,
        from: &str,
        max: usize,
        block: Option<Duration>,
    ) -> Result<Vec<SourcedDelivery>, DomainError> {
        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(max);
        if let Some(block) = block {
            options = options.block(block.as_millis() as usize);
        }

        let mut conn = self.conn.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.stream], &[from], &options)
            .await
            .map_err(|e| self.stream_error("read", e))?;

        Ok(reply
            .map(|reply| {
                reply
                    .keys
                    .into_iter()
                    .flat_map(|key| key.ids)
                    .map(|entry| sourced_delivery(&entry))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn stream_error(&self, action: &str, e: redis::RedisError) -> DomainError {
        tracing::error!(stream = %self.stream, error = %e, "Failed to {} stream", action);
        DomainError::transport(format!("Failed to {} {}: {}", action, self.stream, e))
            .with_detail("stream", self.stream.clone())
    }
}

fn dead_letter_key(stream: &str) -> String {
    format!("{}:dead-letter", stream)
}

fn sourced_delivery(entry: &StreamId) -> SourcedDelivery {
    SourcedDelivery {
        receipt: entry.id.clone(),
        delivery: InboundDelivery::new(
            entry.get::<String>(EVENT_ID_FIELD),
            entry.get::<String>(KEY_FIELD).unwrap_or_default(),
            entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default(),
        ),
    }
}

fn dead_letter_fields(sourced: &SourcedDelivery) -> Vec<(&'static str, Vec<u8>)> {
    let delivery = &sourced.delivery;
    let mut fields = vec![
        (KEY_FIELD, delivery.partition_key.clone().into_bytes()),
        (PAYLOAD_FIELD, delivery.payload.clone()),
        (SOURCE_ID_FIELD, sourced.receipt.clone().into_bytes()),
    ];
    if let Some(event_id) = &delivery.event_id {
        fields.push((EVENT_ID_FIELD, event_id.clone().into_bytes()));
    }
    fields
}

#[async_trait]
impl DeliverySource for RedisStreamSource {
    async fn receive(&self, max: usize) -> Result<Vec<SourcedDelivery>, DomainError> {
        let pending = self.read("0", max, None).await?;
        if !pending.is_empty() {
            tracing::debug!(stream = %self.stream, count = pending.len(), "Re-reading pending entries");
            return Ok(pending);
        }
        self.read(">", max, Some(self.block)).await
    }

    async fn settle(
        &self,
        sourced: &SourcedDelivery,
        acknowledgement: Acknowledgement,
    ) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();

        match acknowledgement {
            Acknowledgement::Redeliver => return Ok(()),
            Acknowledgement::DeadLetter => {
                let dead_letter = self.dead_letter_stream();
                let position: String = conn
                    .xadd(&dead_letter, "*", dead_letter_fields(sourced).as_slice())
                    .await
                    .map_err(|e| self.stream_error("dead-letter into", e))?;
                tracing::warn!(
                    receipt = %sourced.receipt,
                    dead_letter = %dead_letter,
                    position = %position,
                    "Delivery dead-lettered"
                );
            }
            Acknowledgement::Ack => {}
        }

        let _: i64 = conn
            .xack(&self.stream, &self.group, &[&sourced.receipt])
            .await
            .map_err(|e| self.stream_error("acknowledge on", e))?;
        Ok(())
    }
}
