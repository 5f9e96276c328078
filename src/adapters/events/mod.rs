//! Transport adapters.
//!
//! Adapters implement the `EventPublisher` port and drive the outbox:
//!
//! - `InMemoryTransport` - Recording transport for testing
//! - `RedisStreamPublisher` - Publishes to Redis streams
//! - `OutboxRelay` - Background service draining the outbox to the transport

mod in_memory_transport;
mod outbox_relay;
mod redis_stream_publisher;

pub use in_memory_transport::InMemoryTransport;
pub use outbox_relay::{OutboxRelay, OutboxRelayConfig, RelayReport};
pub use redis_stream_publisher::{
    stream_key, RedisStreamPublisher, EVENT_ID_FIELD, KEY_FIELD, PAYLOAD_FIELD,
};
