//! Consumer adapter - turns transport deliveries into processing attempts.
//!
//! - `InboundConsumer` - Runs one delivery and picks its acknowledgement
//! - `ConsumerLoop` - Feeds a `DeliverySource` through the consumer
//! - `RedisStreamSource` - Consumer-group reader over a Redis stream

mod consumer_loop;
mod delivery_source;
mod inbound_consumer;
mod redis_stream_source;

pub use consumer_loop::{ConsumeReport, ConsumerLoop};
pub use delivery_source::{DeliverySource, SourcedDelivery};
pub use inbound_consumer::{Acknowledgement, FailurePolicy, InboundConsumer, InboundDelivery};
pub use redis_stream_source::{RedisStreamSource, SOURCE_ID_FIELD};
