//! ProcessingMetrics port - injectable metrics sink.
//!
//! Counters are monotonic in production. Test sinks expose a reset so each
//! fixture starts from zero.

use crate::domain::processing::ProcessingStrategy;

/// Sink for delivery, outcome and relay counters.
pub trait ProcessingMetrics: Send + Sync {
    /// A delivery reached the consumer adapter.
    fn record_delivery(&self, strategy: ProcessingStrategy);

    /// A processing attempt finished with the given outcome or error label.
    fn record_outcome(&self, strategy: ProcessingStrategy, outcome: &'static str);

    /// The relay published (and deleted) an outbox entry.
    fn record_relayed(&self, destination: &str);

    /// The relay failed to publish an outbox entry.
    fn record_relay_failure(&self, destination: &str);
}
