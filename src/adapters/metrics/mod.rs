//! Metrics sink adapters.
//!
//! - `RecorderMetrics` forwards to the global `metrics` recorder.
//! - `InMemoryMetrics` keeps counters in memory for assertions.
//! - `NoopMetrics` discards everything.

mod in_memory_metrics;
mod recorder_metrics;

pub use in_memory_metrics::InMemoryMetrics;
pub use recorder_metrics::{
    RecorderMetrics, DELIVERIES_TOTAL, OUTBOX_RELAYED_TOTAL, OUTBOX_RELAY_FAILURES_TOTAL,
    PROCESSING_OUTCOMES_TOTAL,
};

use crate::domain::processing::ProcessingStrategy;
use crate::ports::ProcessingMetrics;

/// Sink that drops every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl ProcessingMetrics for NoopMetrics {
    fn record_delivery(&self, _strategy: ProcessingStrategy) {}

    fn record_outcome(&self, _strategy: ProcessingStrategy, _outcome: &'static str) {}

    fn record_relayed(&self, _destination: &str) {}

    fn record_relay_failure(&self, _destination: &str) {}
}
