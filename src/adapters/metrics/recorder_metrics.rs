use metrics::counter;

use crate::domain::processing::ProcessingStrategy;
use crate::ports::ProcessingMetrics;

pub const DELIVERIES_TOTAL: &str = "idempotent_consumer_deliveries_total";
pub const PROCESSING_OUTCOMES_TOTAL: &str = "idempotent_consumer_outcomes_total";
pub const OUTBOX_RELAYED_TOTAL: &str = "idempotent_consumer_outbox_relayed_total";
pub const OUTBOX_RELAY_FAILURES_TOTAL: &str = "idempotent_consumer_outbox_relay_failures_total";

/// Sink backed by the process-wide `metrics` recorder.
///
/// Whatever exporter the binary installs receives the counters. With no
/// recorder installed every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMetrics;

impl RecorderMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessingMetrics for RecorderMetrics {
    fn record_delivery(&self, strategy: ProcessingStrategy) {
        counter!(DELIVERIES_TOTAL, "strategy" => strategy.as_str()).increment(1);
    }

    fn record_outcome(&self, strategy: ProcessingStrategy, outcome: &'static str) {
        counter!(
            PROCESSING_OUTCOMES_TOTAL,
            "strategy" => strategy.as_str(),
            "outcome" => outcome
        )
        .increment(1);
    }

    fn record_relayed(&self, destination: &str) {
        counter!(OUTBOX_RELAYED_TOTAL, "destination" => destination.to_string()).increment(1);
    }

    fn record_relay_failure(&self, destination: &str) {
        counter!(OUTBOX_RELAY_FAILURES_TOTAL, "destination" => destination.to_string())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_installed_recorder_is_harmless() {
        let metrics = RecorderMetrics::new();

        for strategy in ProcessingStrategy::all() {
            metrics.record_delivery(*strategy);
            metrics.record_outcome(*strategy, "processed");
        }
        metrics.record_relayed("demo-outbox-outbound");
        metrics.record_relay_failure("demo-outbox-outbound");
    }
}
