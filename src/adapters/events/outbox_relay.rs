//! OutboxRelay - Background service draining the outbox to the transport.
//!
//! This service implements the second half of the Transactional Outbox Pattern:
//! 1. The processing engine writes follow-on events to the outbox (same
//!    transaction as the state mutation)
//! 2. **OutboxRelay polls the outbox and publishes to the transport** ← This module
//!
//! Each entry is published under its recorded destination and deleted only
//! after the transport confirmed the publish. A failed publish leaves the
//! entry in place for the next poll. A crash between publish and delete
//! publishes the entry again; the entry id travels as the event id so
//! downstream consumers can deduplicate.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 100ms | How often to check for pending entries |
//! | `batch_size` | 100 | Max entries to publish per poll cycle |
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal and drains one final batch
//! before stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::adapters::metrics::NoopMetrics;
use crate::domain::foundation::DomainError;
use crate::domain::order::InboundEvent;
use crate::ports::{EventPublisher, OutboundMessage, OutboxEntry, OutboxReader, ProcessingMetrics};

/// Configuration for the OutboxRelay service.
#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    /// How often to poll for pending entries.
    pub poll_interval: Duration,

    /// Maximum entries to process per poll cycle.
    pub batch_size: u32,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
        }
    }
}

impl OutboxRelayConfig {
    /// Create config with custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Entries published and deleted.
    pub published: usize,
    /// Entries whose publish failed; they stay pending.
    pub failed: usize,
}

/// Background service that relays outbox entries to the transport.
pub struct OutboxRelay {
    outbox: Arc<dyn OutboxReader>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<dyn ProcessingMetrics>,
    config: OutboxRelayConfig,
}

impl OutboxRelay {
    /// Create a new OutboxRelay with default configuration.
    pub fn new(outbox: Arc<dyn OutboxReader>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_config(outbox, publisher, OutboxRelayConfig::default())
    }

    /// Create a new OutboxRelay with custom configuration.
    pub fn with_config(
        outbox: Arc<dyn OutboxReader>,
        publisher: Arc<dyn EventPublisher>,
        config: OutboxRelayConfig,
    ) -> Self {
        Self {
            outbox,
            publisher,
            metrics: Arc::new(NoopMetrics),
            config,
        }
    }

    /// Report relay counters to the given sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn ProcessingMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run the relay loop until shutdown signal is received.
    ///
    /// Poll failures are logged and retried on the next tick; they never
    /// stop the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        self.poll_and_log().await;
                        tracing::info!("Outbox relay stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.poll_and_log().await;
                }
            }
        }
    }

    async fn poll_and_log(&self) {
        match self.poll_once().await {
            Ok(report) if report.published > 0 || report.failed > 0 => {
                tracing::debug!(
                    published = report.published,
                    failed = report.failed,
                    "Outbox relay cycle finished"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Outbox relay poll failed"),
        }
    }

    /// Run exactly one poll cycle.
    pub async fn poll_once(&self) -> Result<RelayReport, DomainError> {
        let entries = self.outbox.list_pending(self.config.batch_size).await?;
        let mut report = RelayReport::default();

        for entry in entries {
            let message = relay_message(&entry)?;

            match self.publisher.publish(message).await {
                Ok(receipt) => {
                    if !self.outbox.delete(entry.id).await? {
                        tracing::debug!(outbox_entry_id = %entry.id, "Outbox entry already deleted");
                    }
                    tracing::debug!(
                        outbox_entry_id = %entry.id,
                        destination = %receipt.destination,
                        position = %receipt.position,
                        "Outbox entry relayed"
                    );
                    self.metrics.record_relayed(&entry.destination);
                    report.published += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        outbox_entry_id = %entry.id,
                        destination = %entry.destination,
                        error = %e,
                        "Failed to relay outbox entry"
                    );
                    self.metrics.record_relay_failure(&entry.destination);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Outbound message for an entry: the payload wrapped as an `InboundEvent`
/// carrying the entry id.
fn relay_message(entry: &OutboxEntry) -> Result<OutboundMessage, DomainError> {
    let body = InboundEvent::new(entry.id.to_string(), entry.payload.clone()).to_vec()?;
    Ok(
        OutboundMessage::new(entry.destination.clone(), entry.publish_key(), body)
            .with_event_id(entry.id.to_string()),
    )
}
