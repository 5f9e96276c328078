//! Outbox relay configuration

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::events::OutboxRelayConfig;

use super::error::ValidationError;

/// Outbox relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Run the relay in this process
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Max entries published per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl RelayConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Settings for `OutboxRelay::with_config`.
    pub fn relay_config(&self) -> OutboxRelayConfig {
        OutboxRelayConfig::default()
            .with_poll_interval(self.poll_interval())
            .with_batch_size(self.batch_size)
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 60_000 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if self.batch_size == 0 || self.batch_size > 10_000 {
            return Err(ValidationError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    100
}

fn default_batch_size() -> u32 {
    100
}
