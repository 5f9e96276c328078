//! Pre-mutation hook adapters.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::EventId;
use crate::ports::PreMutationHook;

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl PreMutationHook for NoDelay {
    async fn before_mutation(&self, _event_id: Option<&EventId>) {}
}

/// Sleeps for a fixed duration before every mutation.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    duration: Duration,
}

impl FixedDelay {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl PreMutationHook for FixedDelay {
    async fn before_mutation(&self, event_id: Option<&EventId>) {
        tracing::debug!(
            event_id = event_id.map(EventId::as_str),
            delay_ms = self.duration.as_millis() as u64,
            "Delaying before state mutation"
        );
        tokio::time::sleep(self.duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_delay_waits_for_configured_duration() {
        let hook = FixedDelay::new(Duration::from_millis(20));
        let started = tokio::time::Instant::now();

        hook.before_mutation(None).await;

        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn no_delay_returns_immediately() {
        NoDelay.before_mutation(None).await;
    }
}
