//! DispatchPool - bounded parallel submission of processing attempts.
//!
//! Attempts are spawned onto a `JoinSet`; a semaphore caps how many run at
//! once. Callers wait for completion with `join_all` instead of guessing
//! with sleeps.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::processing::{ProcessingError, ProcessingOutcome};

use super::handlers::{ProcessOrderCommand, ProcessOrderHandler};

pub type DispatchResult = Result<ProcessingOutcome, ProcessingError>;

/// Worker pool running `ProcessOrderHandler::handle` on submitted commands.
pub struct DispatchPool {
    handler: Arc<ProcessOrderHandler>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<DispatchResult>,
}

impl DispatchPool {
    /// Creates a pool running at most `max_concurrency` attempts at once.
    /// Zero is treated as one.
    pub fn new(handler: Arc<ProcessOrderHandler>, max_concurrency: usize) -> Self {
        Self {
            handler,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Queues an attempt. Returns immediately.
    pub fn submit(&mut self, cmd: ProcessOrderCommand) {
        let handler = Arc::clone(&self.handler);
        let permits = Arc::clone(&self.permits);

        self.tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ProcessingError::Aborted(e.to_string()))?;
            handler.handle(cmd).await
        });
    }

    /// Attempts submitted and not yet joined.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for every submitted attempt, in completion order.
    ///
    /// A task that panicked or was cancelled yields `ProcessingError::Aborted`.
    pub async fn join_all(&mut self) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            results.push(match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Processing task did not complete");
                    Err(ProcessingError::Aborted(e.to_string()))
                }
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryTransport;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::metrics::NoopMetrics;
    use crate::domain::foundation::EventId;
    use crate::domain::order::InboundEvent;
    use crate::domain::processing::{ProcessingOptions, ProcessingStrategy};
    use crate::ports::PreMutationHook;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks the highest number of attempts inside the hook at once.
    #[derive(Default)]
    struct OverlapHook {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PreMutationHook for OverlapHook {
        async fn before_mutation(&self, _event_id: Option<&EventId>) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn pool(store: &InMemoryStore, hook: Arc<dyn PreMutationHook>, max: usize) -> DispatchPool {
        let handler = ProcessOrderHandler::new(
            Arc::new(store.clone()),
            Arc::new(InMemoryTransport::new()),
            hook,
            Arc::new(NoopMetrics),
        );
        DispatchPool::new(Arc::new(handler), max)
    }

    fn delayed_command() -> ProcessOrderCommand {
        ProcessOrderCommand::new(
            None,
            "someKey",
            InboundEvent::new("id", "someData"),
            ProcessingStrategy::NonIdempotent,
        )
        .with_options(ProcessingOptions::delayed())
    }

    #[tokio::test]
    async fn join_all_returns_every_submitted_result() {
        let store = InMemoryStore::new();
        let mut pool = pool(&store, Arc::new(OverlapHook::default()), 4);

        for _ in 0..3 {
            pool.submit(delayed_command());
        }
        assert_eq!(pool.in_flight(), 3);

        let results = pool.join_all().await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r, Ok(o) if o.is_processed())));
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(store.orders().len(), 3);
    }

    #[tokio::test]
    async fn concurrency_is_capped_by_pool_size() {
        let store = InMemoryStore::new();
        let hook = Arc::new(OverlapHook::default());
        let mut pool = pool(&store, hook.clone(), 1);

        for _ in 0..3 {
            pool.submit(delayed_command());
        }
        pool.join_all().await;

        assert_eq!(hook.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_concurrency_still_makes_progress() {
        let store = InMemoryStore::new();
        let mut pool = pool(&store, Arc::new(OverlapHook::default()), 0);

        pool.submit(delayed_command());

        assert_eq!(pool.join_all().await.len(), 1);
    }
}
