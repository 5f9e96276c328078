//! ConsumerLoop - pulls deliveries from a source and settles them.
//!
//! Each cycle receives up to `max_concurrency` deliveries, runs them through
//! the `InboundConsumer` in parallel on a `JoinSet`, and settles every
//! delivery with the acknowledgement the consumer chose. A delivery whose
//! task aborts is left unsettled, so the source hands it out again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time;

use crate::domain::foundation::DomainError;

use super::{Acknowledgement, DeliverySource, InboundConsumer};

const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Result of one consume cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    pub acked: usize,
    pub redelivered: usize,
    pub dead_lettered: usize,
    /// Aborted tasks and failed settlements; the source redelivers these.
    pub unsettled: usize,
}

impl ConsumeReport {
    pub fn received(&self) -> usize {
        self.acked + self.redelivered + self.dead_lettered + self.unsettled
    }

    fn record(&mut self, acknowledgement: Acknowledgement) {
        match acknowledgement {
            Acknowledgement::Ack => self.acked += 1,
            Acknowledgement::Redeliver => self.redelivered += 1,
            Acknowledgement::DeadLetter => self.dead_lettered += 1,
        }
    }
}

/// Background service feeding a `DeliverySource` into an `InboundConsumer`.
pub struct ConsumerLoop {
    source: Arc<dyn DeliverySource>,
    consumer: Arc<InboundConsumer>,
    max_concurrency: usize,
    idle_backoff: Duration,
}

impl ConsumerLoop {
    pub fn new(source: Arc<dyn DeliverySource>, consumer: Arc<InboundConsumer>) -> Self {
        Self {
            source,
            consumer,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }

    /// Deliveries processed at once. Values below 1 are raised to 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Pause after a cycle that acknowledged nothing.
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run consume cycles until shutdown signal is received.
    ///
    /// A cycle in flight at shutdown is dropped; its units of work roll back
    /// and its deliveries stay unsettled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            strategy = %self.consumer.strategy(),
            max_concurrency = self.max_concurrency,
            "Inbound consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                result = self.poll_once() => {
                    let idle = match result {
                        Ok(report) => {
                            if report.received() > 0 {
                                tracing::debug!(
                                    acked = report.acked,
                                    redelivered = report.redelivered,
                                    dead_lettered = report.dead_lettered,
                                    unsettled = report.unsettled,
                                    "Consume cycle finished"
                                );
                            }
                            report.acked == 0
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Receiving deliveries failed");
                            true
                        }
                    };
                    if idle {
                        time::sleep(self.idle_backoff).await;
                    }
                }
            }
        }

        tracing::info!("Inbound consumer stopped");
    }

    /// Run exactly one consume cycle.
    pub async fn poll_once(&self) -> Result<ConsumeReport, DomainError> {
        let batch = self.source.receive(self.max_concurrency).await?;
        let mut report = ConsumeReport::default();
        if batch.is_empty() {
            return Ok(report);
        }

        let mut tasks = JoinSet::new();
        for sourced in batch {
            let consumer = self.consumer.clone();
            tasks.spawn(async move {
                let acknowledgement = consumer.on_delivery(sourced.delivery.clone()).await;
                (sourced, acknowledgement)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (sourced, acknowledgement) = match joined {
                Ok(settled) => settled,
                Err(e) => {
                    tracing::error!(error = %e, "Delivery task aborted");
                    report.unsettled += 1;
                    continue;
                }
            };

            match self.source.settle(&sourced, acknowledgement).await {
                Ok(()) => report.record(acknowledgement),
                Err(e) => {
                    tracing::warn!(
                        receipt = %sourced.receipt,
                        acknowledgement = ?acknowledgement,
                        error = %e,
                        "Failed to settle delivery"
                    );
                    report.unsettled += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::consumer::{FailurePolicy, InboundDelivery, SourcedDelivery};
    use crate::adapters::events::InMemoryTransport;
    use crate::adapters::hooks::NoDelay;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::metrics::NoopMetrics;
    use crate::application::ProcessOrderHandler;
    use crate::domain::processing::ProcessingStrategy;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out queued deliveries and records settlements.
    #[derive(Default)]
    struct QueuedSource {
        queue: Mutex<VecDeque<SourcedDelivery>>,
        settled: Mutex<Vec<(String, Acknowledgement)>>,
        receive_sizes: Mutex<Vec<usize>>,
    }

    impl QueuedSource {
        fn push(&self, receipt: &str, event_id: Option<&str>, payload: &[u8]) {
            self.queue.lock().unwrap().push_back(SourcedDelivery {
                receipt: receipt.to_string(),
                delivery: InboundDelivery::new(
                    event_id.map(str::to_string),
                    "someKey",
                    payload.to_vec(),
                ),
            });
        }

        fn settled(&self) -> Vec<(String, Acknowledgement)> {
            let mut settled = self.settled.lock().unwrap().clone();
            settled.sort_by(|a, b| a.0.cmp(&b.0));
            settled
        }
    }

    #[async_trait]
    impl DeliverySource for QueuedSource {
        async fn receive(&self, max: usize) -> Result<Vec<SourcedDelivery>, DomainError> {
            let mut queue = self.queue.lock().unwrap();
            let take = max.min(queue.len());
            self.receive_sizes.lock().unwrap().push(take);
            Ok(queue.drain(..take).collect())
        }

        async fn settle(
            &self,
            delivery: &SourcedDelivery,
            acknowledgement: Acknowledgement,
        ) -> Result<(), DomainError> {
            self.settled
                .lock()
                .unwrap()
                .push((delivery.receipt.clone(), acknowledgement));
            Ok(())
        }
    }

    const ORDER: &[u8] = br#"{"id":"abc","data":"someData"}"#;

    fn consumer(store: &InMemoryStore, strategy: ProcessingStrategy) -> InboundConsumer {
        let handler = Arc::new(ProcessOrderHandler::new(
            Arc::new(store.clone()),
            Arc::new(InMemoryTransport::new()),
            Arc::new(NoDelay),
            Arc::new(NoopMetrics),
        ));
        InboundConsumer::new(handler, Arc::new(NoopMetrics), strategy)
    }

    #[tokio::test]
    async fn poll_once_settles_every_delivery() {
        let store = InMemoryStore::new();
        let source = Arc::new(QueuedSource::default());
        source.push("1-0", Some("e-1"), ORDER);
        source.push("1-1", Some("e-1"), ORDER);
        source.push("1-2", Some("e-2"), ORDER);

        let consumer_loop = ConsumerLoop::new(
            source.clone(),
            Arc::new(consumer(&store, ProcessingStrategy::IdempotentWithOutbox)),
        );
        let report = consumer_loop.poll_once().await.unwrap();

        assert_eq!(report.acked, 3);
        assert_eq!(report.received(), 3);
        assert_eq!(
            source.settled(),
            vec![
                ("1-0".to_string(), Acknowledgement::Ack),
                ("1-1".to_string(), Acknowledgement::Ack),
                ("1-2".to_string(), Acknowledgement::Ack),
            ]
        );
        assert_eq!(store.orders().len(), 2);
        assert_eq!(store.outbox_entries().len(), 2);
    }

    #[tokio::test]
    async fn receive_is_bounded_by_max_concurrency() {
        let store = InMemoryStore::new();
        let source = Arc::new(QueuedSource::default());
        for i in 0..5 {
            source.push(&format!("1-{}", i), Some(&format!("e-{}", i)), ORDER);
        }

        let consumer_loop = ConsumerLoop::new(
            source.clone(),
            Arc::new(consumer(&store, ProcessingStrategy::Idempotent)),
        )
        .with_max_concurrency(2);

        assert_eq!(consumer_loop.poll_once().await.unwrap().acked, 2);
        assert_eq!(consumer_loop.poll_once().await.unwrap().acked, 2);
        assert_eq!(consumer_loop.poll_once().await.unwrap().acked, 1);
        assert_eq!(*source.receive_sizes.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(store.orders().len(), 5);
    }

    #[tokio::test]
    async fn hard_failures_are_settled_per_policy() {
        let store = InMemoryStore::new();
        let source = Arc::new(QueuedSource::default());
        source.push("1-0", None, ORDER);
        source.push("1-1", Some("e-1"), b"not json");

        let consumer = consumer(&store, ProcessingStrategy::Idempotent)
            .with_failure_policy(FailurePolicy::DeadLetter);
        let report = ConsumerLoop::new(source.clone(), Arc::new(consumer))
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.dead_lettered, 2);
        assert_eq!(
            source.settled(),
            vec![
                ("1-0".to_string(), Acknowledgement::DeadLetter),
                ("1-1".to_string(), Acknowledgement::DeadLetter),
            ]
        );
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn zero_concurrency_is_raised_to_one() {
        let store = InMemoryStore::new();
        let consumer_loop = ConsumerLoop::new(
            Arc::new(QueuedSource::default()),
            Arc::new(consumer(&store, ProcessingStrategy::Idempotent)),
        )
        .with_max_concurrency(0);

        assert_eq!(consumer_loop.max_concurrency(), 1);
        assert_eq!(consumer_loop.poll_once().await.unwrap(), ConsumeReport::default());
    }

    #[tokio::test]
    async fn run_consumes_until_shutdown() {
        let store = InMemoryStore::new();
        let source = Arc::new(QueuedSource::default());
        source.push("1-0", Some("e-1"), ORDER);
        source.push("1-1", Some("e-2"), ORDER);

        let consumer_loop = Arc::new(
            ConsumerLoop::new(
                source.clone(),
                Arc::new(consumer(&store, ProcessingStrategy::IdempotentWithOutbox)),
            )
            .with_max_concurrency(1)
            .with_idle_backoff(Duration::from_millis(5)),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let running = consumer_loop.clone();
        let handle = tokio::spawn(async move { running.run(shutdown_rx).await });

        for _ in 0..200 {
            if source.settled().len() == 2 {
                break;
            }
            time::sleep(Duration::from_millis(5)).await;
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(source.settled().len(), 2);
        assert_eq!(store.orders().len(), 2);
    }
}
