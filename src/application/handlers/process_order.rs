//! ProcessOrderHandler - the processing engine.
//!
//! Runs one processing attempt inside an explicit unit of work:
//!
//! 1. Deduplicate (idempotent strategies only)
//! 2. Run the pre-mutation hook when `delay` is set
//! 3. Insert the purchase order
//! 4. Emit the follow-on event: direct publish, or outbox enqueue
//! 5. Raise the injected failure when `simulate_failure` is set
//! 6. Commit
//!
//! Every error path rolls the unit of work back before returning.
//!
//! ## Dual-write gap
//!
//! The direct-publish strategies hand the follow-on event to the transport
//! before the local commit. If the commit then fails, the emission exists
//! without the order. This is logged and surfaced to the caller; it is not
//! retried here. The outbox strategy has no such gap.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EventId};
use crate::domain::order::{InboundEvent, PurchaseOrder};
use crate::domain::processing::{
    DedupOutcome, DeliveryReceipt, Emission, ProcessedOrder, ProcessingError, ProcessingOptions,
    ProcessingOutcome, ProcessingStrategy,
};
use crate::ports::{
    EventPublisher, NewOutboxEntry, OutboundMessage, PreMutationHook, ProcessingMetrics,
    TransactionManager, UnitOfWork,
};

const SIMULATED_FAILURE_MESSAGE: &str = "Database failed to commit";

/// Command to process one inbound delivery.
#[derive(Debug, Clone)]
pub struct ProcessOrderCommand {
    /// Logical event id. Required unless the strategy is `NonIdempotent`.
    pub event_id: Option<EventId>,
    pub partition_key: String,
    pub event: InboundEvent,
    pub strategy: ProcessingStrategy,
    pub options: ProcessingOptions,
}

impl ProcessOrderCommand {
    pub fn new(
        event_id: Option<EventId>,
        partition_key: impl Into<String>,
        event: InboundEvent,
        strategy: ProcessingStrategy,
    ) -> Self {
        Self {
            event_id,
            partition_key: partition_key.into(),
            event,
            strategy,
            options: ProcessingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Where follow-on events go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Topic for direct publishes.
    pub outbound_topic: String,
    /// Destination recorded on outbox entries.
    pub outbox_destination: String,
    /// Schema version recorded on outbox entries.
    pub schema_version: String,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            outbound_topic: "demo-outbound-topic".to_string(),
            outbox_destination: "demo-outbox-outbound".to_string(),
            schema_version: "v1".to_string(),
        }
    }
}

/// Writes staged in the open unit of work.
enum Staged {
    Ready(ProcessedOrder),
    Duplicate(EventId),
}

/// Handler for processing inbound order events.
pub struct ProcessOrderHandler {
    transactions: Arc<dyn TransactionManager>,
    publisher: Arc<dyn EventPublisher>,
    hook: Arc<dyn PreMutationHook>,
    metrics: Arc<dyn ProcessingMetrics>,
    settings: ProcessingSettings,
}

impl ProcessOrderHandler {
    pub fn new(
        transactions: Arc<dyn TransactionManager>,
        publisher: Arc<dyn EventPublisher>,
        hook: Arc<dyn PreMutationHook>,
        metrics: Arc<dyn ProcessingMetrics>,
    ) -> Self {
        Self {
            transactions,
            publisher,
            hook,
            metrics,
            settings: ProcessingSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ProcessingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    /// Runs one processing attempt.
    ///
    /// Duplicates and transient storage faults are returned as outcomes;
    /// everything else that aborts the attempt is an error.
    pub async fn handle(
        &self,
        cmd: ProcessOrderCommand,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let strategy = cmd.strategy;
        let result = match self.process(cmd).await {
            Err(ProcessingError::Storage(e)) => storage_outcome(e),
            other => other,
        };

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(e) => e.kind(),
        };
        self.metrics.record_outcome(strategy, label);

        result
    }

    async fn process(
        &self,
        cmd: ProcessOrderCommand,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        if cmd.strategy.deduplicates() && cmd.event_id.is_none() {
            return Err(ProcessingError::MissingEventId(cmd.strategy.as_str()));
        }

        tracing::debug!(
            event_id = cmd.event_id.as_ref().map(EventId::as_str),
            strategy = %cmd.strategy,
            "Processing inbound event"
        );

        let mut uow = self
            .transactions
            .begin()
            .await
            .map_err(ProcessingError::Storage)?;

        let processed = match self.stage(uow.as_mut(), &cmd).await {
            Ok(Staged::Ready(processed)) => processed,
            Ok(Staged::Duplicate(event_id)) => {
                tracing::warn!(event_id = %event_id, strategy = %cmd.strategy, "Event already processed");
                rollback(uow).await;
                return Ok(ProcessingOutcome::Duplicate(event_id));
            }
            Err(e) => {
                tracing::warn!(
                    event_id = cmd.event_id.as_ref().map(EventId::as_str),
                    strategy = %cmd.strategy,
                    error = %e,
                    "Processing failed, rolling back"
                );
                rollback(uow).await;
                return Err(e);
            }
        };

        if let Err(e) = uow.commit().await {
            if let Emission::Published(receipt) = &processed.emission {
                tracing::warn!(
                    event_id = cmd.event_id.as_ref().map(EventId::as_str),
                    destination = %receipt.destination,
                    position = %receipt.position,
                    error = %e,
                    "Commit failed after direct publish; emitted event has no committed order"
                );
            }
            return Err(ProcessingError::Storage(e));
        }

        tracing::debug!(
            event_id = cmd.event_id.as_ref().map(EventId::as_str),
            order_id = %processed.order.id,
            "Processing committed"
        );

        Ok(ProcessingOutcome::Processed(processed))
    }

    async fn stage(
        &self,
        uow: &mut dyn UnitOfWork,
        cmd: &ProcessOrderCommand,
    ) -> Result<Staged, ProcessingError> {
        if cmd.strategy.deduplicates() {
            if let Some(event_id) = &cmd.event_id {
                let dedup = uow
                    .try_mark_processed(event_id)
                    .await
                    .map_err(ProcessingError::Storage)?;
                if dedup == DedupOutcome::AlreadyProcessed {
                    return Ok(Staged::Duplicate(event_id.clone()));
                }
            }
        }

        if cmd.options.delay {
            self.hook.before_mutation(cmd.event_id.as_ref()).await;
        }

        let order = PurchaseOrder::new(cmd.event.data.clone());
        uow.insert_order(&order)
            .await
            .map_err(ProcessingError::Storage)?;

        let emission = if cmd.strategy.uses_outbox() {
            let entry_id = uow
                .enqueue(NewOutboxEntry {
                    destination: self.settings.outbox_destination.clone(),
                    schema_version: self.settings.schema_version.clone(),
                    partition_key: Some(cmd.partition_key.clone()),
                    payload: cmd.event.data.clone(),
                })
                .await
                .map_err(ProcessingError::Storage)?;
            tracing::debug!(outbox_entry_id = %entry_id, "Event written to outbox");
            Emission::Enqueued(entry_id)
        } else {
            Emission::Published(self.publish_direct(cmd).await?)
        };

        if cmd.options.simulate_failure {
            return Err(ProcessingError::simulated(SIMULATED_FAILURE_MESSAGE));
        }

        Ok(Staged::Ready(ProcessedOrder {
            event_id: cmd.event_id.clone(),
            order,
            emission,
        }))
    }

    async fn publish_direct(
        &self,
        cmd: &ProcessOrderCommand,
    ) -> Result<DeliveryReceipt, ProcessingError> {
        let outbound_id = Uuid::new_v4().to_string();
        let body = format!("eventId: {}, payload: {}", outbound_id, cmd.event.data);
        let message = OutboundMessage::new(
            self.settings.outbound_topic.clone(),
            cmd.partition_key.clone(),
            body.into_bytes(),
        )
        .with_event_id(outbound_id);

        let receipt = self
            .publisher
            .publish(message)
            .await
            .map_err(ProcessingError::Transport)?;

        tracing::debug!(
            destination = %receipt.destination,
            position = %receipt.position,
            key = %cmd.partition_key,
            "Follow-on event published"
        );
        Ok(receipt)
    }
}

async fn rollback(uow: Box<dyn UnitOfWork>) {
    if let Err(e) = uow.rollback().await {
        tracing::error!(error = %e, "Rollback failed");
    }
}

/// Transient storage faults become a retryable outcome; the rest stay errors.
fn storage_outcome(error: DomainError) -> Result<ProcessingOutcome, ProcessingError> {
    if error.is_retryable() {
        Ok(ProcessingOutcome::RetryableFailure {
            reason: error.to_string(),
        })
    } else {
        Err(ProcessingError::Storage(error))
    }
}
