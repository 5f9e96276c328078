//! InboundConsumer - acknowledgement policy around the processing engine.
//!
//! | Result | Acknowledgement |
//! |--------|-----------------|
//! | `Processed` | `Ack` |
//! | `Duplicate` | `Ack` (redelivery must not loop forever) |
//! | `RetryableFailure` | `Redeliver` |
//! | any `ProcessingError` | per `FailurePolicy` |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::{ProcessOrderCommand, ProcessOrderHandler};
use crate::domain::foundation::{DomainError, EventId};
use crate::domain::order::InboundEvent;
use crate::domain::processing::{
    ProcessingError, ProcessingOptions, ProcessingOutcome, ProcessingStrategy,
};
use crate::ports::ProcessingMetrics;

/// A message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDelivery {
    /// Value of the event id header, if present.
    pub event_id: Option<String>,
    pub partition_key: String,
    pub payload: Vec<u8>,
}

impl InboundDelivery {
    pub fn new(
        event_id: Option<String>,
        partition_key: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            event_id,
            partition_key: partition_key.into(),
            payload: payload.into(),
        }
    }
}

/// What the transport client should do with the delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Advance the offset.
    Ack,
    /// Leave the offset; the delivery comes back.
    Redeliver,
    /// Advance the offset and park the delivery elsewhere.
    DeadLetter,
}

/// Acknowledgement for hard processing failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Redeliver,
    DeadLetter,
}

impl FailurePolicy {
    fn acknowledgement(self) -> Acknowledgement {
        match self {
            FailurePolicy::Redeliver => Acknowledgement::Redeliver,
            FailurePolicy::DeadLetter => Acknowledgement::DeadLetter,
        }
    }
}

/// Consumer bound to one processing strategy.
pub struct InboundConsumer {
    handler: Arc<ProcessOrderHandler>,
    metrics: Arc<dyn ProcessingMetrics>,
    strategy: ProcessingStrategy,
    failure_policy: FailurePolicy,
    options: ProcessingOptions,
}

impl InboundConsumer {
    pub fn new(
        handler: Arc<ProcessOrderHandler>,
        metrics: Arc<dyn ProcessingMetrics>,
        strategy: ProcessingStrategy,
    ) -> Self {
        Self {
            handler,
            metrics,
            strategy,
            failure_policy: FailurePolicy::default(),
            options: ProcessingOptions::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Test seams applied to every delivery.
    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategy(&self) -> ProcessingStrategy {
        self.strategy
    }

    /// Processes one delivery and decides its acknowledgement.
    pub async fn on_delivery(&self, delivery: InboundDelivery) -> Acknowledgement {
        self.metrics.record_delivery(self.strategy);

        let result = match self.command(delivery) {
            Ok(cmd) => self.handler.handle(cmd).await,
            Err(e) => {
                self.metrics.record_outcome(self.strategy, e.kind());
                Err(e)
            }
        };

        match result {
            Ok(ProcessingOutcome::Processed(_)) | Ok(ProcessingOutcome::Duplicate(_)) => {
                Acknowledgement::Ack
            }
            Ok(ProcessingOutcome::RetryableFailure { reason }) => {
                tracing::warn!(strategy = %self.strategy, reason = %reason, "Transient failure, redelivering");
                Acknowledgement::Redeliver
            }
            Err(e) => {
                let ack = self.failure_policy.acknowledgement();
                tracing::error!(
                    strategy = %self.strategy,
                    error = %e,
                    kind = e.kind(),
                    acknowledgement = ?ack,
                    "Error processing message"
                );
                ack
            }
        }
    }

    fn command(&self, delivery: InboundDelivery) -> Result<ProcessOrderCommand, ProcessingError> {
        // NonIdempotent never reads the id header.
        let header = delivery.event_id.filter(|_| self.strategy.deduplicates());
        let event_id = match header {
            Some(raw) => Some(
                EventId::new(raw)
                    .map_err(|e| ProcessingError::InvalidPayload(DomainError::from(e)))?,
            ),
            None => None,
        };
        let event =
            InboundEvent::from_slice(&delivery.payload).map_err(ProcessingError::InvalidPayload)?;

        Ok(
            ProcessOrderCommand::new(event_id, delivery.partition_key, event, self.strategy)
                .with_options(self.options),
        )
    }
}
