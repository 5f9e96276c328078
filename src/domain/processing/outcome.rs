//! Typed outcomes of deduplication and of whole processing attempts.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, OutboxEntryId};
use crate::domain::order::PurchaseOrder;

/// Result of attempting to mark an event id as processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First time this id is seen; the mark is part of the current transaction.
    Accepted,
    /// The id was already marked by a committed transaction.
    AlreadyProcessed,
}

/// Confirmation returned by the transport for a direct publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub destination: String,
    /// Transport-assigned position of the message (offset, stream id, ...).
    pub position: String,
}

/// How the follow-on event left the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Published directly to the transport, outside the local transaction.
    Published(DeliveryReceipt),
    /// Written to the outbox in the same transaction as the order.
    Enqueued(OutboxEntryId),
}

/// A committed processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedOrder {
    pub event_id: Option<EventId>,
    pub order: PurchaseOrder,
    pub emission: Emission,
}

/// Typed outcome of a processing attempt that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// State committed and follow-on event emitted or enqueued.
    Processed(ProcessedOrder),
    /// The event id was already processed. Acknowledge and ignore.
    Duplicate(EventId),
    /// A transient storage fault rolled the attempt back; retry the delivery.
    RetryableFailure { reason: String },
}

impl ProcessingOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, ProcessingOutcome::Processed(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ProcessingOutcome::Duplicate(_))
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingOutcome::Processed(_) => "processed",
            ProcessingOutcome::Duplicate(_) => "duplicate",
            ProcessingOutcome::RetryableFailure { .. } => "retryable_failure",
        }
    }
}
