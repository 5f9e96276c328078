//! Processing strategies and per-attempt options.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing strategy, in increasing order of guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStrategy {
    /// Mutate state and publish directly. No deduplication, no atomicity.
    NonIdempotent,
    /// Deduplicate, mutate state and publish directly.
    ///
    /// Closes the duplicate-processing gap but not the dual-write gap.
    Idempotent,
    /// Deduplicate, mutate state and enqueue to the outbox in one
    /// transaction. No transport call on the hot path.
    IdempotentWithOutbox,
}

impl ProcessingStrategy {
    /// Returns every strategy, weakest first.
    pub fn all() -> &'static [ProcessingStrategy] {
        &[
            ProcessingStrategy::NonIdempotent,
            ProcessingStrategy::Idempotent,
            ProcessingStrategy::IdempotentWithOutbox,
        ]
    }

    /// Whether the strategy consults the deduplication store.
    pub fn deduplicates(&self) -> bool {
        !matches!(self, ProcessingStrategy::NonIdempotent)
    }

    /// Whether the follow-on event goes through the outbox.
    pub fn uses_outbox(&self) -> bool {
        matches!(self, ProcessingStrategy::IdempotentWithOutbox)
    }

    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStrategy::NonIdempotent => "non_idempotent",
            ProcessingStrategy::Idempotent => "idempotent",
            ProcessingStrategy::IdempotentWithOutbox => "idempotent_with_outbox",
        }
    }
}

impl fmt::Display for ProcessingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-attempt test seams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingOptions {
    /// After all writes are staged, fail with `SimulatedFailure` and roll back.
    pub simulate_failure: bool,
    /// Run the injected pre-mutation hook before the state mutation.
    pub delay: bool,
}

impl ProcessingOptions {
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub fn delayed() -> Self {
        Self {
            delay: true,
            ..Self::default()
        }
    }
}
