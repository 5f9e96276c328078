//! Hard failures of a processing attempt.

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that abort a processing attempt.
///
/// Duplicates and transient storage faults are not errors; they are
/// returned as [`super::ProcessingOutcome`] variants.
#[derive(Debug, Clone, Error)]
pub enum ProcessingError {
    /// Injected fault raised after all writes were staged. The transaction
    /// was rolled back.
    #[error("Simulated failure: {0}")]
    SimulatedFailure(String),

    /// Direct publish failed. The transaction was rolled back, so neither
    /// the order nor the emission exists.
    #[error("Transport error: {0}")]
    Transport(#[source] DomainError),

    /// Non-transient storage failure.
    #[error("Storage error: {0}")]
    Storage(DomainError),

    /// An idempotent strategy was invoked without an event id.
    #[error("Event id is required for the {0} strategy")]
    MissingEventId(&'static str),

    /// The delivery payload could not be decoded.
    #[error("Invalid payload: {0}")]
    InvalidPayload(DomainError),

    /// The processing task panicked or was cancelled before completing.
    #[error("Processing aborted: {0}")]
    Aborted(String),
}

impl ProcessingError {
    pub fn simulated(message: impl Into<String>) -> Self {
        ProcessingError::SimulatedFailure(message.into())
    }

    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::SimulatedFailure(_) => "simulated_failure",
            ProcessingError::Transport(_) => "transport_error",
            ProcessingError::Storage(_) => "storage_error",
            ProcessingError::MissingEventId(_) => "missing_event_id",
            ProcessingError::InvalidPayload(_) => "invalid_payload",
            ProcessingError::Aborted(_) => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_failure_displays_message() {
        let err = ProcessingError::simulated("Database failed to commit");
        assert_eq!(err.to_string(), "Simulated failure: Database failed to commit");
        assert_eq!(err.kind(), "simulated_failure");
    }

    #[test]
    fn transport_error_keeps_source() {
        use std::error::Error;

        let err = ProcessingError::Transport(DomainError::transport("broker unreachable"));
        assert_eq!(err.kind(), "transport_error");
        assert!(err.source().is_some());
    }

    #[test]
    fn missing_event_id_names_strategy() {
        let err = ProcessingError::MissingEventId("idempotent");
        assert_eq!(err.to_string(), "Event id is required for the idempotent strategy");
    }
}
