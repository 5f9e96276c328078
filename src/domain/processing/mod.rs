//! Processing module - vocabulary of the idempotent processing engine.
//!
//! - `ProcessingStrategy` - how much guarantee a processing attempt gets
//! - `ProcessingOptions` - test seams (fault injection, pre-mutation delay)
//! - `DedupOutcome` - result of marking an event id as processed
//! - `ProcessingOutcome` / `ProcessingError` - typed results of an attempt

mod errors;
mod outcome;
mod strategy;

pub use errors::ProcessingError;
pub use outcome::{DedupOutcome, DeliveryReceipt, Emission, ProcessedOrder, ProcessingOutcome};
pub use strategy::{ProcessingOptions, ProcessingStrategy};
