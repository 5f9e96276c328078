//! Command handlers.

mod process_order;

pub use process_order::{ProcessOrderCommand, ProcessOrderHandler, ProcessingSettings};
