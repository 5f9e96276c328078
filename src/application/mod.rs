//! Application layer - the processing engine and its dispatch pool.
//!
//! This layer orchestrates the storage and transport ports; it owns no I/O
//! of its own.

mod dispatch_pool;
pub mod handlers;

pub use dispatch_pool::{DispatchPool, DispatchResult};
pub use handlers::{ProcessOrderCommand, ProcessOrderHandler, ProcessingSettings};
