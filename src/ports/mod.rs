//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the processing engine and storage/transport. Adapters implement these ports.
//!
//! ## Transactional Ports
//!
//! - `TransactionManager` / `UnitOfWork` - explicit local transaction
//! - `ProcessedEventStore` - deduplication store
//! - `PurchaseOrderStore` - state store
//! - `OutboxWriter` - outbox enqueue
//!
//! ## Relay and Transport Ports
//!
//! - `OutboxReader` - list/delete pending outbox entries
//! - `EventPublisher` - direct publish to the transport
//!
//! ## Observability and Test Seams
//!
//! - `ProcessingMetrics` - delivery and outcome counters
//! - `PreMutationHook` - suspension point before the state mutation

mod event_publisher;
mod outbox;
mod pre_mutation_hook;
mod processed_event_store;
mod processing_metrics;
mod purchase_order_store;
mod unit_of_work;

pub use event_publisher::{EventPublisher, OutboundMessage};
pub use outbox::{NewOutboxEntry, OutboxEntry, OutboxReader, OutboxWriter};
pub use pre_mutation_hook::PreMutationHook;
pub use processed_event_store::ProcessedEventStore;
pub use processing_metrics::ProcessingMetrics;
pub use purchase_order_store::PurchaseOrderStore;
pub use unit_of_work::{TransactionManager, UnitOfWork};
