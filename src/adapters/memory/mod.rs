//! In-memory storage adapters.
//!
//! - `InMemoryStore` - transactional store backing all three stores and the
//!   relay-side outbox reader, for tests and local runs

mod in_memory_store;

pub use in_memory_store::InMemoryStore;
