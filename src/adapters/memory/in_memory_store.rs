//! In-memory transactional store.
//!
//! Backs the deduplication store, the purchase order store and the outbox
//! with the same commit/rollback behaviour as the PostgreSQL adapter:
//!
//! - Writes are staged in the unit of work and applied together on commit.
//! - Marking an event id reserves it. A second unit of work marking the
//!   same id waits until the holder finishes, then observes
//!   `AlreadyProcessed` (holder committed) or takes the reservation itself
//!   (holder rolled back). This mirrors a unique index under concurrent
//!   inserts.
//! - Dropping a unit of work without committing rolls it back.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, OutboxEntryId, Timestamp};
use crate::domain::order::PurchaseOrder;
use crate::domain::processing::DedupOutcome;
use crate::ports::{
    NewOutboxEntry, OutboxEntry, OutboxReader, OutboxWriter, ProcessedEventStore,
    PurchaseOrderStore, TransactionManager, UnitOfWork,
};

#[derive(Default)]
struct StoreState {
    processed: BTreeMap<EventId, Timestamp>,
    /// Event ids marked by a unit of work that has not finished yet.
    reservations: HashMap<EventId, u64>,
    orders: Vec<PurchaseOrder>,
    outbox: Vec<OutboxEntry>,
    /// One-shot failure returned by the next commit.
    commit_failure: Option<ErrorCode>,
}

struct Shared {
    state: Mutex<StoreState>,
    released: Notify,
    next_tx_id: AtomicU64,
    contended: AtomicUsize,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, tx_id: u64) {
        self.state().reservations.retain(|_, owner| *owner != tx_id);
        self.released.notify_waiters();
    }
}

/// Transactional in-memory store.
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                released: Notify::new(),
                next_tx_id: AtomicU64::new(1),
                contended: AtomicUsize::new(0),
            }),
        }
    }

    // === Test Helpers ===

    /// Committed purchase orders.
    pub fn orders(&self) -> Vec<PurchaseOrder> {
        self.shared.state().orders.clone()
    }

    /// Committed processed-event ids.
    pub fn processed_event_ids(&self) -> Vec<EventId> {
        self.shared.state().processed.keys().cloned().collect()
    }

    pub fn is_processed(&self, event_id: &EventId) -> bool {
        self.shared.state().processed.contains_key(event_id)
    }

    /// Committed outbox entries not yet deleted by the relay.
    pub fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.shared.state().outbox.clone()
    }

    /// Number of attempts currently waiting on another unit of work's
    /// reservation of the same event id.
    pub fn contended_attempts(&self) -> usize {
        self.shared.contended.load(Ordering::SeqCst)
    }

    /// Makes the next commit fail with the given code and roll back.
    pub fn fail_next_commit(&self, code: ErrorCode) {
        self.shared.state().commit_failure = Some(code);
    }

    /// Removes all committed rows (for test isolation).
    pub fn clear(&self) {
        let mut state = self.shared.state();
        state.processed.clear();
        state.orders.clear();
        state.outbox.clear();
        state.commit_failure = None;
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionManager for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let tx_id = self.shared.next_tx_id.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryUnitOfWork {
            tx_id,
            shared: Arc::clone(&self.shared),
            reserved: Vec::new(),
            orders: Vec::new(),
            outbox: Vec::new(),
            finished: false,
        }))
    }
}

#[async_trait]
impl OutboxReader for InMemoryStore {
    async fn list_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        let state = self.shared.state();
        let mut entries = state.outbox.clone();
        entries.sort_by_key(|e| e.created_at);
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn delete(&self, id: OutboxEntryId) -> Result<bool, DomainError> {
        let mut state = self.shared.state();
        let before = state.outbox.len();
        state.outbox.retain(|e| e.id != id);
        Ok(state.outbox.len() != before)
    }

    async fn count_pending(&self) -> Result<u64, DomainError> {
        Ok(self.shared.state().outbox.len() as u64)
    }
}

/// Unit of work over an [`InMemoryStore`].
struct InMemoryUnitOfWork {
    tx_id: u64,
    shared: Arc<Shared>,
    reserved: Vec<EventId>,
    orders: Vec<PurchaseOrder>,
    outbox: Vec<OutboxEntry>,
    finished: bool,
}

#[async_trait]
impl ProcessedEventStore for InMemoryUnitOfWork {
    async fn try_mark_processed(
        &mut self,
        event_id: &EventId,
    ) -> Result<DedupOutcome, DomainError> {
        loop {
            let released = {
                let mut state = self.shared.state();
                if state.processed.contains_key(event_id) {
                    return Ok(DedupOutcome::AlreadyProcessed);
                }
                let holder = state.reservations.get(event_id).copied();
                match holder {
                    None => {
                        state.reservations.insert(event_id.clone(), self.tx_id);
                        self.reserved.push(event_id.clone());
                        return Ok(DedupOutcome::Accepted);
                    }
                    // Same id marked twice in one transaction.
                    Some(owner) if owner == self.tx_id => {
                        return Ok(DedupOutcome::AlreadyProcessed);
                    }
                    // Registered before the lock is released, so a release
                    // in between cannot be missed.
                    Some(_) => self.shared.released.notified(),
                }
            };

            self.shared.contended.fetch_add(1, Ordering::SeqCst);
            released.await;
            self.shared.contended.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl PurchaseOrderStore for InMemoryUnitOfWork {
    async fn insert_order(&mut self, order: &PurchaseOrder) -> Result<(), DomainError> {
        self.orders.push(order.clone());
        Ok(())
    }
}

#[async_trait]
impl OutboxWriter for InMemoryUnitOfWork {
    async fn enqueue(&mut self, entry: NewOutboxEntry) -> Result<OutboxEntryId, DomainError> {
        let entry = OutboxEntry::from_new(entry);
        let id = entry.id;
        self.outbox.push(entry);
        Ok(id)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut this = self;
        let shared = Arc::clone(&this.shared);
        this.finished = true;

        let failure = {
            let mut state = shared.state();
            match state.commit_failure.take() {
                Some(code) => Some(code),
                None => {
                    let now = Timestamp::now();
                    for id in this.reserved.drain(..) {
                        state.reservations.remove(&id);
                        state.processed.insert(id, now);
                    }
                    state.orders.append(&mut this.orders);
                    state.outbox.append(&mut this.outbox);
                    None
                }
            }
        };

        match failure {
            Some(code) => {
                shared.release(this.tx_id);
                Err(DomainError::new(code, "Commit failed"))
            }
            None => {
                shared.released.notify_waiters();
                Ok(())
            }
        }
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        let mut this = self;
        this.finished = true;
        this.shared.release(this.tx_id);
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.release(self.tx_id);
        }
    }
}
