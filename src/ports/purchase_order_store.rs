//! PurchaseOrderStore port - the state store.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::order::PurchaseOrder;

/// Transaction-scoped writer for purchase orders.
///
/// The insert only becomes visible when the owning unit of work commits.
#[async_trait]
pub trait PurchaseOrderStore: Send {
    async fn insert_order(&mut self, order: &PurchaseOrder) -> Result<(), DomainError>;
}
