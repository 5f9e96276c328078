//! PurchaseOrder - the durable effect of processing an inbound event.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, Timestamp};

/// A purchase order created from an accepted inbound event.
///
/// One order is written per accepted event; orders are never merged or
/// updated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: OrderId,
    /// Content of the inbound event that produced this order.
    pub name: String,
    pub created_at: Timestamp,
}

impl PurchaseOrder {
    /// Creates a new order stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OrderId::new(),
            name: name.into(),
            created_at: Timestamp::now(),
        }
    }
}
