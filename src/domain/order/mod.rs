//! Order module - the business record written by the processing engine.

mod inbound_event;
mod purchase_order;

pub use inbound_event::InboundEvent;
pub use purchase_order::PurchaseOrder;
