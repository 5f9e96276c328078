//! PreMutationHook port - suspension point before the state mutation.
//!
//! Only invoked when the attempt was started with `delay` set. Tests use it
//! to widen the race window between concurrent attempts; production wiring
//! uses the no-op hook.

use async_trait::async_trait;

use crate::domain::foundation::EventId;

#[async_trait]
pub trait PreMutationHook: Send + Sync {
    async fn before_mutation(&self, event_id: Option<&EventId>);
}
