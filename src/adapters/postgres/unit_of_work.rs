//! PostgreSQL unit of work.
//!
//! One database transaction covers the dedup record, the purchase order and
//! the outbox entry, so they commit or roll back together.
//!
//! Deduplication relies on the primary key of `processed_events`:
//! `INSERT ... ON CONFLICT DO NOTHING` affects zero rows for an id that is
//! already committed. When another transaction holds an uncommitted insert
//! of the same id, PostgreSQL blocks the second insert until the first
//! finishes, then reports zero rows (first committed) or inserts (first
//! rolled back).

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::foundation::{DomainError, EventId, OutboxEntryId, Timestamp};
use crate::domain::order::PurchaseOrder;
use crate::domain::processing::DedupOutcome;
use crate::ports::{
    NewOutboxEntry, OutboxEntry, OutboxWriter, ProcessedEventStore, PurchaseOrderStore,
    TransactionManager, UnitOfWork,
};

use super::errors::classify_sqlx_error;

/// Opens PostgreSQL-backed units of work.
#[derive(Clone)]
pub struct PostgresTransactionManager {
    pool: PgPool,
}

impl PostgresTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PostgresTransactionManager {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to begin transaction"))?;

        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// A single PostgreSQL transaction.
///
/// Dropping it without calling `commit` rolls the transaction back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProcessedEventStore for PostgresUnitOfWork {
    async fn try_mark_processed(&mut self, event_id: &EventId) -> Result<DedupOutcome, DomainError> {
        let processed_at = Timestamp::now();
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (id, processed_at)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event_id.as_str())
        .bind(processed_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to record processed event"))?;

        if result.rows_affected() == 0 {
            Ok(DedupOutcome::AlreadyProcessed)
        } else {
            Ok(DedupOutcome::Accepted)
        }
    }
}

#[async_trait]
impl PurchaseOrderStore for PostgresUnitOfWork {
    async fn insert_order(&mut self, order: &PurchaseOrder) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, name, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.name)
        .bind(order.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to insert purchase order"))?;

        Ok(())
    }
}

#[async_trait]
impl OutboxWriter for PostgresUnitOfWork {
    async fn enqueue(&mut self, entry: NewOutboxEntry) -> Result<OutboxEntryId, DomainError> {
        let entry = OutboxEntry::from_new(entry);

        sqlx::query(
            r#"
            INSERT INTO outbox_events (
                id, version, destination, partition_key, payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(&entry.schema_version)
        .bind(&entry.destination)
        .bind(&entry.partition_key)
        .bind(&entry.payload)
        .bind(entry.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to insert outbox entry"))?;

        Ok(entry.id)
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to commit transaction"))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to roll back transaction"))
    }
}

#[cfg(test)]
mod tests {
    //! These tests need a PostgreSQL instance reachable through
    //! `DATABASE_URL`; run them with `cargo test -- --ignored`.

    use super::*;
    use crate::adapters::postgres::{run_migrations, PostgresOutboxReader};
    use crate::ports::OutboxReader;

    async fn setup() -> PostgresTransactionManager {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        PostgresTransactionManager::new(pool)
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn second_mark_after_commit_is_already_processed() {
        let manager = setup().await;
        let event_id = EventId::generate();

        let mut uow = manager.begin().await.unwrap();
        assert_eq!(uow.try_mark_processed(&event_id).await.unwrap(), DedupOutcome::Accepted);
        uow.commit().await.unwrap();

        let mut uow = manager.begin().await.unwrap();
        assert_eq!(
            uow.try_mark_processed(&event_id).await.unwrap(),
            DedupOutcome::AlreadyProcessed
        );
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn rollback_discards_dedup_record() {
        let manager = setup().await;
        let event_id = EventId::generate();

        let mut uow = manager.begin().await.unwrap();
        uow.try_mark_processed(&event_id).await.unwrap();
        uow.insert_order(&PurchaseOrder::new("someData")).await.unwrap();
        uow.rollback().await.unwrap();

        let mut uow = manager.begin().await.unwrap();
        assert_eq!(uow.try_mark_processed(&event_id).await.unwrap(), DedupOutcome::Accepted);
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn committed_outbox_entry_is_visible_to_reader() {
        let manager = setup().await;
        let reader = PostgresOutboxReader::new(manager.pool.clone());

        let mut uow = manager.begin().await.unwrap();
        let id = uow
            .enqueue(NewOutboxEntry {
                destination: "demo-outbox-outbound".to_string(),
                schema_version: "v1".to_string(),
                partition_key: Some("key-1".to_string()),
                payload: "someData".to_string(),
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let pending = reader.list_pending(1000).await.unwrap();
        let entry = pending.iter().find(|e| e.id == id).unwrap();
        assert_eq!(entry.partition_key.as_deref(), Some("key-1"));
        assert!(reader.delete(id).await.unwrap());
        assert!(!reader.delete(id).await.unwrap());
    }
}
