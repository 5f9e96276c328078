//! PostgreSQL implementation of OutboxReader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, OutboxEntryId, Timestamp};
use crate::ports::{OutboxEntry, OutboxReader};

use super::errors::classify_sqlx_error;

/// Relay-side access to `outbox_events`.
#[derive(Clone)]
pub struct PostgresOutboxReader {
    pool: PgPool,
}

impl PostgresOutboxReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OutboxRow {
    id: Uuid,
    version: String,
    destination: String,
    partition_key: Option<String>,
    payload: String,
    created_at: DateTime<Utc>,
}

impl From<OutboxRow> for OutboxEntry {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: OutboxEntryId::from_uuid(row.id),
            schema_version: row.version,
            destination: row.destination,
            partition_key: row.partition_key,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl OutboxReader for PostgresOutboxReader {
    async fn list_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, version, destination, partition_key, payload, created_at
            FROM outbox_events
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_sqlx_error(e, "Failed to fetch pending outbox entries"))?;

        Ok(rows.into_iter().map(OutboxEntry::from).collect())
    }

    async fn delete(&self, id: OutboxEntryId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM outbox_events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to delete outbox entry"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_pending(&self) -> Result<u64, DomainError> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, "Failed to count outbox entries"))?;

        Ok(result.0.max(0) as u64)
    }
}
