//! PostgreSQL adapters - Database implementations of the storage ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresTransactionManager` - Opens units of work spanning dedup, orders and outbox
//! - `PostgresOutboxReader` - Relay-side outbox access
//! - `run_migrations` - Applies the bundled schema

mod errors;
mod outbox_reader;
mod unit_of_work;

pub use errors::classify_sqlx_error;
pub use outbox_reader::PostgresOutboxReader;
pub use unit_of_work::{PostgresTransactionManager, PostgresUnitOfWork};

use sqlx::migrate::MigrateError;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;

/// Applies the migrations under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(migration_error)
}

fn migration_error(err: MigrateError) -> DomainError {
    DomainError::database(format!("Migration failed: {}", err))
}
