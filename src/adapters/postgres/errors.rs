//! Mapping from sqlx errors to domain errors.

use crate::domain::foundation::{DomainError, ErrorCode};

/// Serialization failure, deadlock and lock-not-available are worth retrying.
const RETRYABLE_SQLSTATES: &[&str] = &["40001", "40P01", "55P03"];

/// Converts a sqlx error into a `DomainError`, prefixing `context`.
///
/// Connection-level failures map to `StorageUnavailable`, transient
/// conflicts to `ConcurrentModification`; both are retryable.
pub fn classify_sqlx_error(err: sqlx::Error, context: &str) -> DomainError {
    let sqlstate = match &err {
        sqlx::Error::Database(db) => db.code().map(|state| state.to_string()),
        _ => None,
    };

    let code = match &err {
        sqlx::Error::Database(_) => code_for_sqlstate(sqlstate.as_deref()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => ErrorCode::StorageUnavailable,
        _ => ErrorCode::DatabaseError,
    };

    let error = DomainError::new(code, format!("{}: {}", context, err));
    match sqlstate {
        Some(state) => error.with_detail("sqlstate", state),
        None => error,
    }
}

fn code_for_sqlstate(state: Option<&str>) -> ErrorCode {
    match state {
        Some(state) if RETRYABLE_SQLSTATES.contains(&state) => ErrorCode::ConcurrentModification,
        _ => ErrorCode::DatabaseError,
    }
}
