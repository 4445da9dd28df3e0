//! Interpretation of raw storage failures.
//!
//! This is the only place that looks at driver error codes. Everything above
//! the repository sees one of the three [`StoreFailure`] kinds.

/// SQLite primary result codes that signal lock contention between
/// concurrent transactions. Extended codes (e.g. `SQLITE_BUSY_SNAPSHOT` = 517)
/// carry the primary code in their low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// SQLSTATE codes for serialization failure and deadlock.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// No row matched the query
    NotFound,
    /// The store refused to serialize two concurrent transactions; retryable
    Conflict,
    /// Connectivity, constraint violations, pool timeouts, anything else
    Internal,
}

/// Classify a repository error by finding the driver error in its chain.
pub fn classify(err: &anyhow::Error) -> StoreFailure {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .map(classify_sqlx)
        .unwrap_or(StoreFailure::Internal)
}

pub fn classify_sqlx(err: &sqlx::Error) -> StoreFailure {
    match err {
        sqlx::Error::RowNotFound => StoreFailure::NotFound,
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) if is_conflict_code(&code) => StoreFailure::Conflict,
            _ => StoreFailure::Internal,
        },
        _ => StoreFailure::Internal,
    }
}

fn is_conflict_code(code: &str) -> bool {
    if code == SQLSTATE_SERIALIZATION_FAILURE || code == SQLSTATE_DEADLOCK_DETECTED {
        return true;
    }
    match code.parse::<i32>() {
        Ok(extended) => matches!(extended & 0xff, SQLITE_BUSY | SQLITE_LOCKED),
        Err(_) => false,
    }
}
