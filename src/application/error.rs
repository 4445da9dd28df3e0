use std::time::Duration;

use thiserror::Error;

use crate::domain::{Amount, CustomerId, ValidationError};
use crate::storage::{StoreFailure, classify};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "Insufficient balance for customer {customer_id}: balance {balance}, limit {limit}, requested {requested}"
    )]
    InsufficientBalance {
        customer_id: CustomerId,
        balance: Amount,
        limit: Amount,
        requested: Amount,
    },

    #[error("Transaction conflict, please retry")]
    Conflict(#[source] anyhow::Error),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

/// Coarse classification of an [`AppError`], for callers that map outcomes
/// to their own protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientBalance,
    Conflict,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Timeout(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The caller may re-issue the same request.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// The request itself was wrong and must be changed before retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::InsufficientBalance
        )
    }
}

/// Repository errors are classified here, on their way out of storage.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match classify(&err) {
            StoreFailure::NotFound => AppError::NotFound("no matching row".to_string()),
            StoreFailure::Conflict => AppError::Conflict(err),
            StoreFailure::Internal => AppError::Internal(err),
        }
    }
}
