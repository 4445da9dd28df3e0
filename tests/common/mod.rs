// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use tally::application::{AppError, ErrorKind, LedgerService};
use tally::{Customer, CustomerId, StoreConfig, TransactionReceipt, TransactionRequest};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let config = StoreConfig::for_path(db_path.to_str().unwrap());
    let service = LedgerService::init(&config).await?;
    Ok((service, temp_dir))
}

/// Helper to create a test service with one customer already provisioned
pub async fn service_with_customer(
    id: CustomerId,
    limit: i64,
    balance: i64,
) -> Result<(LedgerService, TempDir)> {
    let (service, temp) = test_service().await?;
    service
        .provision_customer(Customer::new(id, limit, balance))
        .await?;
    Ok((service, temp))
}

pub async fn debit(
    service: &LedgerService,
    id: CustomerId,
    value: i64,
    description: &str,
) -> Result<TransactionReceipt, AppError> {
    service
        .apply_transaction(id, TransactionRequest::new(value, "d", description))
        .await
}

pub async fn credit(
    service: &LedgerService,
    id: CustomerId,
    value: i64,
    description: &str,
) -> Result<TransactionReceipt, AppError> {
    service
        .apply_transaction(id, TransactionRequest::new(value, "c", description))
        .await
}

/// Apply a transaction, re-issuing it for as long as the store reports a conflict.
pub async fn apply_with_retry(
    service: &LedgerService,
    id: CustomerId,
    request: TransactionRequest,
) -> Result<TransactionReceipt, AppError> {
    for _ in 0..1000 {
        match service.apply_transaction(id, request.clone()).await {
            Err(err) if err.is_retryable() => tokio::time::sleep(Duration::from_millis(1)).await,
            other => return other,
        }
    }
    panic!("transaction for customer {} kept conflicting", id);
}

pub fn kind_of<T>(result: &Result<T, AppError>) -> Option<ErrorKind> {
    result.as_ref().err().map(AppError::kind)
}
