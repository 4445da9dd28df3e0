mod common;

use anyhow::Result;
use common::{credit, debit, kind_of, service_with_customer, test_service};
use tally::application::ErrorKind;
use tally::{TransactionKind, TransactionRequest, allows};

#[tokio::test]
async fn test_debit_within_limit() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 1000, 0).await?;

    let receipt = debit(&service, 1, 500, "loja").await?;

    assert_eq!(receipt.balance, -500);
    assert_eq!(receipt.limit, 1000);
    Ok(())
}

#[tokio::test]
async fn test_debit_over_limit_is_rejected_and_leaves_no_trace() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 1000, 0).await?;
    debit(&service, 1, 500, "loja").await?;

    // -500 - 600 = -1100 < -1000
    let result = debit(&service, 1, 600, "x").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::InsufficientBalance));

    let statement = service.statement(1).await?;
    assert_eq!(statement.balance.amount, -500);
    assert_eq!(statement.last_transactions.len(), 1);
    assert_eq!(service.repository().count_transactions(1).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_credit_at_limit() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 1000, -1000).await?;

    let receipt = credit(&service, 1, 100, "pix").await?;

    assert_eq!(receipt.balance, -900);
    assert_eq!(receipt.limit, 1000);
    Ok(())
}

#[tokio::test]
async fn test_credit_ignores_limit() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 0, 0).await?;

    let receipt = credit(&service, 1, 1_000_000, "salary").await?;
    assert_eq!(receipt.balance, 1_000_000);

    // Zero limit: the balance can be spent down to exactly zero
    let receipt = debit(&service, 1, 1_000_000, "rent").await?;
    assert_eq!(receipt.balance, 0);

    let result = debit(&service, 1, 1, "coffee").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::InsufficientBalance));
    Ok(())
}

#[tokio::test]
async fn test_credit_that_would_overflow_is_refused() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 0, 0).await?;

    let receipt = credit(&service, 1, i64::MAX, "big").await?;
    assert_eq!(receipt.balance, i64::MAX);

    let result = credit(&service, 1, i64::MAX, "bigger").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Validation));

    let statement = service.statement(1).await?;
    assert_eq!(statement.balance.amount, i64::MAX);
    assert_eq!(statement.last_transactions.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_debit_exactly_to_limit() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 1000, 0).await?;

    let receipt = debit(&service, 1, 1000, "all").await?;
    assert_eq!(receipt.balance, -1000);

    let result = debit(&service, 1, 1, "more").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::InsufficientBalance));
    Ok(())
}

#[tokio::test]
async fn test_unknown_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = debit(&service, 999, 10, "x").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::NotFound));

    let result = credit(&service, 999, 10, "x").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::NotFound));
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_store() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 1000, 0).await?;

    let invalid = [
        TransactionRequest::new(0, "d", "zero"),
        TransactionRequest::new(-10, "c", "negative"),
        TransactionRequest::new(10, "x", "kind"),
        TransactionRequest::new(10, "d", ""),
        TransactionRequest::new(10, "d", "elevenchars"),
        TransactionRequest::new(10, "d", "with space"),
        TransactionRequest::new(10, "d", "a-b"),
    ];

    for request in invalid {
        let result = service.apply_transaction(1, request).await;
        assert_eq!(kind_of(&result), Some(ErrorKind::Validation));
    }

    // Invalid ids are rejected before looking them up
    let result = debit(&service, 0, 10, "x").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Validation));
    let result = debit(&service, -3, 10, "x").await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Validation));

    assert_eq!(service.repository().count_transactions(1).await?, 0);
    assert_eq!(service.statement(1).await?.balance.amount, 0);
    Ok(())
}

#[tokio::test]
async fn test_long_kind_names_are_accepted() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 1000, 0).await?;

    service
        .apply_transaction(1, TransactionRequest::new(300, "credit", "in"))
        .await?;
    let receipt = service
        .apply_transaction(1, TransactionRequest::new(100, "debit", "out"))
        .await?;

    assert_eq!(receipt.balance, 200);
    let statement = service.statement(1).await?;
    assert_eq!(statement.last_transactions[0].kind, TransactionKind::Debit);
    assert_eq!(statement.last_transactions[1].kind, TransactionKind::Credit);
    Ok(())
}

#[tokio::test]
async fn test_balance_equals_sum_of_accepted_transactions() -> Result<()> {
    let limit = 5000;
    let (service, _temp) = service_with_customer(1, limit, 0).await?;

    let operations = [
        ("d", 1200),
        ("d", 3000),
        ("d", 900),
        ("c", 400),
        ("d", 1500),
        ("d", 100),
        ("c", 2500),
        ("d", 4000),
        ("d", 2000),
        ("c", 50),
        ("d", 700),
        ("d", 10),
    ];

    let mut expected = 0;
    let mut accepted = 0;
    for (kind, value) in operations {
        let delta = if kind == "c" { value } else { -value };
        let should_accept = allows(expected, limit, delta);

        let result = service
            .apply_transaction(1, TransactionRequest::new(value, kind, "op"))
            .await;

        if should_accept {
            let receipt = result?;
            expected += delta;
            accepted += 1;
            assert_eq!(receipt.balance, expected);
        } else {
            assert_eq!(kind_of(&result), Some(ErrorKind::InsufficientBalance));
        }
        assert!(expected >= -limit);
    }

    let statement = service.statement(1).await?;
    assert_eq!(statement.balance.amount, expected);
    assert_eq!(service.repository().count_transactions(1).await?, accepted);
    Ok(())
}

#[tokio::test]
async fn test_metrics_count_outcomes() -> Result<()> {
    let (service, _temp) = service_with_customer(1, 100, 0).await?;

    debit(&service, 1, 50, "ok").await?;
    let _ = debit(&service, 1, 500, "toomuch").await;
    let _ = debit(&service, 1, 0, "invalid").await;
    let _ = service.statement(42).await;

    let snapshot = service.metrics().snapshot();
    assert_eq!(snapshot.total_requests, 4);
    assert_eq!(snapshot.error_requests, 3);
    assert_eq!(snapshot.rejected, 1);
    assert_eq!(snapshot.conflicts, 0);
    assert_eq!(snapshot.internal_errors, 0);
    Ok(())
}
