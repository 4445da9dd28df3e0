/// Money is represented as integer minor units (cents). Balances are signed,
/// transaction values and limits are never negative.
pub type Amount = i64;

/// Returns the signed delta for a transaction value: credits add, debits subtract.
pub fn signed_delta(value: Amount, kind: super::TransactionKind) -> Amount {
    match kind {
        super::TransactionKind::Credit => value,
        super::TransactionKind::Debit => -value,
    }
}
