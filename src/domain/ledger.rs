use super::{Amount, Transaction};

/// Decide whether applying `delta` to `balance` keeps the account legal.
/// Credits are allowed unless the balance would overflow. Debits are allowed
/// iff `balance + delta >= -limit`.
pub fn allows(balance: Amount, limit: Amount, delta: Amount) -> bool {
    match balance.checked_add(delta) {
        Some(_) if delta >= 0 => true,
        Some(next) => next >= -limit,
        None => false,
    }
}

/// Replay a transaction history on top of an opening balance.
/// Transactions may be in any order; the sum is the same.
pub fn compute_balance(opening: Amount, transactions: &[Transaction]) -> Amount {
    transactions
        .iter()
        .fold(opening, |balance, tx| balance + tx.delta())
}
