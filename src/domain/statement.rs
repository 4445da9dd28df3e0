use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, Customer, Transaction};

/// Number of log entries included in a statement.
pub const STATEMENT_SIZE: usize = 10;

/// Balance header of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub amount: Amount,
    pub limit: Amount,
    /// When the snapshot was taken
    pub date: DateTime<Utc>,
}

/// Read-time view of an account: balance plus the most recent entries,
/// newest first. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub balance: BalanceSummary,
    pub last_transactions: Vec<Transaction>,
}

impl Statement {
    pub fn new(
        customer: &Customer,
        as_of: DateTime<Utc>,
        last_transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            balance: BalanceSummary {
                amount: customer.balance,
                limit: customer.limit,
                date: as_of,
            },
            last_transactions,
        }
    }
}

/// Outcome of an applied transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub limit: Amount,
    pub balance: Amount,
}

impl From<Customer> for TransactionReceipt {
    fn from(customer: Customer) -> Self {
        Self {
            limit: customer.limit,
            balance: customer.balance,
        }
    }
}
