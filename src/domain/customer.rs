use serde::{Deserialize, Serialize};

use super::{Amount, ValidationError};

pub type CustomerId = i64;

/// A customer account. Customers are provisioned out-of-band; the ledger only
/// ever moves their balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    /// Overdraft capacity, never negative
    pub limit: Amount,
    /// Current balance, never below `-limit` in a committed state
    pub balance: Amount,
}

impl Customer {
    pub fn new(id: CustomerId, limit: Amount, balance: Amount) -> Self {
        Self { id, limit, balance }
    }

    /// Check a customer about to be provisioned.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_customer_id(self.id)?;
        if self.limit < 0 {
            return Err(ValidationError::NegativeLimit(self.limit));
        }
        if !self.is_within_limit() {
            return Err(ValidationError::OpeningBalanceBelowLimit {
                balance: self.balance,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// True when the stored balance respects the credit limit.
    pub fn is_within_limit(&self) -> bool {
        self.limit >= 0 && self.balance >= -self.limit
    }
}

/// Customer ids are positive integers.
pub fn validate_customer_id(id: CustomerId) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidCustomerId(id));
    }
    Ok(())
}
