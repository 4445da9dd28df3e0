use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

/// Maximum length of a transaction description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money in, always accepted
    Credit,
    /// Money out, bounded by the customer's limit
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
        }
    }

    /// Single-letter code used in the `transactions.kind` column.
    pub fn as_code(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "c",
            TransactionKind::Debit => "d",
        }
    }

    /// Accepts both the long names and the single-letter codes.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "c" | "credit" => Some(TransactionKind::Credit),
            "d" | "debit" => Some(TransactionKind::Debit),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable ledger entry as stored in the transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Always positive; the sign is carried by `kind`
    pub value: Amount,
    pub kind: TransactionKind,
    pub description: String,
    /// Assigned by the store at insert time
    pub occurred_at: DateTime<Utc>,
}

impl Transaction {
    pub fn delta(&self) -> Amount {
        super::signed_delta(self.value, self.kind)
    }
}

/// A transaction as submitted by a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub value: i64,
    pub kind: String,
    pub description: String,
}

impl TransactionRequest {
    pub fn new(value: i64, kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value,
            kind: kind.into(),
            description: description.into(),
        }
    }

    /// Check every precondition and produce an entry ready to be applied.
    pub fn validate(self) -> Result<NewTransaction, ValidationError> {
        if self.value <= 0 {
            return Err(ValidationError::NonPositiveValue(self.value));
        }

        let kind = TransactionKind::from_str(&self.kind)
            .ok_or_else(|| ValidationError::UnknownKind(self.kind.clone()))?;

        let len = self.description.chars().count();
        if len == 0 || len > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::DescriptionLength(len));
        }
        if !self.description.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::DescriptionCharset(self.description));
        }

        Ok(NewTransaction {
            value: self.value,
            kind,
            description: self.description,
        })
    }
}

/// A validated entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub value: Amount,
    pub kind: TransactionKind,
    pub description: String,
}

impl NewTransaction {
    pub fn delta(&self) -> Amount {
        super::signed_delta(self.value, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NonPositiveValue(i64),
    UnknownKind(String),
    DescriptionLength(usize),
    DescriptionCharset(String),
    InvalidCustomerId(i64),
    NegativeLimit(Amount),
    OpeningBalanceBelowLimit { balance: Amount, limit: Amount },
    BalanceOverflow { balance: Amount, requested: Amount },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NonPositiveValue(v) => {
                write!(f, "value must be a positive integer, got {}", v)
            }
            ValidationError::UnknownKind(k) => {
                write!(f, "kind must be 'credit' or 'debit', got '{}'", k)
            }
            ValidationError::DescriptionLength(len) => write!(
                f,
                "description must have 1 to {} characters, got {}",
                MAX_DESCRIPTION_LEN, len
            ),
            ValidationError::DescriptionCharset(d) => {
                write!(f, "description must be alphanumeric, got '{}'", d)
            }
            ValidationError::InvalidCustomerId(id) => {
                write!(f, "customer id must be a positive integer, got {}", id)
            }
            ValidationError::NegativeLimit(limit) => {
                write!(f, "limit must not be negative, got {}", limit)
            }
            ValidationError::OpeningBalanceBelowLimit { balance, limit } => write!(
                f,
                "opening balance {} is below the credit limit of {}",
                balance, limit
            ),
            ValidationError::BalanceOverflow { balance, requested } => write!(
                f,
                "crediting {} would overflow the balance of {}",
                requested, balance
            ),
        }
    }
}

impl std::error::Error for ValidationError {}
