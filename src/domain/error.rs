//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Business rule violations and domain invariant failures.
///
/// These are independent of the web/storage layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Sender's computed balance does not cover the transfer
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Invalid amount (zero or negative)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Unknown transaction type code
    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(i16),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Transfer to self
    #[error("Cannot transfer to the same user")]
    SameUserTransfer,

    /// Aggregated balance does not fit in 64 bits
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Business rule violation
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),
}

impl DomainError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: i64, available: i64) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_error() {
        let err = DomainError::insufficient_balance(100, 50);

        assert!(matches!(
            err,
            DomainError::InsufficientBalance {
                required: 100,
                available: 50
            }
        ));
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }
}
