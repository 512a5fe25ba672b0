//! Amount and Balance types
//!
//! Domain primitives for monetary values in minor currency units.
//! Amounts are validated at construction time, ensuring a non-positive
//! amount can never be stored on a transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount represents a validated transaction amount in minor units.
///
/// # Invariants
/// - Value is always positive (> 0)
///
/// # Example
/// ```
/// use wallet_ledger::domain::Amount;
///
/// let amount = Amount::new(100).unwrap();
/// assert_eq!(amount.value(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }

        Ok(Self(value))
    }

    /// Get the underlying value in minor units.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance is the signed sum of a user's transactions.
///
/// Unlike Amount, a Balance can be zero or negative: purchases are recorded
/// without a balance check, so only transfers guard against overdrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(i64);

impl Balance {
    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the underlying value
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if balance covers a debit of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Narrow a net sum computed in wider arithmetic, `None` if it does not fit.
    pub fn from_net(net: i128) -> Option<Balance> {
        i64::try_from(net).ok().map(Balance)
    }

    /// Add another balance, `None` on overflow.
    pub fn checked_add(&self, other: Balance) -> Option<Balance> {
        self.0.checked_add(other.0).map(Balance)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Balance> for i64 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}
