//! Ledger records
//!
//! Transactions are immutable facts: once written they are never updated or
//! deleted. Balances and snapshots are derived from them.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Amount, Balance, DomainError};

/// Effect of a transaction type on the owner's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

/// Kind of a ledger transaction.
///
/// The numeric codes are the wire/storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum TransactionType {
    Charge,
    Purchase,
    TransferReceived,
    TransferSent,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Charge,
        TransactionType::Purchase,
        TransactionType::TransferReceived,
        TransactionType::TransferSent,
    ];

    /// Storage code
    pub fn code(self) -> i16 {
        match self {
            TransactionType::Charge => 1,
            TransactionType::Purchase => 2,
            TransactionType::TransferReceived => 3,
            TransactionType::TransferSent => 4,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(TransactionType::Charge),
            2 => Ok(TransactionType::Purchase),
            3 => Ok(TransactionType::TransferReceived),
            4 => Ok(TransactionType::TransferSent),
            other => Err(DomainError::InvalidTransactionType(other)),
        }
    }

    /// The one place that decides whether a type adds to or subtracts from a balance.
    pub fn direction(self) -> Direction {
        match self {
            TransactionType::Charge | TransactionType::TransferReceived => Direction::Credit,
            TransactionType::Purchase | TransactionType::TransferSent => Direction::Debit,
        }
    }

    /// Transfer legs can only be written by the transfer engine
    pub fn is_transfer(self) -> bool {
        matches!(
            self,
            TransactionType::TransferReceived | TransactionType::TransferSent
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Charge => "Charge",
            TransactionType::Purchase => "Purchase",
            TransactionType::TransferReceived => "Transfer Received",
            TransactionType::TransferSent => "Transfer Sent",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i16> for TransactionType {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        TransactionType::from_code(code)
    }
}

impl From<TransactionType> for i16 {
    fn from(transaction_type: TransactionType) -> Self {
        transaction_type.code()
    }
}

/// Current time at the precision the store keeps (microseconds), so records
/// read back compare equal to the ones written.
pub fn ledger_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// An append-only ledger entry owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub created_time: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: Uuid,
        transaction_type: TransactionType,
        amount: Amount,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            transaction_type,
            amount,
            created_time,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.transaction_type)
    }
}

/// Point-in-time balance snapshot. Never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Balance,
    pub created_time: DateTime<Utc>,
}

impl UserBalance {
    pub fn new(user_id: Uuid, balance: Balance, created_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance,
            created_time,
        }
    }
}

impl fmt::Display for UserBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.balance)
    }
}

/// The two legs of one completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTransaction {
    pub id: Uuid,
    pub sender_transaction: Transaction,
    pub receiver_transaction: Transaction,
    pub created_time: DateTime<Utc>,
}

impl TransferTransaction {
    /// Link a sent leg to a received leg, checking the pairing rules:
    /// opposite transfer types, equal amounts, different owners.
    pub fn link(
        sender_transaction: Transaction,
        receiver_transaction: Transaction,
        created_time: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if sender_transaction.transaction_type != TransactionType::TransferSent
            || receiver_transaction.transaction_type != TransactionType::TransferReceived
        {
            return Err(DomainError::BusinessRuleViolation(
                "transfer legs must be TransferSent and TransferReceived".to_string(),
            ));
        }
        if sender_transaction.amount != receiver_transaction.amount {
            return Err(DomainError::BusinessRuleViolation(
                "transfer legs must carry the same amount".to_string(),
            ));
        }
        if sender_transaction.user_id == receiver_transaction.user_id {
            return Err(DomainError::SameUserTransfer);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            sender_transaction,
            receiver_transaction,
            created_time,
        })
    }

    pub fn amount(&self) -> Amount {
        self.sender_transaction.amount
    }
}

impl fmt::Display for TransferTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.sender_transaction, self.receiver_transaction)
    }
}
