//! Domain module
//!
//! Core ledger types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod transaction;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use error::DomainError;
pub use transaction::{
    ledger_now, Direction, Transaction, TransactionType, TransferTransaction, UserBalance,
};
