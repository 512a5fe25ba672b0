//! Ledger Store module
//!
//! Storage interface used by the ledger core, plus its Postgres and
//! in-memory implementations. Every read and write goes through a
//! [`LedgerUnit`], an all-or-nothing unit of work.

mod error;
mod memory;
mod postgres;
mod token;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionType, TransferTransaction, UserBalance};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgLedgerStore;
pub use token::{generate_key, hash_key};

/// Store-wide Result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Sum and count of one user's transactions of one type.
///
/// `amount` is wider than a balance: the sum of one type alone may exceed
/// i64 while the signed balance still fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTotal {
    pub transaction_type: TransactionType,
    pub amount: i128,
    pub count: i64,
}

/// Per-type totals for one user. Users without transactions have no totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTotals {
    pub user_id: Uuid,
    pub totals: Vec<TypeTotal>,
}

/// A registered wallet user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Entry point to the ledger's persistent state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a serializable unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn LedgerUnit>>;
}

/// One atomic unit of work against the ledger.
///
/// Reads observe a single consistent state. Writes become visible only on
/// [`commit`](LedgerUnit::commit); dropping the unit rolls everything back.
#[async_trait]
pub trait LedgerUnit: Send {
    async fn user_exists(&mut self, user_id: Uuid) -> StoreResult<bool>;

    /// All known users, including those without transactions.
    async fn list_user_ids(&mut self) -> StoreResult<Vec<Uuid>>;

    /// Per-type totals of one user's transactions.
    async fn type_totals(&mut self, user_id: Uuid) -> StoreResult<Vec<TypeTotal>>;

    /// Per-type totals for every known user, in one read.
    async fn report_totals(&mut self) -> StoreResult<Vec<UserTotals>>;

    /// A user's transactions, newest first.
    async fn transactions_for(&mut self, user_id: Uuid) -> StoreResult<Vec<Transaction>>;

    /// A user's balance snapshots, newest first.
    async fn user_balances_for(&mut self, user_id: Uuid) -> StoreResult<Vec<UserBalance>>;

    /// Transfers where the user is sender or receiver, newest first.
    async fn transfers_for(&mut self, user_id: Uuid) -> StoreResult<Vec<TransferTransaction>>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    async fn insert_user_balance(&mut self, snapshot: &UserBalance) -> StoreResult<()>;

    /// Persist the link row. Both legs must already be inserted in this unit.
    async fn insert_transfer(&mut self, transfer: &TransferTransaction) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Users and their API tokens.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create_user(&self, email: &str, is_staff: bool) -> StoreResult<User>;

    /// Issue a new token for the user, returning the plain key once.
    async fn issue_token(&self, user_id: Uuid) -> StoreResult<String>;

    /// Resolve a plain token key to its user.
    async fn authenticate(&self, key: &str) -> StoreResult<Option<User>>;
}
