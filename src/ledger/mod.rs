//! Ledger module
//!
//! Balance computation, transfers and snapshots on top of a [`LedgerStore`].
//! Each component receives the store explicitly, so any implementation
//! (Postgres or in-memory) can back it.

mod balance;
mod journal;
mod snapshot;
mod transfer;

use std::sync::Arc;

use crate::domain::DomainError;
use crate::store::{LedgerStore, StoreError};

pub use balance::{BalanceCalculator, LedgerSummary, ReportRow};
pub use journal::{Journal, RecordTransactionCommand};
pub use snapshot::SnapshotRecorder;
pub use transfer::{TransferCommand, TransferEngine};

/// Ledger-wide Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors returned by ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// The unit of work lost a serialization race; nothing was written
    pub fn is_serialization_conflict(&self) -> bool {
        matches!(self, LedgerError::Store(err) if err.is_retryable())
    }
}

/// All ledger components sharing one store
#[derive(Clone)]
pub struct Ledger {
    pub balances: BalanceCalculator,
    pub transfers: TransferEngine,
    pub snapshots: SnapshotRecorder,
    pub journal: Journal,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            balances: BalanceCalculator::new(store.clone()),
            transfers: TransferEngine::new(store.clone()),
            snapshots: SnapshotRecorder::new(store.clone()),
            journal: Journal::new(store),
        }
    }
}
