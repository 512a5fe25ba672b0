//! Balance Snapshot Recorder
//!
//! Materializes computed balances into `UserBalance` rows. Snapshots are an
//! append-only cache; the transaction history stays authoritative.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{ledger_now, DomainError, UserBalance};
use crate::store::LedgerStore;

use super::{BalanceCalculator, LedgerResult};

#[derive(Clone)]
pub struct SnapshotRecorder {
    store: Arc<dyn LedgerStore>,
}

impl SnapshotRecorder {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Compute and persist the user's current balance.
    ///
    /// The read and the insert share one unit of work, so the snapshot equals
    /// the balance at the moment it was taken.
    pub async fn record_user_balance(&self, user_id: Uuid) -> LedgerResult<UserBalance> {
        let mut unit = self.store.begin().await?;

        if !unit.user_exists(user_id).await? {
            return Err(DomainError::UserNotFound(user_id.to_string()).into());
        }

        let balance = BalanceCalculator::balance_within(unit.as_mut(), user_id).await?;
        let snapshot = UserBalance::new(user_id, balance, ledger_now());
        unit.insert_user_balance(&snapshot).await?;
        unit.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            balance = balance.value(),
            "Recorded balance snapshot"
        );

        Ok(snapshot)
    }

    /// Snapshot every known user at one consistent point
    pub async fn record_all_user_balances(&self) -> LedgerResult<Vec<UserBalance>> {
        let mut unit = self.store.begin().await?;
        let user_ids = unit.list_user_ids().await?;
        let now = ledger_now();

        let mut snapshots = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let balance = BalanceCalculator::balance_within(unit.as_mut(), user_id).await?;
            let snapshot = UserBalance::new(user_id, balance, now);
            unit.insert_user_balance(&snapshot).await?;
            snapshots.push(snapshot);
        }

        unit.commit().await?;

        tracing::info!(count = snapshots.len(), "Recorded balance snapshots for all users");

        Ok(snapshots)
    }
}
