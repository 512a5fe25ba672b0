//! Journal
//!
//! Direct charges and purchases, and per-user history listings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    ledger_now, Amount, DomainError, Transaction, TransactionType, TransferTransaction, UserBalance,
};
use crate::store::LedgerStore;

use super::LedgerResult;

/// Command to record a charge or purchase for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTransactionCommand {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: i64,
}

impl RecordTransactionCommand {
    pub fn new(user_id: Uuid, transaction_type: TransactionType, amount: i64) -> Self {
        Self {
            user_id,
            transaction_type,
            amount,
        }
    }
}

#[derive(Clone)]
pub struct Journal {
    store: Arc<dyn LedgerStore>,
}

impl Journal {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Append a Charge or Purchase.
    ///
    /// Transfer legs are rejected here; they only come from the transfer
    /// engine, paired with their counterpart. Purchases are not checked
    /// against the balance.
    pub async fn record_transaction(
        &self,
        command: &RecordTransactionCommand,
    ) -> LedgerResult<Transaction> {
        if command.transaction_type.is_transfer() {
            return Err(DomainError::BusinessRuleViolation(
                "transfer transactions can only be created by a transfer".to_string(),
            )
            .into());
        }

        let amount = Amount::new(command.amount)
            .map_err(|e| DomainError::InvalidAmount(e.to_string()))?;

        let mut unit = self.store.begin().await?;
        if !unit.user_exists(command.user_id).await? {
            return Err(DomainError::UserNotFound(command.user_id.to_string()).into());
        }

        let transaction = Transaction::new(
            command.user_id,
            command.transaction_type,
            amount,
            ledger_now(),
        );
        unit.insert_transaction(&transaction).await?;
        unit.commit().await?;

        tracing::debug!(
            transaction_id = %transaction.id,
            user_id = %transaction.user_id,
            transaction_type = %transaction.transaction_type,
            amount = amount.value(),
            "Recorded transaction"
        );

        Ok(transaction)
    }

    pub async fn transactions_for(&self, user_id: Uuid) -> LedgerResult<Vec<Transaction>> {
        let mut unit = self.store.begin().await?;
        Ok(unit.transactions_for(user_id).await?)
    }

    pub async fn user_balances_for(&self, user_id: Uuid) -> LedgerResult<Vec<UserBalance>> {
        let mut unit = self.store.begin().await?;
        Ok(unit.user_balances_for(user_id).await?)
    }

    pub async fn transfers_for(&self, user_id: Uuid) -> LedgerResult<Vec<TransferTransaction>> {
        let mut unit = self.store.begin().await?;
        Ok(unit.transfers_for(user_id).await?)
    }
}
