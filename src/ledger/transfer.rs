//! Transfer Engine
//!
//! Moves value between two users. The balance check and the three writes
//! (sent leg, received leg, link) share one serializable unit of work, so
//! two transfers racing on the same sender cannot both pass the check.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    ledger_now, Amount, DomainError, Transaction, TransactionType, TransferTransaction,
};
use crate::store::LedgerStore;

use super::{BalanceCalculator, LedgerResult};

/// Command to move `amount` minor units from sender to receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: i64,
}

impl TransferCommand {
    pub fn new(sender_id: Uuid, receiver_id: Uuid, amount: i64) -> Self {
        Self {
            sender_id,
            receiver_id,
            amount,
        }
    }
}

#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute one transfer attempt.
    ///
    /// # Errors
    /// - `DomainError::SameUserTransfer` if sender and receiver are the same user
    /// - `DomainError::InvalidAmount` if amount <= 0
    /// - `DomainError::UserNotFound` for an unknown sender or receiver
    /// - `DomainError::InsufficientBalance` if the sender's balance is below amount
    /// - `StoreError::SerializationConflict` if a concurrent unit won the race
    ///
    /// On any error nothing has been written.
    pub async fn transfer(&self, command: &TransferCommand) -> LedgerResult<TransferTransaction> {
        if command.sender_id == command.receiver_id {
            return Err(DomainError::SameUserTransfer.into());
        }

        let amount = Amount::new(command.amount)
            .map_err(|e| DomainError::InvalidAmount(e.to_string()))?;

        let mut unit = self.store.begin().await?;

        for user_id in [command.sender_id, command.receiver_id] {
            if !unit.user_exists(user_id).await? {
                return Err(DomainError::UserNotFound(user_id.to_string()).into());
            }
        }

        let available = BalanceCalculator::balance_within(unit.as_mut(), command.sender_id).await?;
        if !available.is_sufficient_for(&amount) {
            tracing::info!(
                sender_id = %command.sender_id,
                required = amount.value(),
                available = available.value(),
                "Transfer rejected: insufficient balance"
            );
            return Err(DomainError::insufficient_balance(amount.value(), available.value()).into());
        }

        let now = ledger_now();
        let sent = Transaction::new(command.sender_id, TransactionType::TransferSent, amount, now);
        let received = Transaction::new(
            command.receiver_id,
            TransactionType::TransferReceived,
            amount,
            now,
        );
        unit.insert_transaction(&sent).await?;
        unit.insert_transaction(&received).await?;

        let transfer = TransferTransaction::link(sent, received, now)?;
        unit.insert_transfer(&transfer).await?;

        unit.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id,
            sender_id = %command.sender_id,
            receiver_id = %command.receiver_id,
            amount = amount.value(),
            "Transfer completed"
        );

        Ok(transfer)
    }

    /// Execute a transfer, re-running it from scratch on serialization
    /// conflicts, up to `max_attempts` attempts in total.
    pub async fn transfer_with_retry(
        &self,
        command: &TransferCommand,
        max_attempts: u32,
    ) -> LedgerResult<TransferTransaction> {
        let max_attempts = max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transfer(command).await {
                Err(e) if e.is_serialization_conflict() && attempt < max_attempts => {
                    // Linear backoff before retry
                    let delay = Duration::from_millis(50 * attempt as u64);
                    tracing::warn!(
                        "Serialization conflict, retrying transfer (attempt {}/{})",
                        attempt,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
