//! In-memory Ledger Store
//!
//! A unit of work holds the store lock for its whole lifetime and works on a
//! private copy of the state, so units are trivially serializable and an
//! uncommitted unit leaves nothing behind.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{Transaction, TransferTransaction, UserBalance};

use super::token::{generate_key, hash_key};
use super::{
    LedgerStore, LedgerUnit, StoreError, StoreResult, TypeTotal, User, UserDirectory, UserTotals,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    /// token hash -> user id
    tokens: HashMap<String, Uuid>,
    transactions: Vec<Transaction>,
    user_balances: Vec<UserBalance>,
    transfers: Vec<TransferTransaction>,
}

impl MemoryState {
    fn has_user(&self, user_id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == user_id)
    }

    fn totals_for(&self, user_id: Uuid) -> Vec<TypeTotal> {
        let mut totals: BTreeMap<_, TypeTotal> = BTreeMap::new();
        for transaction in self.transactions.iter().filter(|t| t.user_id == user_id) {
            let entry = totals
                .entry(transaction.transaction_type)
                .or_insert(TypeTotal {
                    transaction_type: transaction.transaction_type,
                    amount: 0,
                    count: 0,
                });
            entry.amount += i128::from(transaction.amount.value());
            entry.count += 1;
        }
        totals.into_values().collect()
    }
}

/// Newest first; later insertions win ties on equal timestamps.
fn newest_first<T: Clone>(items: &[T], created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut indexed: Vec<(usize, &T)> = items.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| created(b).cmp(&created(a)).then(ib.cmp(ia)));
    indexed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Process-local store used by tests and local runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerUnit>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnit { guard, working }))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, email: &str, is_staff: bool) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Constraint(format!("email {} already registered", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_staff,
            is_active: true,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn issue_token(&self, user_id: Uuid) -> StoreResult<String> {
        let mut state = self.state.lock().await;
        if !state.has_user(user_id) {
            return Err(StoreError::Constraint(format!("unknown user {}", user_id)));
        }

        let key = generate_key();
        state.tokens.insert(hash_key(&key), user_id);
        Ok(key)
    }

    async fn authenticate(&self, key: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        let user = state
            .tokens
            .get(&hash_key(key))
            .and_then(|user_id| state.users.iter().find(|u| u.id == *user_id))
            .cloned();
        Ok(user)
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LedgerUnit for MemoryUnit {
    async fn user_exists(&mut self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.working.has_user(user_id))
    }

    async fn list_user_ids(&mut self) -> StoreResult<Vec<Uuid>> {
        Ok(self.working.users.iter().map(|u| u.id).collect())
    }

    async fn type_totals(&mut self, user_id: Uuid) -> StoreResult<Vec<TypeTotal>> {
        Ok(self.working.totals_for(user_id))
    }

    async fn report_totals(&mut self) -> StoreResult<Vec<UserTotals>> {
        Ok(self
            .working
            .users
            .iter()
            .map(|u| UserTotals {
                user_id: u.id,
                totals: self.working.totals_for(u.id),
            })
            .collect())
    }

    async fn transactions_for(&mut self, user_id: Uuid) -> StoreResult<Vec<Transaction>> {
        let owned: Vec<Transaction> = self
            .working
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |t| t.created_time))
    }

    async fn user_balances_for(&mut self, user_id: Uuid) -> StoreResult<Vec<UserBalance>> {
        let owned: Vec<UserBalance> = self
            .working
            .user_balances
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |b| b.created_time))
    }

    async fn transfers_for(&mut self, user_id: Uuid) -> StoreResult<Vec<TransferTransaction>> {
        let visible: Vec<TransferTransaction> = self
            .working
            .transfers
            .iter()
            .filter(|t| {
                t.sender_transaction.user_id == user_id || t.receiver_transaction.user_id == user_id
            })
            .cloned()
            .collect();
        Ok(newest_first(&visible, |t| t.created_time))
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        if !self.working.has_user(transaction.user_id) {
            return Err(StoreError::Constraint(format!(
                "transaction references unknown user {}",
                transaction.user_id
            )));
        }
        self.working.transactions.push(transaction.clone());
        Ok(())
    }

    async fn insert_user_balance(&mut self, snapshot: &UserBalance) -> StoreResult<()> {
        if !self.working.has_user(snapshot.user_id) {
            return Err(StoreError::Constraint(format!(
                "snapshot references unknown user {}",
                snapshot.user_id
            )));
        }
        self.working.user_balances.push(snapshot.clone());
        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &TransferTransaction) -> StoreResult<()> {
        let legs = [
            transfer.sender_transaction.id,
            transfer.receiver_transaction.id,
        ];
        for leg in legs {
            if !self.working.transactions.iter().any(|t| t.id == leg) {
                return Err(StoreError::Constraint(format!(
                    "transfer references unknown transaction {}",
                    leg
                )));
            }
            let already_linked = self.working.transfers.iter().any(|t| {
                t.sender_transaction.id == leg || t.receiver_transaction.id == leg
            });
            if already_linked {
                return Err(StoreError::Constraint(format!(
                    "transaction {} already belongs to a transfer",
                    leg
                )));
            }
        }
        self.working.transfers.push(transfer.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnit { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
