//! Postgres Ledger Store
//!
//! Each unit of work is a `SERIALIZABLE` transaction. Postgres aborts one of
//! two conflicting units with SQLSTATE 40001, which surfaces as
//! [`StoreError::SerializationConflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::{
    Amount, Balance, Transaction, TransactionType, TransferTransaction, UserBalance,
};

use super::token::{generate_key, hash_key};
use super::{
    LedgerStore, LedgerUnit, StoreError, StoreResult, TypeTotal, User, UserDirectory, UserTotals,
};

/// Postgres-backed ledger store
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerUnit>> {
        let mut tx = self.pool.begin().await?;

        // Must be the first statement of the transaction
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgUnit { tx }))
    }
}

#[async_trait]
impl UserDirectory for PgLedgerStore {
    async fn create_user(&self, email: &str, is_staff: bool) -> StoreResult<User> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, is_staff, is_active)
            VALUES ($1, $2, $3, true)
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(is_staff)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            email: email.to_string(),
            is_staff,
            is_active: true,
        })
    }

    async fn issue_token(&self, user_id: Uuid) -> StoreResult<String> {
        let key = generate_key();
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (key_hash, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(hash_key(&key))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(key)
    }

    async fn authenticate(&self, key: &str) -> StoreResult<Option<User>> {
        let user: Option<(Uuid, String, bool, bool)> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.is_staff, u.is_active
            FROM auth_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.key_hash = $1
            "#,
        )
        .bind(hash_key(key))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(|(id, email, is_staff, is_active)| User {
            id,
            email,
            is_staff,
            is_active,
        }))
    }
}

struct PgUnit {
    tx: PgTransaction<'static, Postgres>,
}

fn transaction_type(code: i16) -> StoreResult<TransactionType> {
    TransactionType::from_code(code).map_err(|e| StoreError::InvalidRow(e.to_string()))
}

/// `SUM(bigint)` is NUMERIC in Postgres and may exceed i64
fn type_sum(value: Decimal) -> StoreResult<i128> {
    value
        .to_i128()
        .ok_or_else(|| StoreError::InvalidRow(format!("transaction sum out of range: {}", value)))
}

fn amount(value: i64) -> StoreResult<Amount> {
    Amount::new(value).map_err(|e| StoreError::InvalidRow(e.to_string()))
}

/// Read a transaction whose columns carry the given prefix
fn transaction_from_row(row: &PgRow, prefix: &str) -> StoreResult<Transaction> {
    let column = |name: &str| format!("{}{}", prefix, name);
    Ok(Transaction {
        id: row.try_get(column("id").as_str())?,
        user_id: row.try_get(column("user_id").as_str())?,
        transaction_type: transaction_type(row.try_get(column("transaction_type").as_str())?)?,
        amount: amount(row.try_get(column("amount").as_str())?)?,
        created_time: row.try_get(column("created_time").as_str())?,
    })
}

#[async_trait]
impl LedgerUnit for PgUnit {
    async fn user_exists(&mut self, user_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn list_user_ids(&mut self) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(ids)
    }

    async fn type_totals(&mut self, user_id: Uuid) -> StoreResult<Vec<TypeTotal>> {
        let rows: Vec<(i16, Decimal, i64)> = sqlx::query_as(
            r#"
            SELECT transaction_type, SUM(amount), COUNT(*)
            FROM transactions
            WHERE user_id = $1
            GROUP BY transaction_type
            ORDER BY transaction_type
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(code, amount, count)| -> StoreResult<TypeTotal> {
                Ok(TypeTotal {
                    transaction_type: transaction_type(code)?,
                    amount: type_sum(amount)?,
                    count,
                })
            })
            .collect()
    }

    async fn report_totals(&mut self) -> StoreResult<Vec<UserTotals>> {
        // LEFT JOIN keeps users without transactions (NULL type)
        let rows: Vec<(Uuid, Option<i16>, Decimal, i64)> = sqlx::query_as(
            r#"
            SELECT u.id, t.transaction_type, COALESCE(SUM(t.amount), 0), COUNT(t.id)
            FROM users u
            LEFT JOIN transactions t ON t.user_id = u.id
            GROUP BY u.id, t.transaction_type
            ORDER BY u.id, t.transaction_type
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        let mut report: Vec<UserTotals> = Vec::new();
        for (user_id, code, amount, count) in rows {
            if report.last().map(|r| r.user_id) != Some(user_id) {
                report.push(UserTotals {
                    user_id,
                    totals: Vec::new(),
                });
            }
            if let (Some(code), Some(entry)) = (code, report.last_mut()) {
                entry.totals.push(TypeTotal {
                    transaction_type: transaction_type(code)?,
                    amount: type_sum(amount)?,
                    count,
                });
            }
        }

        Ok(report)
    }

    async fn transactions_for(&mut self, user_id: Uuid) -> StoreResult<Vec<Transaction>> {
        let rows: Vec<(Uuid, Uuid, i16, i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, transaction_type, amount, created_time
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(id, user_id, code, value, created_time)| -> StoreResult<Transaction> {
                Ok(Transaction {
                    id,
                    user_id,
                    transaction_type: transaction_type(code)?,
                    amount: amount(value)?,
                    created_time,
                })
            })
            .collect()
    }

    async fn user_balances_for(&mut self, user_id: Uuid) -> StoreResult<Vec<UserBalance>> {
        let rows: Vec<(Uuid, Uuid, i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, balance, created_time
            FROM user_balances
            WHERE user_id = $1
            ORDER BY created_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, balance, created_time)| UserBalance {
                id,
                user_id,
                balance: Balance::new(balance),
                created_time,
            })
            .collect())
    }

    async fn transfers_for(&mut self, user_id: Uuid) -> StoreResult<Vec<TransferTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT
                tt.id, tt.created_time,
                s.id AS s_id, s.user_id AS s_user_id, s.transaction_type AS s_transaction_type,
                s.amount AS s_amount, s.created_time AS s_created_time,
                r.id AS r_id, r.user_id AS r_user_id, r.transaction_type AS r_transaction_type,
                r.amount AS r_amount, r.created_time AS r_created_time
            FROM transfer_transactions tt
            JOIN transactions s ON s.id = tt.sender_transaction_id
            JOIN transactions r ON r.id = tt.receiver_transaction_id
            WHERE s.user_id = $1 OR r.user_id = $1
            ORDER BY tt.created_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<TransferTransaction> {
                Ok(TransferTransaction {
                    id: row.try_get("id")?,
                    sender_transaction: transaction_from_row(row, "s_")?,
                    receiver_transaction: transaction_from_row(row, "r_")?,
                    created_time: row.try_get("created_time")?,
                })
            })
            .collect()
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, transaction_type, amount, created_time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(transaction.transaction_type.code())
        .bind(transaction.amount.value())
        .bind(transaction.created_time)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_user_balance(&mut self, snapshot: &UserBalance) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_balances (id, user_id, balance, created_time)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.user_id)
        .bind(snapshot.balance.value())
        .bind(snapshot.created_time)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &TransferTransaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transfer_transactions (
                id, sender_transaction_id, receiver_transaction_id, created_time
            )
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(transfer.id)
        .bind(transfer.sender_transaction.id)
        .bind(transfer.receiver_transaction.id)
        .bind(transfer.created_time)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
