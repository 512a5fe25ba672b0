//! Balance Calculator
//!
//! Balances are never stored authoritatively; they are recomputed from the
//! transaction history. The store aggregates per transaction type and the
//! sign of each type is applied here, from `TransactionType::direction`.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Balance, Direction, DomainError};
use crate::store::{LedgerStore, LedgerUnit, TypeTotal};

use super::LedgerResult;

/// Transaction count and signed balance for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerSummary {
    pub transactions_count: i64,
    pub balance: Balance,
}

impl LedgerSummary {
    /// Fold per-type totals into a signed balance.
    ///
    /// The net is computed in i128 so offsetting totals that each exceed i64
    /// still produce a balance; only a net outside i64 is an overflow.
    pub fn from_totals(totals: &[TypeTotal]) -> Result<Self, DomainError> {
        let (net, transactions_count) = totals
            .iter()
            .try_fold((0i128, 0i64), |(net, count), total| {
                let net = match total.transaction_type.direction() {
                    Direction::Credit => net.checked_add(total.amount)?,
                    Direction::Debit => net.checked_sub(total.amount)?,
                };
                Some((net, count.checked_add(total.count)?))
            })
            .ok_or(DomainError::BalanceOverflow)?;

        Ok(Self {
            transactions_count,
            balance: Balance::from_net(net).ok_or(DomainError::BalanceOverflow)?,
        })
    }
}

/// One line of the administrative report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub user_id: Uuid,
    pub transactions_count: i64,
    pub balance: Balance,
}

/// Read-only balance queries
#[derive(Clone)]
pub struct BalanceCalculator {
    store: Arc<dyn LedgerStore>,
}

impl BalanceCalculator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Current balance of a user; zero when they have no transactions
    pub async fn get_user_balance(&self, user_id: Uuid) -> LedgerResult<Balance> {
        let mut unit = self.store.begin().await?;
        Self::balance_within(unit.as_mut(), user_id).await
    }

    /// Balance as seen by an already open unit of work
    pub async fn balance_within(unit: &mut dyn LedgerUnit, user_id: Uuid) -> LedgerResult<Balance> {
        let totals = unit.type_totals(user_id).await?;
        Ok(LedgerSummary::from_totals(&totals)?.balance)
    }

    /// Every known user with their transaction count and balance
    pub async fn get_report(&self) -> LedgerResult<Vec<ReportRow>> {
        let mut unit = self.store.begin().await?;
        let users = unit.report_totals().await?;

        let mut report = Vec::with_capacity(users.len());
        for user in users {
            let summary = LedgerSummary::from_totals(&user.totals)?;
            report.push(ReportRow {
                user_id: user.user_id,
                transactions_count: summary.transactions_count,
                balance: summary.balance,
            });
        }

        Ok(report)
    }

    /// Sum of all user balances
    pub async fn get_total_balance(&self) -> LedgerResult<Balance> {
        let report = self.get_report().await?;
        Ok(Self::total_of(&report)?)
    }

    pub fn total_of(report: &[ReportRow]) -> Result<Balance, DomainError> {
        report.iter().try_fold(Balance::zero(), |total, row| {
            total
                .checked_add(row.balance)
                .ok_or(DomainError::BalanceOverflow)
        })
    }
}
