//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    DomainError, OperationContext, Transaction, TransactionType, TransferTransaction, UserBalance,
};
use crate::error::AppError;
use crate::ledger::{
    BalanceCalculator, LedgerError, RecordTransactionCommand, ReportRow, TransferCommand,
};

use super::middleware::AuthenticatedUser;
use super::state::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub transaction_type: i16,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub created_time: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            user: transaction.user_id,
            transaction_type: transaction.transaction_type,
            amount: transaction.amount.value(),
            created_time: transaction.created_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserBalanceAmountResponse {
    #[serde(rename = "user balance")]
    pub user_balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserBalanceResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub balance: i64,
    pub created_time: DateTime<Utc>,
}

impl From<UserBalance> for UserBalanceResponse {
    fn from(snapshot: UserBalance) -> Self {
        Self {
            id: snapshot.id,
            user: snapshot.user_id,
            balance: snapshot.balance.value(),
            created_time: snapshot.created_time,
        }
    }
}

/// One side of a transfer as submitted by the client
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferLegRequest {
    pub user: Uuid,
    pub transaction_type: i16,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_transaction: TransferLegRequest,
    pub receiver_transaction: TransferLegRequest,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub id: Uuid,
    pub sender_transaction: TransactionResponse,
    pub receiver_transaction: TransactionResponse,
    pub created_time: DateTime<Utc>,
}

impl From<TransferTransaction> for TransferResponse {
    fn from(transfer: TransferTransaction) -> Self {
        Self {
            id: transfer.id,
            sender_transaction: transfer.sender_transaction.into(),
            receiver_transaction: transfer.receiver_transaction.into(),
            created_time: transfer.created_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferCreatedResponse {
    pub success: TransferResponse,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub users: Vec<ReportRow>,
    pub total_balance: i64,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/:id/balance", get(get_user_balance))
        .route("/userbalance", get(list_user_balances).post(create_user_balance))
        .route("/transfer", get(list_transfers).post(create_transfer))
        .route("/report", get(report))
}

// =========================================================================
// /transactions
// =========================================================================

/// The caller's transactions, newest first
async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = state.ledger.journal.transactions_for(user.id).await?;
    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

/// Record a Charge or Purchase for the caller
async fn create_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let Json(request) = payload?;
    let transaction_type = TransactionType::from_code(request.transaction_type)?;

    let command = RecordTransactionCommand::new(user.id, transaction_type, request.amount);
    let transaction = state.ledger.journal.record_transaction(&command).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Computed balance of the caller. The path id is not used.
async fn get_user_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(_id): Path<String>,
) -> Result<Json<UserBalanceAmountResponse>, AppError> {
    let balance = state.ledger.balances.get_user_balance(user.id).await?;
    Ok(Json(UserBalanceAmountResponse {
        user_balance: balance.value(),
    }))
}

// =========================================================================
// /userbalance
// =========================================================================

/// The caller's balance snapshots, newest first
async fn list_user_balances(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<UserBalanceResponse>>, AppError> {
    let snapshots = state.ledger.journal.user_balances_for(user.id).await?;
    Ok(Json(snapshots.into_iter().map(Into::into).collect()))
}

/// Snapshot the caller's computed balance; any request body is ignored
async fn create_user_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<(StatusCode, Json<UserBalanceResponse>), AppError> {
    let snapshot = state.ledger.snapshots.record_user_balance(user.id).await?;
    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

// =========================================================================
// /transfer
// =========================================================================

/// Transfers where the caller is sender or receiver
async fn list_transfers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<TransferResponse>>, AppError> {
    let transfers = state.ledger.journal.transfers_for(user.id).await?;
    Ok(Json(transfers.into_iter().map(Into::into).collect()))
}

/// Move funds from the caller to another user
async fn create_transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransferCreatedResponse>), AppError> {
    let Json(request) = payload?;
    let command = transfer_command(&user, &request)?;

    tracing::debug!(
        correlation_id = ?context.correlation_id,
        request_user_id = ?context.request_user_id,
        sender_id = %command.sender_id,
        receiver_id = %command.receiver_id,
        amount = command.amount,
        "Transfer requested"
    );

    let transfer = state
        .ledger
        .transfers
        .transfer_with_retry(&command, state.transfer_max_attempts)
        .await
        .map_err(transfer_error)?;

    Ok((
        StatusCode::CREATED,
        Json(TransferCreatedResponse {
            success: transfer.into(),
        }),
    ))
}

/// Check the submitted legs against the caller and each other
fn transfer_command(
    user: &AuthenticatedUser,
    request: &TransferRequest,
) -> Result<TransferCommand, AppError> {
    let sender = &request.sender_transaction;
    let receiver = &request.receiver_transaction;

    if sender.user != user.id {
        return Err(AppError::UnauthorizedTransfer);
    }

    if TransactionType::from_code(sender.transaction_type)? != TransactionType::TransferSent {
        return Err(AppError::InvalidRequest(
            "sender_transaction must be a Transfer Sent transaction".to_string(),
        ));
    }
    if TransactionType::from_code(receiver.transaction_type)? != TransactionType::TransferReceived {
        return Err(AppError::InvalidRequest(
            "receiver_transaction must be a Transfer Received transaction".to_string(),
        ));
    }
    if sender.amount != receiver.amount {
        return Err(AppError::InvalidRequest(
            "sender and receiver amounts must be equal".to_string(),
        ));
    }

    Ok(TransferCommand::new(sender.user, receiver.user, sender.amount))
}

/// An unknown party is a bad transfer payload, not a missing resource
fn transfer_error(err: LedgerError) -> AppError {
    match err {
        LedgerError::Domain(DomainError::UserNotFound(id)) => {
            AppError::InvalidRequest(format!("unknown user in transfer: {}", id))
        }
        other => other.into(),
    }
}

// =========================================================================
// /report
// =========================================================================

/// Per-user counts and balances with the system total; staff only
async fn report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ReportResponse>, AppError> {
    if !user.is_staff {
        return Err(AppError::Forbidden("staff access required".to_string()));
    }

    let users = state.ledger.balances.get_report().await?;
    let total_balance = BalanceCalculator::total_of(&users)?;

    Ok(Json(ReportResponse {
        users,
        total_balance: total_balance.value(),
    }))
}
