//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized transfer: request user does not match sender")]
    UnauthorizedTransfer,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Store errors
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Domain(e) => AppError::Domain(e),
            LedgerError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "not_authenticated", None),

            // 403 Forbidden
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::UnauthorizedTransfer => {
                (StatusCode::FORBIDDEN, "unauthorized_transfer", None)
            }

            AppError::Domain(domain_err) => match domain_err {
                DomainError::InsufficientBalance { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_balance",
                    Some(domain_err.to_string()),
                ),
                DomainError::InvalidAmount(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
                }
                DomainError::InvalidTransactionType(code) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_transaction_type",
                    Some(code.to_string()),
                ),
                DomainError::SameUserTransfer => {
                    (StatusCode::BAD_REQUEST, "same_user_transfer", None)
                }
                DomainError::BusinessRuleViolation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "business_rule_violation",
                    Some(msg.clone()),
                ),
                DomainError::UserNotFound(id) => {
                    (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
                }
                DomainError::BalanceOverflow => {
                    tracing::error!("Balance overflow while aggregating transactions");
                    (StatusCode::INTERNAL_SERVER_ERROR, "balance_overflow", None)
                }
            },

            // 409 Conflict
            AppError::Store(StoreError::SerializationConflict) => {
                (StatusCode::CONFLICT, "serialization_conflict", None)
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.status_and_code();

        // Store failures stay in the logs, not in the response
        let error = match &self {
            AppError::Store(StoreError::SerializationConflict) => self.to_string(),
            AppError::Store(_) => "Store error".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
