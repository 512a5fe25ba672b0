//! API Middleware
//!
//! Token authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::store::User;

use super::state::AppState;

/// The user resolved from the request's token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub is_staff: bool,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            is_staff: user.is_staff,
        }
    }
}

/// Authorization scheme keyword
const TOKEN_KEYWORD: &str = "Token";

// =========================================================================
// Token Authentication Middleware
// =========================================================================

/// Extract the key from an `Authorization: Token <key>` header value
pub fn parse_token_header(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    let keyword = parts.next()?;
    let key = parts.next()?;
    if keyword != TOKEN_KEYWORD || parts.next().is_some() {
        return None;
    }
    Some(key)
}

/// Resolve the caller from the `Authorization` header
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let header = match headers.get(AUTHORIZATION) {
        Some(value) => value,
        None => {
            return Err(AppError::Unauthenticated(
                "Authentication credentials were not provided.".to_string(),
            )
            .into_response());
        }
    };

    let key = match header.to_str().ok().and_then(parse_token_header) {
        Some(key) => key,
        None => {
            return Err(
                AppError::Unauthenticated("Invalid token header.".to_string()).into_response(),
            );
        }
    };

    let user = match state.users.authenticate(key).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Err(AppError::Unauthenticated("Invalid token.".to_string()).into_response());
        }
        Err(e) => {
            tracing::error!("Store error during token validation: {}", e);
            return Err(AppError::Store(e).into_response());
        }
    };

    if !user.is_active {
        return Err(
            AppError::Unauthenticated("User inactive or deleted.".to_string()).into_response(),
        );
    }

    // Extract correlation ID or generate new one
    let correlation_id = headers
        .get("X-Correlation-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let context = OperationContext::new()
        .with_request_user(user.id)
        .with_correlation_id(correlation_id);

    request.extensions_mut().insert(context);
    request.extensions_mut().insert(AuthenticatedUser::from(user));

    Ok(next.run(request).await)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());
    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
