//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tokio::sync::{Mutex, MutexGuard};
use tower::util::ServiceExt;
use wallet_ledger::api::{self, AppState};
use wallet_ledger::ledger::Ledger;
use wallet_ledger::store::{MemoryStore, User, UserDirectory};

/// Router backed by a fresh in-memory store
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub ledger: Ledger,
}

pub fn setup_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(store.clone());
    let state = AppState::new(ledger.clone(), store.clone());

    TestApp {
        router: api::build_router(state),
        store,
        ledger,
    }
}

impl TestApp {
    /// Create a user and issue them a token
    pub async fn seed_user(&self, email: &str, is_staff: bool) -> (User, String) {
        let user = self
            .store
            .create_user(email, is_staff)
            .await
            .expect("Failed to seed user");
        let token = self
            .store
            .issue_token(user.id)
            .await
            .expect("Failed to issue token");
        (user, token)
    }

    /// Send a request and decode the JSON response body (Null when empty or not JSON)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Token {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn charge(&self, token: &str, amount: i64) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/v1/transactions",
            Some(token),
            Some(serde_json::json!({ "transaction_type": 1, "amount": amount })),
        )
        .await
    }
}

/// Tests sharing the database run one at a time
static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Connect to `DATABASE_URL`, apply the schema and truncate the wallet tables.
///
/// Returns `None` (and the caller skips) when no database is configured.
/// Keep the guard alive for the whole test.
pub async fn setup_test_db() -> Option<(MutexGuard<'static, ()>, PgPool)> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let guard = DB_LOCK.lock().await;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(include_str!("../../migrations/0001_wallet.sql"))
        .await
        .expect("Failed to apply schema");

    // Clean up DB for fresh state
    sqlx::query(
        "TRUNCATE TABLE transfer_transactions, user_balances, transactions, auth_tokens, users CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    Some((guard, pool))
}
