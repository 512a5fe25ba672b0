//! API Integration Tests

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;

fn transfer_body(sender: Uuid, receiver: Uuid, amount: i64) -> Value {
    json!({
        "sender_transaction": { "user": sender, "transaction_type": 4, "amount": amount },
        "receiver_transaction": { "user": receiver, "transaction_type": 3, "amount": amount },
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let app = common::setup_test_app();
    let (status, _) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = common::setup_test_app();

    let (status, body) = app.send("GET", "/api/v1/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "not_authenticated");

    let (status, _) = app
        .send("GET", "/api/v1/transactions", Some("not-a-real-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_list_transactions() {
    let app = common::setup_test_app();
    let (user, token) = app.seed_user("test@email.com", false).await;
    let (_, other_token) = app.seed_user("other@email.com", false).await;

    let (status, created) = app.charge(&token, 100).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user"], json!(user.id));
    assert_eq!(created["transaction_type"], 1);
    assert_eq!(created["amount"], 100);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/transactions",
            Some(&token),
            Some(json!({ "transaction_type": 2, "amount": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.charge(&other_token, 500).await;

    let (status, listed) = app.send("GET", "/api/v1/transactions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|t| t["user"] == json!(user.id)));
}

#[tokio::test]
async fn test_invalid_transactions_rejected() {
    let app = common::setup_test_app();
    let (_, token) = app.seed_user("test@email.com", false).await;

    for body in [
        json!({ "transaction_type": 4, "amount": 100 }),
        json!({ "transaction_type": 9, "amount": 100 }),
        json!({ "transaction_type": 1, "amount": 0 }),
        json!({ "transaction_type": 1, "amount": -5 }),
        json!({ "amount": 100 }),
    ] {
        let (status, response) = app
            .send("POST", "/api/v1/transactions", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", response);
    }

    let (_, listed) = app.send("GET", "/api/v1/transactions", Some(&token), None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_balance_endpoint() {
    let app = common::setup_test_app();
    let (_, token) = app.seed_user("test@email.com", false).await;

    let (status, body) = app
        .send("GET", "/api/v1/transactions/1/balance", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user balance"], 0);

    app.charge(&token, 250).await;
    app.send(
        "POST",
        "/api/v1/transactions",
        Some(&token),
        Some(json!({ "transaction_type": 2, "amount": 50 })),
    )
    .await;

    let (_, body) = app
        .send("GET", "/api/v1/transactions/1/balance", Some(&token), None)
        .await;
    assert_eq!(body["user balance"], 200);
}

#[tokio::test]
async fn test_transfer_moves_funds() {
    let app = common::setup_test_app();
    let (sender, sender_token) = app.seed_user("sender@email.com", false).await;
    let (receiver, receiver_token) = app.seed_user("receiver@email.com", false).await;
    app.charge(&sender_token, 100).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(&sender_token),
            Some(transfer_body(sender.id, receiver.id, 100)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["success"]["sender_transaction"]["user"], json!(sender.id));
    assert_eq!(body["success"]["sender_transaction"]["transaction_type"], 4);
    assert_eq!(body["success"]["receiver_transaction"]["user"], json!(receiver.id));
    assert_eq!(body["success"]["receiver_transaction"]["amount"], 100);

    let (_, sender_balance) = app
        .send("GET", "/api/v1/transactions/1/balance", Some(&sender_token), None)
        .await;
    let (_, receiver_balance) = app
        .send("GET", "/api/v1/transactions/1/balance", Some(&receiver_token), None)
        .await;
    assert_eq!(sender_balance["user balance"], 0);
    assert_eq!(receiver_balance["user balance"], 100);

    // Both parties see the transfer
    let (_, sender_transfers) = app.send("GET", "/api/v1/transfer", Some(&sender_token), None).await;
    let (_, receiver_transfers) = app
        .send("GET", "/api/v1/transfer", Some(&receiver_token), None)
        .await;
    assert_eq!(sender_transfers.as_array().unwrap().len(), 1);
    assert_eq!(receiver_transfers.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_transfer_with_insufficient_balance() {
    let app = common::setup_test_app();
    let (sender, sender_token) = app.seed_user("sender@email.com", false).await;
    let (receiver, _) = app.seed_user("receiver@email.com", false).await;
    app.charge(&sender_token, 50).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(&sender_token),
            Some(transfer_body(sender.id, receiver.id, 100)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "insufficient_balance");
    assert!(body["error"].is_string());

    let (_, balance) = app
        .send("GET", "/api/v1/transactions/1/balance", Some(&sender_token), None)
        .await;
    assert_eq!(balance["user balance"], 50);

    let (_, transfers) = app.send("GET", "/api/v1/transfer", Some(&sender_token), None).await;
    assert!(transfers.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_request_validation() {
    let app = common::setup_test_app();
    let (sender, sender_token) = app.seed_user("sender@email.com", false).await;
    let (receiver, _) = app.seed_user("receiver@email.com", false).await;
    app.charge(&sender_token, 500).await;

    // Sending on behalf of someone else
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(&sender_token),
            Some(transfer_body(receiver.id, sender.id, 10)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Mismatched amounts
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(&sender_token),
            Some(json!({
                "sender_transaction": { "user": sender.id, "transaction_type": 4, "amount": 10 },
                "receiver_transaction": { "user": receiver.id, "transaction_type": 3, "amount": 20 },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Self transfer
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(&sender_token),
            Some(transfer_body(sender.id, sender.id, 10)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "same_user_transfer");

    // Unknown receiver
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(&sender_token),
            Some(transfer_body(sender.id, Uuid::new_v4(), 10)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");
    assert!(body["error"].is_string());

    let (_, balance) = app
        .send("GET", "/api/v1/transactions/1/balance", Some(&sender_token), None)
        .await;
    assert_eq!(balance["user balance"], 500);
}

#[tokio::test]
async fn test_user_balance_snapshots() {
    let app = common::setup_test_app();
    let (user, token) = app.seed_user("test@email.com", false).await;
    app.charge(&token, 300).await;

    // Client-supplied balance is ignored
    let (status, snapshot) = app
        .send(
            "POST",
            "/api/v1/userbalance",
            Some(&token),
            Some(json!({ "balance": 999999 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(snapshot["user"], json!(user.id));
    assert_eq!(snapshot["balance"], 300);

    app.charge(&token, 100).await;
    app.send("POST", "/api/v1/userbalance", Some(&token), None).await;

    let (status, history) = app.send("GET", "/api/v1/userbalance", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["balance"], 400);
    assert_eq!(history[1]["balance"], 300);
}

#[tokio::test]
async fn test_report_is_staff_only() {
    let app = common::setup_test_app();
    let (sender, sender_token) = app.seed_user("sender@email.com", false).await;
    let (receiver, _) = app.seed_user("receiver@email.com", false).await;
    let (_, staff_token) = app.seed_user("staff@email.com", true).await;
    app.charge(&sender_token, 200).await;
    app.send(
        "POST",
        "/api/v1/transfer",
        Some(&sender_token),
        Some(transfer_body(sender.id, receiver.id, 80)),
    )
    .await;

    let (status, _) = app.send("GET", "/api/v1/report", Some(&sender_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = app.send("GET", "/api/v1/report", Some(&staff_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_balance"], 200);

    let users = report["users"].as_array().unwrap();
    assert_eq!(users.len(), 3);
    let row = |id: Uuid| users.iter().find(|u| u["user_id"] == json!(id)).unwrap();
    assert_eq!(row(sender.id)["balance"], 120);
    assert_eq!(row(sender.id)["transactions_count"], 2);
    assert_eq!(row(receiver.id)["balance"], 80);
    assert_eq!(row(receiver.id)["transactions_count"], 1);
}
