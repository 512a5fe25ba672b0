//! Transfer Load Test
//!
//! Fires concurrent transfers from one funded sender and checks that the
//! sender never goes negative and that no value is created or lost.
//!
//! Run with: cargo run --bin load_test --release -- --transfers 200 --fund 10000 --amount 100

use std::sync::Arc;
use std::time::Instant;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;
use wallet_ledger::domain::TransactionType;
use wallet_ledger::ledger::{Ledger, RecordTransactionCommand, TransferCommand};
use wallet_ledger::store::{PgLedgerStore, UserDirectory};

fn arg<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> T {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let transfers: usize = arg(&args, "--transfers", 200);
    let fund: i64 = arg(&args, "--fund", 10_000);
    let amount: i64 = arg(&args, "--amount", 100);
    let receivers: usize = arg(&args, "--receivers", 5).max(1);
    let attempts: u32 = arg(&args, "--attempts", 5);

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Load Test - {} concurrent transfers of {}", transfers, amount);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await?;

    let store = Arc::new(PgLedgerStore::new(pool));
    let ledger = Ledger::new(store.clone());

    // Seed users for this run
    let run_id = Uuid::new_v4();
    let sender = store
        .create_user(&format!("load-sender-{}@test.local", run_id), false)
        .await?;
    let mut receiver_ids = Vec::with_capacity(receivers);
    for i in 0..receivers {
        let receiver = store
            .create_user(&format!("load-receiver-{}-{}@test.local", i, run_id), false)
            .await?;
        receiver_ids.push(receiver.id);
    }

    ledger
        .journal
        .record_transaction(&RecordTransactionCommand::new(
            sender.id,
            TransactionType::Charge,
            fund,
        ))
        .await?;

    let start = Instant::now();

    let mut handles = Vec::with_capacity(transfers);
    for i in 0..transfers {
        let engine = ledger.transfers.clone();
        let command = TransferCommand::new(sender.id, receiver_ids[i % receivers], amount);
        handles.push(tokio::spawn(async move {
            engine.transfer_with_retry(&command, attempts).await
        }));
    }

    let mut succeeded = 0i64;
    let mut insufficient = 0u64;
    let mut conflicts = 0u64;
    let mut other_errors = 0u64;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(e) if e.is_serialization_conflict() => conflicts += 1,
            Err(wallet_ledger::ledger::LedgerError::Domain(
                wallet_ledger::domain::DomainError::InsufficientBalance { .. },
            )) => insufficient += 1,
            Err(e) => {
                other_errors += 1;
                eprintln!("Transfer failed: {}", e);
            }
        }
    }

    let elapsed = start.elapsed();

    // Verify
    let sender_balance = ledger.balances.get_user_balance(sender.id).await?.value();
    let mut received = 0i64;
    for receiver_id in &receiver_ids {
        received += ledger.balances.get_user_balance(*receiver_id).await?.value();
    }

    println!("\n=== Load Test Results ===");
    println!("Transfers: {}", transfers);
    println!("Succeeded: {}", succeeded);
    println!("Insufficient balance: {}", insufficient);
    println!("Serialization conflicts (after retries): {}", conflicts);
    println!("Other errors: {}", other_errors);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} transfers/sec",
        transfers as f64 / elapsed.as_secs_f64()
    );
    println!("Sender balance: {}", sender_balance);
    println!("Received total: {}", received);

    anyhow::ensure!(sender_balance >= 0, "sender balance went negative");
    anyhow::ensure!(
        sender_balance + received == fund,
        "value not conserved: {} + {} != {}",
        sender_balance,
        received,
        fund
    );
    anyhow::ensure!(
        sender_balance == fund - succeeded * amount,
        "sender balance does not match successful transfers"
    );

    println!("Invariants hold");
    Ok(())
}
