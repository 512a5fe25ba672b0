//! Database module
//!
//! Connection and schema checks for the Postgres store.

use sqlx::PgPool;

/// Tables created by `migrations/0001_wallet.sql`
const REQUIRED_TABLES: &[&str] = &[
    "users",
    "auth_tokens",
    "transactions",
    "user_balances",
    "transfer_transactions",
];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!(
                "Required table '{}' does not exist. Please run migrations/0001_wallet.sql.",
                table
            );
            return Ok(false);
        }
    }

    Ok(true)
}
