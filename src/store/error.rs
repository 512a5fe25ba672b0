//! Ledger Store Errors
//!
//! Error types for store operations.

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The unit of work lost a serialization race and was rolled back
    #[error("Serialization conflict: concurrent unit of work detected")]
    SerializationConflict,

    /// A write violated a storage constraint (foreign key, uniqueness, check)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back to a domain record
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Re-running the whole unit of work from scratch may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::SerializationConflict)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => return StoreError::SerializationConflict,
                // integrity constraint violations
                Some(code) if code.starts_with("23") => {
                    return StoreError::Constraint(db_err.message().to_string())
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}
