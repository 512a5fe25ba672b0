//! Shared handler state

use std::sync::Arc;

use crate::ledger::Ledger;
use crate::store::UserDirectory;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub users: Arc<dyn UserDirectory>,
    /// Attempts per transfer before a serialization conflict reaches the client
    pub transfer_max_attempts: u32,
}

impl AppState {
    pub fn new(ledger: Ledger, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            ledger,
            users,
            transfer_max_attempts: 3,
        }
    }

    pub fn with_transfer_max_attempts(mut self, attempts: u32) -> Self {
        self.transfer_max_attempts = attempts.max(1);
        self
    }
}
