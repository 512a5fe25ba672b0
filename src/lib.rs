//! wallet_ledger Library
//!
//! Re-exports modules for the server binary, tools and integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod jobs;
pub mod ledger;
pub mod store;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext, TransactionType};
pub use error::{AppError, AppResult, ErrorResponse};
