//! Error types for the SoftHaus crate
//!
//! This module contains all error types that can be returned by the SoftHaus coordinator.

use store_object::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoftHausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Store already registered: {0}")]
    StoreAlreadyRegistered(String),

    #[error("No database pool: SoftHaus was built from custom parts")]
    NoDatabase,

    #[error(transparent)]
    Store(#[from] StoreError),
}
