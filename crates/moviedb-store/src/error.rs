//! Store error types.

use moviedb_auth::AuthError;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Obtaining the database password failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// CSV parsing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Migration script error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Seed input error.
    #[error("seed error: {0}")]
    Seed(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
