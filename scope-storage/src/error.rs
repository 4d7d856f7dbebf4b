//! Error types for storage operations

use crate::objects::ObjectFetchError;
use thiserror::Error;

/// Storage layer error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Object fetch failed: {0}")]
    ObjectFetch(#[from] ObjectFetchError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Core domain error: {0}")]
    Core(#[from] scope_core::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Whether the record store itself failed, as opposed to a bad input
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Migration(_))
    }
}

/// Convenience result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;
