//! Centralized error types for Itemcast.

use thiserror::Error;

/// Main error type for item operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(#[from] itemcast_db::DbError),
}

/// Result type for item operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
