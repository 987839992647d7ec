//! Error types for row mapping operations

use std::fmt;

use thiserror::Error;

/// Errors that can occur while building or executing a mapped statement
#[derive(Debug, Error)]
pub enum RowMapError {
    /// Field resolution or value conversion failure on a model
    #[error("Reflection error: {0}")]
    Reflection(String),

    /// Caller supplied inconsistent arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport-level failure executing a statement
    #[error("Execution error: {0}")]
    Execution(#[from] sqlx::Error),

    /// Begin/prepare/commit/rollback failure
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Connect or configuration failure
    #[error("Connection error: {0}")]
    Connection(String),
}

impl RowMapError {
    pub fn reflection(msg: impl Into<String>) -> Self {
        Self::Reflection(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}

/// Outcome of a failed batch execution.
///
/// A batch runs inside one transaction, so it can fail in two distinct ways
/// at once: the statement that broke the batch, and the rollback that tried
/// to clean up after it. Both are carried so callers cannot silently ignore
/// the cleanup outcome.
#[derive(Debug)]
pub struct BatchError {
    /// The failure that broke the batch
    pub cause: RowMapError,
    /// Rollback failure, when the cleanup itself went wrong
    pub cleanup: Option<RowMapError>,
}

impl BatchError {
    pub fn new(cause: RowMapError) -> Self {
        Self {
            cause,
            cleanup: None,
        }
    }

    pub fn with_cleanup(cause: RowMapError, cleanup: Option<RowMapError>) -> Self {
        Self { cause, cleanup }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cleanup {
            Some(cleanup) => write!(f, "{} (cleanup: {})", self.cause, cleanup),
            None => write!(f, "{}", self.cause),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<RowMapError> for BatchError {
    fn from(cause: RowMapError) -> Self {
        Self::new(cause)
    }
}

pub type Result<T> = std::result::Result<T, RowMapError>;
