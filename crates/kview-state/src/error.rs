//! Error types for the kview retention store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("prepare error: {0}")]
    Prepare(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("blocking task failed: {0}")]
    Task(String),
}
