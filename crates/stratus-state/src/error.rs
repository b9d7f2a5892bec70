//! Error types for the Stratus stores.

use thiserror::Error;

/// Result type alias for store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("unknown catalog column: {0}")]
    UnknownColumn(String),
}

impl From<StateError> for stratus_core::Error {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(msg) => stratus_core::Error::NotFound(msg),
            StateError::Conflict(msg) => stratus_core::Error::Conflict(msg),
            other => stratus_core::Error::Store(other.to_string()),
        }
    }
}
