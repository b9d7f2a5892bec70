//! Error types for the provider gateway.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while talking to the provider gateway or
/// resolving connections.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The driver answered non-2xx; the raw response body is preserved.
    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("connection not registered: {0}")]
    UnknownConnection(String),

    #[error("connection already registered: {0}")]
    AlreadyRegistered(String),

    /// The static geography asset has no entry for this provider/region.
    #[error("unknown location: {0}")]
    UnknownLocation(String),
}

impl From<GatewayError> for stratus_core::Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Upstream { status, body } => {
                stratus_core::Error::Upstream { status, body }
            }
            GatewayError::UnknownConnection(msg) => stratus_core::Error::NotFound(msg),
            GatewayError::AlreadyRegistered(msg) => stratus_core::Error::Conflict(msg),
            other => stratus_core::Error::Driver(other.to_string()),
        }
    }
}
