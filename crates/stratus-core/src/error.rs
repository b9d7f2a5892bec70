//! Shared error taxonomy for Stratus control-plane operations.
//!
//! Every operation in the catalog, resource, and MCIS layers surfaces one of
//! these kinds. The REST boundary maps them onto outward status codes
//! (Validation = 400, NotFound = 404, Conflict = 409, the rest = 500); this
//! layer only produces the kinds.

use thiserror::Error;

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Control-plane error kinds.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input detected before any remote call; nothing was applied.
    #[error("validation error: {0}")]
    Validation(String),

    /// The provider gateway answered non-2xx. The raw response body is
    /// preserved verbatim for diagnostics and never auto-retried here.
    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    /// The provider gateway could not be reached (transport failure or
    /// deadline expiry).
    #[error("driver error: {0}")]
    Driver(String),

    /// The target already exists.
    #[error("already exists: {0}")]
    Conflict(String),

    /// The target does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A fan-out was asked to run against an empty or invalid target set;
    /// raised before any dispatch.
    #[error("fan-out input error: {0}")]
    FanoutInput(String),

    /// A persistence-layer failure.
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether this error should map to an outward "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether this error should map to an outward "conflict".
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}
