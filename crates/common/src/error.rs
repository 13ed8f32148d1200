use thiserror::Error;

use crate::validation::ValidationError;

/// Error types raised while building bridge inputs
///
/// `forward` itself never returns these; they surface when a descriptor,
/// configuration or cookie is constructed from bad input, and are logged
/// before being folded into a `BridgeResult` during a call.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Upstream body exceeds {0} bytes")]
    ResponseTooLarge(usize),
}

/// Type alias for Results using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
