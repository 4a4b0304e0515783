//! Error types for event decoding.

use thiserror::Error;

/// Errors that can occur when decoding events.
#[derive(Debug, Error, Clone)]
pub enum EventError {
    /// The operation string is not a known operation kind.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The event payload is invalid.
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}
