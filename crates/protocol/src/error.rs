//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding an upstream payload
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON
    #[error("invalid payload json: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload parsed but is not a JSON object
    #[error("payload is not a json object")]
    NotAnObject,
}
