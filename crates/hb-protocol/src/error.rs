//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding bridge frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame was valid JSON but not an object
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
