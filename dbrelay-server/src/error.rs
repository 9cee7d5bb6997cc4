//! Server-level errors.

use thiserror::Error;

/// Errors raised by the protocol layer itself. Tool failures never surface
/// here; they are reported inside the tool result envelope.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reading requests or writing responses failed
    #[error("I/O error on protocol stream: {0}")]
    Io(#[from] std::io::Error),

    /// A declared tool input schema did not compile
    #[error("JSON Schema compilation failed for tool '{tool}': {message}")]
    SchemaCompilation { tool: &'static str, message: String },

    /// A response could not be encoded
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
