//! Error types for PLC emission.

use thiserror::Error;

/// Errors that can occur while serializing or writing PLC documents.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for PLC operations.
pub type Result<T> = std::result::Result<T, Error>;
