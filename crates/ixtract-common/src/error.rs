//! Error types for ixtract-common.

use thiserror::Error;

/// Common error type for cursor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A read or seek went past the end of the buffer.
    #[error("out of bounds at {offset:#X}: needed {needed} bytes but only {available} available")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Missing null terminator in string.
    #[error("string at {0:#X} is missing its null terminator")]
    MissingNullTerminator(usize),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a bounds violation (as opposed to a malformed string).
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Error::OutOfBounds { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
