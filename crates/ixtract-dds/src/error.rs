//! Error types for DDS handling.

use thiserror::Error;

/// Errors that can occur when building or inspecting DDS headers.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] ixtract_common::Error),

    /// Invalid DDS magic.
    #[error("invalid DDS magic: expected 'DDS ', got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Block-compressed textures need dimensions that are multiples of 4.
    #[error("{width}x{height} is not a multiple of the 4x4 block size")]
    UnalignedDimensions { width: u32, height: u32 },
}

/// Result type for DDS operations.
pub type Result<T> = std::result::Result<T, Error>;
