//! Error types for texture bundle handling.

use thiserror::Error;

/// Errors and warnings raised while decoding a texture bundle.
///
/// `HeaderCorrupt` is fatal for the bundle. The per-texture variants are
/// isolated: they are reported with the descriptor index and the batch moves
/// on to the next texture.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (out-of-bounds read).
    #[error("{0}")]
    Common(#[from] ixtract_common::Error),

    /// The descriptor table does not fit the header buffer.
    #[error("texture header is corrupt: {0}")]
    HeaderCorrupt(String),

    /// The index does not name a descriptor of this bundle.
    #[error("texture #{index} does not exist; the bundle has {count} textures")]
    NoSuchTexture { index: usize, count: usize },

    /// A descriptor points outside the payload buffer.
    #[error("texture #{index} at {offset:#010X}: payload range of {length} bytes exceeds payload size {available}")]
    PayloadOutOfBounds {
        index: usize,
        offset: usize,
        length: usize,
        available: usize,
    },

    /// The declared format is not in the codec table; the payload is dumped raw.
    #[error("texture #{index}: unknown pixel format {tag:#04X}, emitting raw payload")]
    UnknownFormat { index: usize, tag: u8 },

    /// The format is known but no container header could be built for it.
    #[error("texture #{index}: cannot build DDS header ({source}), emitting raw payload")]
    ContainerHeader {
        index: usize,
        #[source]
        source: ixtract_dds::Error,
    },

    /// A texture name could not be recovered from the string table.
    #[error("texture #{index}: name unavailable ({reason})")]
    NameUnavailable { index: usize, reason: String },
}

/// Result type for texture operations.
pub type Result<T> = std::result::Result<T, Error>;
