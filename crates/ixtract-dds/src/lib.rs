//! DDS container headers for raw texture payloads.
//!
//! Console texture bundles store bare pixel payloads. To make them usable by
//! ordinary tools, each payload is prefixed with a DirectDraw Surface header
//! describing its dimensions, mip chain and block format:
//! - BC1 / BC3 payloads get a legacy `DXT1` / `DXT5` header (128 bytes)
//! - R8G8B8A8 payloads get a `DX10` header with the extension block (148 bytes)
//!
//! The payload bytes themselves are never touched here.
//!
//! # Example
//!
//! ```
//! use ixtract_dds::{block_compressed_header, BlockFormat};
//!
//! let header = block_compressed_header(BlockFormat::Bc1, 64, 64, 1)?;
//! assert_eq!(header.len(), 128);
//! # Ok::<(), ixtract_dds::Error>(())
//! ```

mod container;
mod error;
mod header;

pub use container::{
    block_compressed_header, parse_header, rgba8_header, BlockFormat, BLOCK_HEADER_LEN,
    DX10_HEADER_LEN,
};
pub use error::{Error, Result};
pub use header::{mipmap_size, DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FourCC};

/// DDS file magic bytes ("DDS ").
pub const DDS_MAGIC: &[u8; 4] = b"DDS ";
