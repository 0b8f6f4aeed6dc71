//! Texture bundle (`.blh` / `.bli`) extraction.
//!
//! A bundle is a pair of files: the `.blh` header holds a table of texture
//! descriptors, the `.bli` file holds the concatenated payloads they point
//! into. Extraction is a single pass over the descriptors:
//!
//! 1. [`BundleHeader::parse`] decodes the descriptor table (fatal on corruption)
//! 2. [`TextureAsset::from_bundle`] slices each payload (per-texture failures are isolated)
//! 3. [`dispatch`] wraps known formats in a DDS header, or dumps unknown ones raw
//!
//! # Example
//!
//! ```no_run
//! use ixtract_tex::{extract_bundle, BundleHeader, DispatchOptions};
//!
//! let header = BundleHeader::parse(&std::fs::read("ui.blh")?)?;
//! let payload = std::fs::read("ui.bli")?;
//! let report = extract_bundle(&header, &payload, &DispatchOptions::default());
//! for texture in &report.emitted {
//!     texture.write_to(std::path::Path::new("out"))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod dispatch;
mod error;
mod format;
mod header;
mod swizzle;

pub use dispatch::{
    dispatch, extract_bundle, output_file_name, BundleReport, ContainerKind, DispatchOptions,
    EmittedTexture, TextureAsset,
};
pub use error::{Error, Result};
pub use format::{MipChain, TextureFormat};
pub use header::{
    BundleHeader, BundleHeaderRaw, TextureDescriptor, TextureRecord, BLH_PREFIX,
    BUNDLE_HEADER_SIZE, TEXTURE_RECORD_SIZE,
};
pub use swizzle::unswizzle_rgba;
