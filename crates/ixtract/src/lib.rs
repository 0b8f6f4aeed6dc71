//! ixtract - Invizimals asset extraction library.
//!
//! This crate provides a unified interface to the ixtract crates for pulling
//! textures and rigged models out of the game's PS3-era archives.
//!
//! # Crates
//!
//! - [`ixtract_common`] - Bounds-checked byte cursor
//! - [`ixtract_dds`] - DDS container headers
//! - [`ixtract_tex`] - `.blh`/`.bli` texture bundles
//! - [`ixtract_pak`] - Model PAK section location, meshes and bones
//! - [`ixtract_plc`] - Parameter List Container documents
//!
//! # Example
//!
//! ```no_run
//! use ixtract::prelude::*;
//!
//! let archive = ArchiveBuffer::open("creature.pak")?;
//! let model = extract_pak(&archive, &PakOptions::default())?;
//!
//! let writer = PlcWriter::new(archive.name(), PlcOptions::default());
//! write_all(&writer.from_extraction(&model), std::path::Path::new("out"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use ixtract_common as common;
pub use ixtract_dds as dds;
pub use ixtract_pak as pak;
pub use ixtract_plc as plc;
pub use ixtract_tex as tex;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ixtract_common::ByteCursor;
    pub use ixtract_pak::{
        extract_pak, ArchiveBuffer, LocatorConfig, MeshOptions, PakExtraction, PakOptions,
        PakSectionLocator, Provenance, SectionKind, SectionRequest,
    };
    pub use ixtract_plc::{write_all, PlcOptions, PlcWriter};
    pub use ixtract_tex::{extract_bundle, BundleHeader, DispatchOptions, TextureFormat};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
