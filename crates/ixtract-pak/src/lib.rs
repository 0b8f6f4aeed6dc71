//! Model PAK extraction.
//!
//! A model PAK carries two sections of interest: a mesh section (sentinel
//! `0x144C0000`) and a bone section (sentinel `0x17030000`). Extraction runs
//! in three steps:
//!
//! 1. [`PakSectionLocator`] resolves both offsets, from the operator, the
//!    archive's entry table, or a sentinel scan with quorum validation
//! 2. [`extract_meshes`] and [`extract_bones`] walk the sections
//! 3. [`extract_pak`] ties them together and cross-references bone indices
//!
//! # Example
//!
//! ```no_run
//! use ixtract_pak::{extract_pak, ArchiveBuffer, PakOptions, SectionRequest};
//!
//! let archive = ArchiveBuffer::open("creature.pak")?;
//! let options = PakOptions {
//!     sections: SectionRequest { mesh: Some(0xd75570), bone: Some(0xdc1770) },
//!     ..PakOptions::default()
//! };
//! let model = extract_pak(&archive, &options)?;
//! println!("{} meshes, {} bones", model.meshes.len(), model.skeleton.len());
//! # Ok::<(), ixtract_pak::Error>(())
//! ```

mod archive;
mod bone;
mod error;
mod extract;
mod locator;
mod mesh;
mod section;

#[cfg(test)]
mod testdata;

pub use archive::{
    ArchiveBuffer, EntryTable, EntryTableRaw, PakHeader, PakHeaderRaw, PAK_MODEL_TAG, PAK_PREFIX,
    PAK_VERSIONS,
};
pub use bone::{
    extract_bones, BoneExtraction, BoneRecord, BoneSectionHeader, Matrix4, Skeleton,
    BONE_ENTRY_SIZE, BONE_TABLE_OFFSET, MATRIX_SIZE,
};
pub use error::{Error, Result};
pub use extract::{extract_pak, PakExtraction, PakOptions};
pub use locator::{
    scan, validate_candidate, LocatedSections, LocatorConfig, PakSectionLocator, SectionRequest,
};
pub use mesh::{
    apply_order, extract_meshes, mesh_data_len, read_table, MeshExtraction, MeshOptions,
    MeshRecord, MeshSectionHeader, MeshTableEntry, StreamLayout, Vertex, MAX_PALETTE_LEN,
    MESH_HEADER_SIZE, UV_STRIDE, VERTEX_STRIDE,
};
pub use section::{Provenance, SectionKind, SectionOffset, BONE_SENTINEL, MESH_SENTINEL};

use ixtract_common::ByteCursor;

/// Read `N` consecutive big-endian words.
pub(crate) fn read_words<const N: usize>(
    cursor: &mut ByteCursor<'_>,
) -> ixtract_common::Result<[u32; N]> {
    let mut words = [0u32; N];
    for word in &mut words {
        *word = cursor.read_u32_be()?;
    }
    Ok(words)
}
