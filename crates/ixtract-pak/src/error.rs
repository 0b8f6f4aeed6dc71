//! Error types for the PAK crate.

use thiserror::Error;

use crate::section::SectionKind;

/// Errors that can occur while locating and walking PAK sections.
///
/// Section-level variants (`SectionNotFound`, `OffsetOutOfRange`,
/// `SectionInvalid`) abort the run for the archive. Record-level variants
/// are collected as issues while the walk carries on.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (out-of-bounds read).
    #[error("{0}")]
    Common(#[from] ixtract_common::Error),

    /// The file header does not look like a model PAK.
    #[error("invalid PAK header: {0}")]
    InvalidHeader(String),

    /// An operator-supplied offset lies outside the archive.
    #[error("{kind} section offset {offset:#X} is outside the {len}-byte archive")]
    OffsetOutOfRange {
        kind: SectionKind,
        offset: usize,
        len: usize,
    },

    /// Auto-detection never satisfied the quorum.
    #[error("{kind} section not found; pass its offset manually (e.g. `-m d75570 -b dc1770`), the section starts with {:#010X}", kind.sentinel())]
    SectionNotFound { kind: SectionKind },

    /// A section header or count field could not be resolved.
    #[error("{kind} section at {offset:#X} is invalid: {reason}")]
    SectionInvalid {
        kind: SectionKind,
        offset: usize,
        reason: String,
    },

    /// A mesh table entry cannot be parsed; the rest of the table is unreachable.
    #[error("mesh #{index:02}: table entry at {offset:#X} is corrupt: {reason}")]
    MeshTableCorrupt {
        index: usize,
        offset: usize,
        reason: String,
    },

    /// A mesh table entry was skipped because it cannot describe a mesh.
    #[error("mesh #{index:02}: skipped table entry ({reason})")]
    MeshEntrySkipped { index: usize, reason: String },

    /// A mesh record ran out of bounds while reading its data.
    #[error("mesh #{index:02} at {offset:#X}: {source}")]
    MeshTruncated {
        index: usize,
        offset: usize,
        #[source]
        source: ixtract_common::Error,
    },

    /// A face refers to a vertex the mesh does not have.
    #[error("mesh #{index:02}: face index {max} exceeds vertex count {vertex_count}")]
    FaceIndexOutOfRange {
        index: usize,
        max: u16,
        vertex_count: usize,
    },

    /// Blend slots that fall outside the mesh's bone palette.
    #[error("mesh #{index:02}: {count} blend indices fall outside the bone palette")]
    UnmappedBlendIndices { index: usize, count: usize },

    /// A mesh references a bone the skeleton does not have.
    #[error("mesh #{mesh:02} references bone {bone}, but the skeleton has {bone_count} bones")]
    UnresolvedBone {
        mesh: usize,
        bone: u32,
        bone_count: usize,
    },

    /// `skip` asked for more records than were found.
    #[error("skip of {skip} exceeds the {available} mesh records found; nothing left to emit")]
    SkipExceedsRecords { skip: usize, available: usize },

    /// A bone's parent is not an earlier bone.
    #[error("bone #{index}: parent index {parent} is not an earlier bone, treating it as a root")]
    BoneTreeInvalid { index: usize, parent: usize },

    /// A bone's parent entry could not be read.
    #[error("bone #{index}: parent entry at {offset:#X} is unreadable, treating it as a root")]
    BoneParentUnreadable { index: usize, offset: usize },

    /// A bone's name could not be read.
    #[error("bone #{index}: name unavailable ({reason})")]
    BoneNameUnavailable { index: usize, reason: String },
}

/// Result type for PAK operations.
pub type Result<T> = std::result::Result<T, Error>;
