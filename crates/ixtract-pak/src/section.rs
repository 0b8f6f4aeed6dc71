//! Section identities and resolved section offsets.

use std::fmt;

/// Leading word of a mesh section header.
pub const MESH_SENTINEL: u32 = 0x144C_0000;

/// Leading word of a bone section header.
pub const BONE_SENTINEL: u32 = 0x1703_0000;

/// The two sections a model PAK carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Mesh,
    Bone,
}

impl SectionKind {
    /// The header word every section of this kind starts with.
    pub const fn sentinel(self) -> u32 {
        match self {
            SectionKind::Mesh => MESH_SENTINEL,
            SectionKind::Bone => BONE_SENTINEL,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Mesh => f.write_str("mesh"),
            SectionKind::Bone => f.write_str("bone"),
        }
    }
}

/// How a section offset was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Supplied by the operator.
    Manual,
    /// Read from the archive's entry table and validated.
    EntryTable,
    /// Found by scanning the archive.
    Scanned,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Manual => f.write_str("manual"),
            Provenance::EntryTable => f.write_str("entry table"),
            Provenance::Scanned => f.write_str("scan"),
        }
    }
}

/// A resolved section offset. Only the locator constructs these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOffset {
    kind: SectionKind,
    offset: usize,
    provenance: Provenance,
}

impl SectionOffset {
    pub(crate) const fn new(kind: SectionKind, offset: usize, provenance: Provenance) -> Self {
        Self {
            kind,
            offset,
            provenance,
        }
    }

    #[inline]
    pub const fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Absolute byte offset of the section header.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub const fn provenance(&self) -> Provenance {
        self.provenance
    }
}

impl fmt::Display for SectionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} section at {:#010X} ({})", self.kind, self.offset, self.provenance)
    }
}
