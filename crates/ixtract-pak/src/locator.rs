//! Section location: manual offsets, the archive's entry table, or a scan.

use ixtract_common::ByteCursor;
use log::{debug, warn};
use memchr::memmem;

use crate::archive::EntryTable;
use crate::bone::{self, BONE_TABLE_OFFSET};
use crate::mesh::{self, MESH_HEADER_SIZE};
use crate::section::{Provenance, SectionKind, SectionOffset};
use crate::{Error, Result};

/// Tuning for auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorConfig {
    /// Candidates must start at a multiple of this.
    pub alignment: usize,
    /// Leading records that must validate before a candidate is accepted.
    pub quorum: usize,
    /// Upper bound on a plausible mesh count.
    pub max_meshes: usize,
    /// Try the archive's own entry table before scanning.
    pub use_entry_table: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            alignment: 16,
            quorum: 3,
            max_meshes: 1024,
            use_entry_table: true,
        }
    }
}

/// Operator-supplied offsets; `None` means auto-detect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRequest {
    pub mesh: Option<usize>,
    pub bone: Option<usize>,
}

/// Both resolved sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedSections {
    pub mesh: SectionOffset,
    pub bone: SectionOffset,
}

/// Resolves section offsets within one archive.
#[derive(Debug, Clone, Copy)]
pub struct PakSectionLocator<'a> {
    data: &'a [u8],
    config: LocatorConfig,
}

impl<'a> PakSectionLocator<'a> {
    pub fn new(data: &'a [u8], config: LocatorConfig) -> Self {
        Self { data, config }
    }

    /// Resolve both sections. Manual offsets win; only missing ones are detected.
    pub fn locate(&self, request: &SectionRequest) -> Result<LocatedSections> {
        let hints = match (request.mesh, request.bone) {
            (Some(_), Some(_)) => None,
            _ => self.entry_table(),
        };

        let mesh = match request.mesh {
            Some(offset) => self.manual(SectionKind::Mesh, offset)?,
            None => self.auto(SectionKind::Mesh, hints.map(|t| t.mesh_section))?,
        };
        let bone = match request.bone {
            Some(offset) => self.manual(SectionKind::Bone, offset)?,
            None => self.auto(SectionKind::Bone, hints.map(|t| t.bone_section))?,
        };

        debug!("{mesh}");
        debug!("{bone}");
        Ok(LocatedSections { mesh, bone })
    }

    /// Accept an operator offset after a bounds check of its header.
    ///
    /// A wrong sentinel or an unparseable first record is only a warning.
    pub fn manual(&self, kind: SectionKind, offset: usize) -> Result<SectionOffset> {
        if offset >= self.data.len() {
            return Err(Error::OffsetOutOfRange {
                kind,
                offset,
                len: self.data.len(),
            });
        }

        let header_len = match kind {
            SectionKind::Mesh => MESH_HEADER_SIZE,
            SectionKind::Bone => BONE_TABLE_OFFSET,
        };
        let mut cursor = ByteCursor::new_at(self.data, offset)?;
        cursor.peek_bytes(header_len)?;

        let sentinel = cursor.read_u32_be()?;
        if sentinel != kind.sentinel() {
            warn!(
                "{kind} section at {offset:#010X} starts with {sentinel:#010X}, expected {:#010X}",
                kind.sentinel()
            );
        } else if let Err(e) = validate_candidate(self.data, kind, offset, &self.config) {
            warn!("{kind} section at {offset:#010X}: {e}");
        }

        Ok(SectionOffset::new(kind, offset, Provenance::Manual))
    }

    /// Detect a section: the entry table hint if it validates, else a scan.
    pub fn auto(&self, kind: SectionKind, hint: Option<usize>) -> Result<SectionOffset> {
        if let Some(offset) = hint {
            match validate_candidate(self.data, kind, offset, &self.config) {
                Ok(()) => return Ok(SectionOffset::new(kind, offset, Provenance::EntryTable)),
                Err(e) => debug!("entry table {kind} offset {offset:#010X} rejected: {e}"),
            }
        }

        scan(self.data, kind, &self.config)
            .map(|offset| SectionOffset::new(kind, offset, Provenance::Scanned))
            .ok_or(Error::SectionNotFound { kind })
    }

    fn entry_table(&self) -> Option<EntryTable> {
        if !self.config.use_entry_table {
            return None;
        }
        match EntryTable::from_archive(self.data) {
            Ok(table) => Some(table),
            Err(e) => {
                debug!("no usable entry table: {e}");
                None
            }
        }
    }
}

/// Check that the first `quorum` records at `offset` validate structurally.
pub fn validate_candidate(
    data: &[u8],
    kind: SectionKind,
    offset: usize,
    config: &LocatorConfig,
) -> Result<()> {
    match kind {
        SectionKind::Mesh => mesh::validate_section(data, offset, config.quorum, config.max_meshes),
        SectionKind::Bone => bone::validate_section(data, offset, config.quorum),
    }
}

/// First aligned sentinel hit, in archive order, that passes validation.
pub fn scan(data: &[u8], kind: SectionKind, config: &LocatorConfig) -> Option<usize> {
    let needle = kind.sentinel().to_be_bytes();
    let alignment = config.alignment.max(1);

    memmem::find_iter(data, &needle)
        .filter(|offset| offset % alignment == 0)
        .find(|&offset| validate_candidate(data, kind, offset, config).is_ok())
}
