//! Mesh section walking.
//!
//! Layout, relative to the section base `B`:
//!
//! ```text
//! B+0x00   header, 12 words; word 0 = 0x144C0000, word 10 = L
//! B+L      table pointer P, packed word (mesh count in the high half)
//! B+P      T + 16, where T is the mesh table
//! B+T      per mesh: palette slots (0-terminated, padded to 16), 0x30 mesh header
//! B+D      per mesh: u16 faces (padded to 16), 64-byte vertices, f16 UVs (padded to 16)
//! ```

use ixtract_common::ByteCursor;
use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::section::{SectionKind, SectionOffset, MESH_SENTINEL};
use crate::{read_words, Error, Result};

/// Size of the section header and of each per-mesh header.
pub const MESH_HEADER_SIZE: usize = 0x30;

/// Stride of one interleaved vertex.
pub const VERTEX_STRIDE: usize = 64;

/// Stride of one UV pair (two half floats).
pub const UV_STRIDE: usize = 4;

/// Blend slots are bytes, so a palette never has more entries than this.
pub const MAX_PALETTE_LEN: usize = 256;

const SECTION_ALIGNMENT: usize = 16;

const fn pad16(len: usize) -> usize {
    (len + SECTION_ALIGNMENT - 1) & !(SECTION_ALIGNMENT - 1)
}

/// Bytes a mesh occupies at its data offset.
pub const fn mesh_data_len(vertex_count: usize, face_count: usize) -> usize {
    pad16(face_count * 3 * 2) + vertex_count * VERTEX_STRIDE + pad16(vertex_count * UV_STRIDE)
}

/// Resolved section header: where the mesh table lives and how many entries it declares.
#[derive(Debug, Clone, Copy)]
pub struct MeshSectionHeader {
    pub base: usize,
    pub sentinel: u32,
    pub declared_count: usize,
    /// Absolute offset of the first table entry.
    pub table: usize,
}

impl MeshSectionHeader {
    /// Follow the header and list descriptor to the mesh table.
    pub fn read(data: &[u8], base: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new_at(data, base)?;
        let words: [u32; 12] = read_words(&mut cursor)?;
        let list = base.saturating_add(words[10] as usize);

        cursor.seek(list)?;
        let pointer = cursor.read_u32_be()? as usize;
        let packed = cursor.read_u32_be()?;

        cursor.seek(base.saturating_add(pointer))?;
        let table = (cursor.read_u32_be()? as usize)
            .checked_sub(16)
            .map(|relative| base + relative)
            .filter(|&table| table < data.len())
            .ok_or_else(|| Error::SectionInvalid {
                kind: SectionKind::Mesh,
                offset: base,
                reason: "mesh table pointer is outside the archive".to_string(),
            })?;

        Ok(Self {
            base,
            sentinel: words[0],
            declared_count: (packed >> 16) as usize,
            table,
        })
    }
}

/// One mesh table entry: the palette and the mesh header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTableEntry {
    /// Position in the mesh table.
    pub index: usize,
    /// Blend slot to skeleton bone index.
    pub palette: Vec<u32>,
    pub vertex_count: usize,
    pub face_count: usize,
    /// Data offset relative to the section base.
    pub data_offset: usize,
}

impl MeshTableEntry {
    fn read(cursor: &mut ByteCursor<'_>, index: usize) -> Result<Self> {
        let palette_start = cursor.position();
        let mut palette = Vec::new();
        loop {
            let slot = cursor.read_u32_be()?;
            if slot == 0 {
                break;
            }
            let first = slot >> 16;
            let run = slot & 0xFFFF;
            if palette.len() + run as usize > MAX_PALETTE_LEN {
                return Err(Error::MeshTableCorrupt {
                    index,
                    offset: palette_start,
                    reason: format!(
                        "bone palette exceeds {MAX_PALETTE_LEN} entries (run of {run} after {})",
                        palette.len()
                    ),
                });
            }
            palette.extend(first..first + run);
        }
        cursor.align_from(palette_start, SECTION_ALIGNMENT);

        let words: [u32; 12] = read_words(cursor)?;
        Ok(Self {
            index,
            palette,
            vertex_count: (words[0] & 0xFFFF) as usize,
            face_count: (words[0] >> 16) as usize / 3,
            data_offset: words[1] as usize,
        })
    }

    /// Why this entry cannot describe a mesh, if it cannot.
    fn rejection(&self, previous_offset: usize) -> Option<&'static str> {
        if self.data_offset == 0 {
            Some("data offset is zero")
        } else if self.data_offset <= previous_offset {
            Some("data offset does not increase")
        } else if self.vertex_count == 0 {
            Some("no vertices")
        } else if self.face_count == 0 {
            Some("no faces")
        } else if self.palette.is_empty() {
            Some("empty bone palette")
        } else {
            None
        }
    }
}

/// Read up to `limit` table entries. Stops at the first entry that cannot be parsed.
pub fn read_table(
    data: &[u8],
    header: &MeshSectionHeader,
    limit: usize,
) -> (Vec<MeshTableEntry>, Option<Error>) {
    let mut cursor = match ByteCursor::new_at(data, header.table) {
        Ok(cursor) => cursor,
        Err(e) => return (Vec::new(), Some(e.into())),
    };

    let mut entries = Vec::new();
    for index in 0..header.declared_count.min(limit) {
        match MeshTableEntry::read(&mut cursor, index) {
            Ok(entry) => entries.push(entry),
            Err(e) => return (entries, Some(e)),
        }
    }
    (entries, None)
}

/// Structural check used by the locator: the first `quorum` entries parse
/// and their data ranges lie inside the archive.
pub(crate) fn validate_section(
    data: &[u8],
    base: usize,
    quorum: usize,
    max_meshes: usize,
) -> Result<()> {
    let invalid = |reason: String| Error::SectionInvalid {
        kind: SectionKind::Mesh,
        offset: base,
        reason,
    };

    let header = MeshSectionHeader::read(data, base)?;
    if header.sentinel != MESH_SENTINEL {
        return Err(invalid(format!("sentinel {:#010X}", header.sentinel)));
    }
    if !(1..=max_meshes).contains(&header.declared_count) {
        return Err(invalid(format!(
            "mesh count {} outside 1..={max_meshes}",
            header.declared_count
        )));
    }

    let (entries, error) = read_table(data, &header, quorum.max(1));
    if let Some(e) = error {
        return Err(e);
    }
    for entry in &entries {
        if entry.vertex_count == 0 || entry.face_count == 0 || entry.data_offset == 0 {
            return Err(invalid(format!("entry {} has empty counts", entry.index)));
        }
        let end = base
            .checked_add(entry.data_offset)
            .and_then(|start| start.checked_add(mesh_data_len(entry.vertex_count, entry.face_count)));
        if end.map_or(true, |end| end > data.len()) {
            return Err(invalid(format!("entry {} data runs past the archive", entry.index)));
        }
    }
    Ok(())
}

/// One interleaved vertex plus its UV pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub binormal: [f32; 3],
    pub weights: [f32; 3],
    /// Raw blend slots (indices into the mesh palette).
    pub blend_indices: [u8; 4],
    pub uv: [f32; 2],
}

/// Absolute addresses of a mesh's attribute streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamLayout {
    pub faces: usize,
    pub position: usize,
    pub normal: usize,
    pub tangent: usize,
    pub binormal: usize,
    pub weights: usize,
    pub blend_indices: usize,
    pub uv: usize,
    /// First byte after the padded UV stream.
    pub end: usize,
}

impl StreamLayout {
    fn new(faces: usize, vertices: usize, uv: usize, end: usize) -> Self {
        Self {
            faces,
            position: vertices,
            normal: vertices + 12,
            tangent: vertices + 24,
            binormal: vertices + 36,
            weights: vertices + 48,
            blend_indices: vertices + 60,
            uv,
            end,
        }
    }
}

/// A decoded mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    /// Position in the mesh table.
    pub index: usize,
    /// Default name, derived from the data offset.
    pub name: String,
    /// Data offset relative to the section base.
    pub data_offset: usize,
    pub faces: Vec<[u16; 3]>,
    pub vertices: Vec<Vertex>,
    pub palette: Vec<u32>,
    /// Skeleton indices referenced by weighted blend slots, first occurrence first.
    pub bone_indices: Vec<u32>,
    pub layout: StreamLayout,
}

impl MeshRecord {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Decode the mesh data an entry points at.
    pub fn read(data: &[u8], base: usize, entry: &MeshTableEntry) -> Result<Self> {
        let start = base + entry.data_offset;
        let truncated = |source| Error::MeshTruncated {
            index: entry.index,
            offset: start,
            source,
        };
        let mut cursor = ByteCursor::new_at(data, start).map_err(truncated)?;

        let mut faces = Vec::with_capacity(entry.face_count);
        let mut max_index = 0u16;
        for _ in 0..entry.face_count {
            let face = [
                cursor.read_u16_be().map_err(truncated)?,
                cursor.read_u16_be().map_err(truncated)?,
                cursor.read_u16_be().map_err(truncated)?,
            ];
            max_index = face.iter().copied().fold(max_index, u16::max);
            faces.push(face);
        }
        if usize::from(max_index) >= entry.vertex_count {
            return Err(Error::FaceIndexOutOfRange {
                index: entry.index,
                max: max_index,
                vertex_count: entry.vertex_count,
            });
        }
        cursor.align_from(start, SECTION_ALIGNMENT);

        let vertex_start = cursor.position();
        let mut vertices = Vec::with_capacity(entry.vertex_count);
        for _ in 0..entry.vertex_count {
            let mut vertex = Vertex {
                position: cursor.read_vec3_be().map_err(truncated)?,
                normal: cursor.read_vec3_be().map_err(truncated)?,
                tangent: cursor.read_vec3_be().map_err(truncated)?,
                binormal: cursor.read_vec3_be().map_err(truncated)?,
                weights: cursor.read_vec3_be().map_err(truncated)?,
                ..Vertex::default()
            };
            vertex
                .blend_indices
                .copy_from_slice(cursor.read_bytes(4).map_err(truncated)?);
            vertices.push(vertex);
        }

        let uv_start = cursor.position();
        for vertex in &mut vertices {
            vertex.uv = [
                cursor.read_f16_be().map_err(truncated)?,
                cursor.read_f16_be().map_err(truncated)?,
            ];
        }
        cursor.align_from(uv_start, SECTION_ALIGNMENT);

        let (bone_indices, unmapped) = referenced_bones(&vertices, &entry.palette);
        if unmapped > 0 {
            warn!(
                "{}",
                Error::UnmappedBlendIndices {
                    index: entry.index,
                    count: unmapped
                }
            );
        }

        Ok(Self {
            index: entry.index,
            name: format!("mesh_{:08x}", entry.data_offset),
            data_offset: entry.data_offset,
            faces,
            vertices,
            palette: entry.palette.clone(),
            bone_indices,
            layout: StreamLayout::new(start, vertex_start, uv_start, cursor.position()),
        })
    }
}

/// Map weighted blend slots through the palette.
///
/// Returns the deduplicated bone indices in first-occurrence order, and the
/// number of slots that fell outside the palette (kept raw).
fn referenced_bones(vertices: &[Vertex], palette: &[u32]) -> (Vec<u32>, usize) {
    let mut seen = FxHashSet::default();
    let mut bones = Vec::new();
    let mut unmapped = 0;

    for vertex in vertices {
        for (&slot, &weight) in vertex.blend_indices.iter().zip(&vertex.weights) {
            if weight == 0.0 {
                continue;
            }
            let bone = match palette.get(usize::from(slot)) {
                Some(&bone) => bone,
                None => {
                    unmapped += 1;
                    u32::from(slot)
                }
            };
            if seen.insert(bone) {
                bones.push(bone);
            }
        }
    }
    (bones, unmapped)
}

/// Record selection applied after the walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshOptions {
    /// Drop this many records, in archive order.
    pub skip: usize,
    /// Emit the remaining records last to first.
    pub reverse: bool,
}

/// Apply skip, then reverse. Returns `(kept, skipped)`.
pub fn apply_order<T>(mut records: Vec<T>, skip: usize, reverse: bool) -> (Vec<T>, Vec<T>) {
    let mut kept = records.split_off(skip.min(records.len()));
    if reverse {
        kept.reverse();
    }
    (kept, records)
}

/// Result of walking a mesh section.
#[derive(Debug, Default)]
pub struct MeshExtraction {
    /// Mesh count declared by the section.
    pub declared_count: usize,
    /// Records after skip and reverse.
    pub records: Vec<MeshRecord>,
    /// Records removed by skip, in archive order.
    pub skipped: Vec<MeshRecord>,
    /// Skipped entries, dropped records, and other non-fatal problems.
    pub issues: Vec<Error>,
}

/// Walk the mesh section and decode every usable record.
///
/// An unreadable section header is fatal. Individual records that fail are
/// reported in [`MeshExtraction::issues`] and the walk continues.
pub fn extract_meshes(
    data: &[u8],
    section: &SectionOffset,
    options: &MeshOptions,
) -> Result<MeshExtraction> {
    let header = MeshSectionHeader::read(data, section.offset())?;
    if header.declared_count == 0 {
        return Err(Error::SectionInvalid {
            kind: SectionKind::Mesh,
            offset: header.base,
            reason: "mesh count is zero".to_string(),
        });
    }
    debug!(
        "mesh table at {:#010X}, {} entries",
        header.table, header.declared_count
    );

    let mut issues = Vec::new();
    let (entries, stop) = read_table(data, &header, usize::MAX);
    if let Some(e) = stop {
        issues.push(e);
    }

    let mut records = Vec::with_capacity(entries.len());
    let mut previous_offset = 0;
    for entry in &entries {
        if let Some(reason) = entry.rejection(previous_offset) {
            issues.push(Error::MeshEntrySkipped {
                index: entry.index,
                reason: reason.to_string(),
            });
            continue;
        }
        previous_offset = entry.data_offset;

        match MeshRecord::read(data, header.base, entry) {
            Ok(record) => {
                debug!(
                    "mesh #{:02} {}: {} vertices, {} faces, {} bones",
                    record.index,
                    record.name,
                    record.vertex_count(),
                    record.face_count(),
                    record.bone_indices.len()
                );
                records.push(record);
            }
            Err(e) => issues.push(e),
        }
    }

    let found = records.len();
    if options.skip > found {
        issues.push(Error::SkipExceedsRecords {
            skip: options.skip,
            available: found,
        });
    }
    let (records, skipped) = apply_order(records, options.skip, options.reverse);

    for issue in &issues {
        warn!("{issue}");
    }

    Ok(MeshExtraction {
        declared_count: header.declared_count,
        records,
        skipped,
        issues,
    })
}
