//! Bone section walking and the skeleton arena.
//!
//! Layout, relative to the section base `C`:
//!
//! ```text
//! C+0x00   header; word 0 = 0x17030000, word 4 = M
//! C+0x28   bone table, 0x1C bytes per bone:
//!          x, y, z (f32), id << 16, parent entry offset (0 = root), unknown, name offset
//! C+M      bind matrices, 16 f32 each, one per bone
//! ```
//!
//! No field stores the bone count: it is the length of the run of matrices
//! whose last column is `(0, 0, 0, 1)`.

use std::fmt::Write as _;

use ixtract_common::ByteCursor;
use log::{debug, warn};

use crate::section::{SectionKind, SectionOffset, BONE_SENTINEL};
use crate::{read_words, Error, Result};

/// Offset of the bone table from the section base.
pub const BONE_TABLE_OFFSET: usize = 0x28;

/// Size of one bone table entry.
pub const BONE_ENTRY_SIZE: usize = 0x1C;

/// Size of one bind matrix.
pub const MATRIX_SIZE: usize = 64;

const ONE: u32 = 0x3F80_0000;

/// A row-major 4x4 bind matrix.
pub type Matrix4 = [[f32; 4]; 4];

/// Resolved bone section header.
#[derive(Debug, Clone)]
pub struct BoneSectionHeader {
    pub base: usize,
    pub sentinel: u32,
    /// Absolute offset of the first bind matrix.
    pub matrices: usize,
}

impl BoneSectionHeader {
    pub fn read(data: &[u8], base: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new_at(data, base)?;
        let words: [u32; 5] = read_words(&mut cursor)?;
        Ok(Self {
            base,
            sentinel: words[0],
            matrices: base.saturating_add(words[4] as usize),
        })
    }

    /// Read the run of bind matrices. Its length is the bone count.
    pub fn read_matrices(&self, data: &[u8]) -> Vec<Matrix4> {
        let mut matrices = Vec::new();
        let Ok(mut cursor) = ByteCursor::new_at(data, self.matrices) else {
            return matrices;
        };

        while let Ok(words) = read_words::<16>(&mut cursor) {
            if words[3] != 0 || words[7] != 0 || words[11] != 0 || words[15] != ONE {
                break;
            }
            let mut matrix = [[0.0; 4]; 4];
            for (i, word) in words.into_iter().enumerate() {
                matrix[i / 4][i % 4] = f32::from_bits(word);
            }
            matrices.push(matrix);
        }
        matrices
    }
}

/// One raw bone table entry.
#[derive(Debug, Clone, Copy)]
struct BoneEntry {
    translation: [f32; 3],
    id: u32,
    parent_offset: usize,
    name_offset: usize,
}

impl BoneEntry {
    fn read(data: &[u8], at: usize) -> ixtract_common::Result<Self> {
        let words: [u32; 7] = read_words(&mut ByteCursor::new_at(data, at)?)?;
        Ok(Self {
            translation: [
                f32::from_bits(words[0]),
                f32::from_bits(words[1]),
                f32::from_bits(words[2]),
            ],
            id: words[3] >> 16,
            parent_offset: words[4] as usize,
            name_offset: words[6] as usize,
        })
    }
}

/// Structural check used by the locator: a non-empty matrix run and the
/// first `quorum` table entries readable with in-bounds references.
pub(crate) fn validate_section(data: &[u8], base: usize, quorum: usize) -> Result<()> {
    let invalid = |reason: String| Error::SectionInvalid {
        kind: SectionKind::Bone,
        offset: base,
        reason,
    };

    let header = BoneSectionHeader::read(data, base)?;
    if header.sentinel != BONE_SENTINEL {
        return Err(invalid(format!("sentinel {:#010X}", header.sentinel)));
    }
    let count = header.read_matrices(data).len();
    if count == 0 {
        return Err(invalid("no bind matrices".to_string()));
    }

    for i in 0..count.min(quorum.max(1)) {
        let entry = BoneEntry::read(data, base + BONE_TABLE_OFFSET + i * BONE_ENTRY_SIZE)?;
        if base + entry.name_offset >= data.len() {
            return Err(invalid(format!("bone {i} name is outside the archive")));
        }
        if entry.parent_offset != 0 && base + entry.parent_offset + BONE_ENTRY_SIZE > data.len() {
            return Err(invalid(format!("bone {i} parent is outside the archive")));
        }
    }
    Ok(())
}

/// A decoded bone.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneRecord {
    /// Position in the bone table.
    pub index: usize,
    /// Raw id from the table entry.
    pub id: u32,
    pub name: String,
    /// Translation stored in the table entry.
    pub local_translation: [f32; 3],
    pub matrix: Matrix4,
    /// Index of an earlier bone, or `None` for a root.
    pub parent: Option<usize>,
}

impl BoneRecord {
    /// Bind-pose translation: the translation row taken back through the
    /// rotation part, `t_i = -(row_i . row_3)`.
    pub fn bind_translation(&self) -> [f32; 3] {
        let m = &self.matrix;
        let t = [m[3][0], m[3][1], m[3][2]];
        let mut out = [0.0; 3];
        for (i, value) in out.iter_mut().enumerate() {
            *value = -(m[i][0] * t[0] + m[i][1] * t[1] + m[i][2] * t[2]);
        }
        out
    }
}

/// Bones addressed by index, with parent and child links.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<BoneRecord>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl Skeleton {
    /// Build the arena. Bones whose parent is not an earlier bone are treated as roots.
    pub fn new(bones: Vec<BoneRecord>) -> Self {
        let mut children = vec![Vec::new(); bones.len()];
        let mut roots = Vec::new();
        for (index, bone) in bones.iter().enumerate() {
            match bone.parent.filter(|&parent| parent < index) {
                Some(parent) => children[parent].push(index),
                None => roots.push(index),
            }
        }
        Self {
            bones,
            children,
            roots,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    pub fn bones(&self) -> &[BoneRecord] {
        &self.bones
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&BoneRecord> {
        self.bones.get(index)
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Render the hierarchy as an indented tree, one bone per line.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        // (bone, prefix of its line, whether it is the last of its siblings)
        let mut stack: Vec<(usize, String, Option<bool>)> = self
            .roots
            .iter()
            .rev()
            .map(|&root| (root, String::new(), None))
            .collect();

        while let Some((index, prefix, last)) = stack.pop() {
            let nested = match last {
                None => {
                    let _ = writeln!(out, "{}", self.bones[index].name);
                    prefix
                }
                Some(last) => {
                    let connector = if last { "└── " } else { "├── " };
                    let _ = writeln!(out, "{prefix}{connector}{}", self.bones[index].name);
                    format!("{prefix}{}", if last { "    " } else { "│   " })
                }
            };

            let children = &self.children[index];
            for (i, &child) in children.iter().enumerate().rev() {
                stack.push((child, nested.clone(), Some(i + 1 == children.len())));
            }
        }
        out
    }
}

/// Result of walking a bone section.
#[derive(Debug, Default)]
pub struct BoneExtraction {
    pub skeleton: Skeleton,
    /// Unreadable names and invalid parent links.
    pub issues: Vec<Error>,
}

/// Walk the bone section and build the skeleton.
///
/// The matrix run and the table it sizes are mandatory; running out of
/// bounds there is fatal. Per-bone name and parent problems are reported in
/// [`BoneExtraction::issues`].
pub fn extract_bones(data: &[u8], section: &SectionOffset) -> Result<BoneExtraction> {
    let base = section.offset();
    let header = BoneSectionHeader::read(data, base)?;
    let matrices = header.read_matrices(data);
    if matrices.is_empty() {
        return Err(Error::SectionInvalid {
            kind: SectionKind::Bone,
            offset: base,
            reason: "no bind matrices".to_string(),
        });
    }
    debug!(
        "bone matrices at {:#010X}, {} bones",
        header.matrices,
        matrices.len()
    );

    let table = base + BONE_TABLE_OFFSET;
    ByteCursor::new(data).slice_at(table, matrices.len() * BONE_ENTRY_SIZE)?;

    let mut issues = Vec::new();
    let mut bones = Vec::with_capacity(matrices.len());
    for (index, matrix) in matrices.into_iter().enumerate() {
        let entry = BoneEntry::read(data, table + index * BONE_ENTRY_SIZE)?;

        let name = match ByteCursor::new_at(data, base + entry.name_offset)
            .and_then(|mut cursor| cursor.read_cstring().map(str::to_string))
        {
            Ok(name) => name,
            Err(e) => {
                issues.push(Error::BoneNameUnavailable {
                    index,
                    reason: e.to_string(),
                });
                format!("bone_{index}")
            }
        };

        let parent = match entry.parent_offset {
            0 => None,
            offset => match BoneEntry::read(data, base + offset) {
                Ok(parent) if (parent.id as usize) < index => Some(parent.id as usize),
                Ok(parent) => {
                    issues.push(Error::BoneTreeInvalid {
                        index,
                        parent: parent.id as usize,
                    });
                    None
                }
                Err(_) => {
                    issues.push(Error::BoneParentUnreadable {
                        index,
                        offset: base + offset,
                    });
                    None
                }
            },
        };

        bones.push(BoneRecord {
            index,
            id: entry.id,
            name,
            local_translation: entry.translation,
            matrix,
            parent,
        });
    }

    for issue in &issues {
        warn!("{issue}");
    }

    Ok(BoneExtraction {
        skeleton: Skeleton::new(bones),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::Provenance;
    use crate::testdata::{chain_bones, put_bone_section, put_u32, TestBone};

    fn section(offset: usize) -> SectionOffset {
        SectionOffset::new(SectionKind::Bone, offset, Provenance::Manual)
    }

    fn archive(bones: &[TestBone]) -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        put_bone_section(&mut data, 0x40, bones);
        data
    }

    #[test]
    fn test_extract_chain() {
        let data = archive(&chain_bones());
        let out = extract_bones(&data, &section(0x40)).unwrap();
        let skeleton = &out.skeleton;

        assert!(out.issues.is_empty(), "{:?}", out.issues);
        assert_eq!(skeleton.len(), 4);
        assert_eq!(skeleton.roots(), [0]);
        assert_eq!(skeleton.children(1), [2]);

        let head = skeleton.get(3).unwrap();
        assert_eq!(head.name, "head");
        assert_eq!(head.id, 3);
        assert_eq!(head.parent, Some(2));
        assert_eq!(head.local_translation, [3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parents_precede_children() {
        let bones = vec![
            TestBone { name: "root", parent: None },
            TestBone { name: "a", parent: Some(0) },
            TestBone { name: "b", parent: Some(0) },
            TestBone { name: "c", parent: Some(2) },
        ];
        let out = extract_bones(&archive(&bones), &section(0x40)).unwrap();

        for bone in out.skeleton.bones() {
            assert!(bone.parent.map_or(true, |p| p < bone.index));
        }
        assert_eq!(out.skeleton.children(0), [1, 2]);
    }

    #[test]
    fn test_forward_parent_becomes_root() {
        let bones = vec![
            TestBone { name: "root", parent: None },
            TestBone { name: "early", parent: Some(2) },
            TestBone { name: "late", parent: Some(0) },
        ];
        let out = extract_bones(&archive(&bones), &section(0x40)).unwrap();

        assert_eq!(out.skeleton.get(1).unwrap().parent, None);
        assert_eq!(out.skeleton.roots(), [0, 1]);
        assert!(matches!(
            out.issues.as_slice(),
            [Error::BoneTreeInvalid { index: 1, parent: 2 }]
        ));
    }

    #[test]
    fn test_bind_translation() {
        let out = extract_bones(&archive(&chain_bones()), &section(0x40)).unwrap();
        assert_eq!(out.skeleton.get(0).unwrap().bind_translation(), [-1.0, -2.0, -3.0]);
        assert_eq!(out.skeleton.get(2).unwrap().bind_translation(), [-3.0, -2.0, -3.0]);
    }

    #[test]
    fn test_bind_translation_applies_rotation() {
        let bone = BoneRecord {
            index: 0,
            id: 0,
            name: "r".to_string(),
            local_translation: [0.0; 3],
            // 90 degrees about Z.
            matrix: [
                [0.0, 1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [4.0, 5.0, 6.0, 1.0],
            ],
            parent: None,
        };
        assert_eq!(bone.bind_translation(), [-5.0, 4.0, -6.0]);
    }

    #[test]
    fn test_bad_name_falls_back() {
        let mut data = archive(&chain_bones());
        // Name offset of bone 1 now points past the end.
        put_u32(&mut data, 0x40 + BONE_TABLE_OFFSET + BONE_ENTRY_SIZE + 24, 0x00FF_FFFF);

        let out = extract_bones(&data, &section(0x40)).unwrap();
        assert_eq!(out.skeleton.get(1).unwrap().name, "bone_1");
        assert!(matches!(
            out.issues.as_slice(),
            [Error::BoneNameUnavailable { index: 1, .. }]
        ));
    }

    #[test]
    fn test_missing_matrices_is_fatal() {
        let mut data = archive(&chain_bones());
        let header = BoneSectionHeader::read(&data, 0x40).unwrap();
        data[header.matrices + 60..header.matrices + 64].fill(0);

        assert!(matches!(
            extract_bones(&data, &section(0x40)),
            Err(Error::SectionInvalid { kind: SectionKind::Bone, .. })
        ));
    }

    #[test]
    fn test_matrix_run_stops_at_end_of_buffer() {
        let data = archive(&chain_bones());
        let header = BoneSectionHeader::read(&data, 0x40).unwrap();
        let cut = header.matrices + 2 * MATRIX_SIZE + 10;

        assert_eq!(header.read_matrices(&data[..cut]).len(), 2);
    }

    #[test]
    fn test_render_tree() {
        let bones = vec![
            TestBone { name: "root", parent: None },
            TestBone { name: "a", parent: Some(0) },
            TestBone { name: "b", parent: Some(0) },
            TestBone { name: "c", parent: Some(1) },
        ];
        let out = extract_bones(&archive(&bones), &section(0x40)).unwrap();

        assert_eq!(
            out.skeleton.render_tree(),
            "root\n├── a\n│   └── c\n└── b\n"
        );
    }

    #[test]
    fn test_render_deep_chain() {
        let depth = 2000;
        let bones: Vec<BoneRecord> = (0..depth)
            .map(|index| BoneRecord {
                index,
                id: index as u32,
                name: format!("b{index}"),
                local_translation: [0.0; 3],
                matrix: [[0.0; 4]; 4],
                parent: index.checked_sub(1),
            })
            .collect();

        let tree = Skeleton::new(bones).render_tree();
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines.len(), depth);
        assert_eq!(lines[0], "b0");
        assert_eq!(lines[2], "    └── b2");
        assert_eq!(
            lines[depth - 1],
            format!("{}└── b{}", "    ".repeat(depth - 2), depth - 1)
        );
    }

    #[test]
    fn test_self_parent_becomes_root() {
        let bone = |index: usize, parent: Option<usize>| BoneRecord {
            index,
            id: index as u32,
            name: format!("b{index}"),
            local_translation: [0.0; 3],
            matrix: [[0.0; 4]; 4],
            parent,
        };
        let skeleton = Skeleton::new(vec![bone(0, Some(0)), bone(1, Some(0)), bone(2, Some(5))]);

        assert_eq!(skeleton.roots(), [0, 2]);
        assert_eq!(skeleton.children(0), [1]);
        assert_eq!(skeleton.render_tree(), "b0\n└── b1\nb2\n");
    }

    #[test]
    fn test_validate_section() {
        let data = archive(&chain_bones());

        assert!(validate_section(&data, 0x40, 3).is_ok());
        assert!(validate_section(&data, 0x30, 3).is_err());
    }
}
