//! Packing extracted meshes and bones into PLC containers.

use std::fs;
use std::path::{Path, PathBuf};

use ixtract_pak::{MeshRecord, PakExtraction, Skeleton};
use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::document::{BoneNode, MeshParamSet, PlcDocument};
use crate::Result;

/// Output shaping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlcOptions {
    /// Name meshes after the bones they reference.
    pub rename: bool,
    /// One container per mesh instead of one for all.
    pub split: bool,
}

/// A document and the file name it is written under.
#[derive(Debug, Clone, PartialEq)]
pub struct PlcContainer {
    pub file_name: String,
    pub document: PlcDocument,
}

impl PlcContainer {
    /// Serialize into `dir`, returning the written path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        fs::write(&path, self.document.to_json()?)?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}

/// Builds PLC containers for one archive.
#[derive(Debug, Clone)]
pub struct PlcWriter {
    source: String,
    options: PlcOptions,
}

impl PlcWriter {
    /// `source` is the archive file name the addresses refer to.
    pub fn new(source: impl Into<String>, options: PlcOptions) -> Self {
        Self {
            source: source.into(),
            options,
        }
    }

    /// Containers for an extraction. Bones used only by skipped meshes are masked.
    pub fn from_extraction(&self, extraction: &PakExtraction) -> Vec<PlcContainer> {
        self.build(
            &extraction.meshes,
            &extraction.skeleton,
            &extraction.bones_only_in_skipped(),
        )
    }

    /// Pack meshes with the full skeleton.
    ///
    /// Without `split` this is always exactly one container, even for zero
    /// meshes. With `split` it is one container per mesh, each carrying every bone.
    pub fn build(
        &self,
        meshes: &[MeshRecord],
        skeleton: &Skeleton,
        masked: &[usize],
    ) -> Vec<PlcContainer> {
        let bones = bone_nodes(skeleton, masked);
        let params: Vec<MeshParamSet> = meshes
            .iter()
            .map(|mesh| MeshParamSet::from_record(mesh, self.mesh_name(mesh)))
            .collect();

        if !self.options.split {
            return vec![PlcContainer {
                file_name: format!("{}.plc", self.source),
                document: PlcDocument::new(&self.source, params, bones),
            }];
        }

        params
            .into_iter()
            .enumerate()
            .map(|(i, param)| PlcContainer {
                file_name: format!("{}.{:02}.plc", self.source, i + 1),
                document: PlcDocument::new(&self.source, vec![param], bones.clone()),
            })
            .collect()
    }

    fn mesh_name(&self, mesh: &MeshRecord) -> String {
        if self.options.rename {
            derive_mesh_name(&mesh.bone_indices)
        } else {
            mesh.name.clone()
        }
    }
}

/// Name a mesh after its bone set: `mesh_b` and the sorted indices, with
/// consecutive runs collapsed (`[9, 3, 4, 5]` gives `mesh_b3-5_9`).
///
/// Meshes with the same bone set get the same name.
pub fn derive_mesh_name(bone_indices: &[u32]) -> String {
    let mut sorted = bone_indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.is_empty() {
        return "mesh_unweighted".to_string();
    }

    let mut runs: Vec<String> = Vec::new();
    let mut start = sorted[0];
    let mut end = start;
    for &index in &sorted[1..] {
        if index == end + 1 {
            end = index;
            continue;
        }
        runs.push(format_run(start, end));
        start = index;
        end = index;
    }
    runs.push(format_run(start, end));

    format!("mesh_b{}", runs.join("_"))
}

fn format_run(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

fn bone_nodes(skeleton: &Skeleton, masked: &[usize]) -> Vec<BoneNode> {
    let masked: FxHashSet<usize> = masked.iter().copied().collect();
    skeleton
        .bones()
        .iter()
        .map(|bone| {
            if masked.contains(&bone.index) {
                BoneNode::masked(bone.index)
            } else {
                BoneNode::from_record(bone)
            }
        })
        .collect()
}

/// Write every container into `dir`.
pub fn write_all(containers: &[PlcContainer], dir: &Path) -> Result<Vec<PathBuf>> {
    let paths = containers
        .iter()
        .map(|container| container.write_to(dir))
        .collect::<Result<Vec<_>>>()?;
    info!("wrote {} PLC file(s) to {}", paths.len(), dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixtract_pak::{BoneRecord, StreamLayout, Vertex};

    fn mesh(index: usize, bone_indices: Vec<u32>) -> MeshRecord {
        MeshRecord {
            index,
            name: format!("mesh_{:08x}", 0x100 * (index + 1)),
            data_offset: 0x100 * (index + 1),
            faces: vec![[0, 1, 2]],
            vertices: vec![Vertex::default(); 3],
            palette: bone_indices.clone(),
            bone_indices,
            layout: StreamLayout {
                faces: 0x1000,
                position: 0x1010,
                normal: 0x101C,
                tangent: 0x1028,
                binormal: 0x1034,
                weights: 0x1040,
                blend_indices: 0x104C,
                uv: 0x10D0,
                end: 0x10E0,
            },
        }
    }

    fn skeleton(count: usize) -> Skeleton {
        let mut matrix = [[0.0; 4]; 4];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        matrix[3] = [1.0, 2.0, 3.0, 1.0];

        Skeleton::new(
            (0..count)
                .map(|index| BoneRecord {
                    index,
                    id: index as u32,
                    name: format!("bone{index}"),
                    local_translation: [0.0; 3],
                    matrix,
                    parent: index.checked_sub(1),
                })
                .collect(),
        )
    }

    #[test]
    fn test_single_container() {
        let writer = PlcWriter::new("creature.pak", PlcOptions::default());
        let containers = writer.build(&[mesh(0, vec![0]), mesh(1, vec![1])], &skeleton(3), &[]);

        assert_eq!(containers.len(), 1);
        let doc = &containers[0].document;
        assert_eq!(containers[0].file_name, "creature.pak.plc");
        assert_eq!(doc.mesh_count, 2);
        assert_eq!(doc.bone_count, 3);
        assert_eq!(doc.shared_source, "creature.pak");
        assert_eq!(doc.mesh_param_sets[1].mesh_name, "mesh_00000200");
    }

    #[test]
    fn test_split_carries_full_skeleton() {
        let options = PlcOptions {
            rename: false,
            split: true,
        };
        let meshes: Vec<MeshRecord> = (0..3).map(|i| mesh(i, vec![i as u32])).collect();
        let containers = PlcWriter::new("a.pak", options).build(&meshes, &skeleton(5), &[]);

        assert_eq!(containers.len(), 3);
        for (i, container) in containers.iter().enumerate() {
            assert_eq!(container.file_name, format!("a.pak.{:02}.plc", i + 1));
            assert_eq!(container.document.mesh_count, 1);
            assert_eq!(container.document.bone_count, 5);
            assert_eq!(container.document.bone_node_list.len(), 5);
        }
    }

    #[test]
    fn test_zero_meshes() {
        let split = PlcOptions {
            rename: false,
            split: true,
        };
        assert!(PlcWriter::new("a.pak", split).build(&[], &skeleton(2), &[]).is_empty());

        let joined = PlcWriter::new("a.pak", PlcOptions::default()).build(&[], &skeleton(2), &[]);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].document.mesh_count, 0);
    }

    #[test]
    fn test_derive_mesh_name() {
        assert_eq!(derive_mesh_name(&[9, 3, 5, 4]), "mesh_b3-5_9");
        assert_eq!(derive_mesh_name(&[7]), "mesh_b7");
        assert_eq!(derive_mesh_name(&[2, 2, 0]), "mesh_b0_2");
        assert_eq!(derive_mesh_name(&[]), "mesh_unweighted");
    }

    #[test]
    fn test_rename_collides_on_equal_bone_sets() {
        let options = PlcOptions {
            rename: true,
            split: false,
        };
        let meshes = [mesh(0, vec![4, 1, 2]), mesh(1, vec![2, 1, 4])];
        let containers = PlcWriter::new("a.pak", options).build(&meshes, &skeleton(5), &[]);

        let names: Vec<&str> = containers[0]
            .document
            .mesh_param_sets
            .iter()
            .map(|m| m.mesh_name.as_str())
            .collect();
        assert_eq!(names, ["mesh_b1-2_4", "mesh_b1-2_4"]);
    }

    #[test]
    fn test_masked_bones() {
        let containers = PlcWriter::new("a.pak", PlcOptions::default()).build(
            &[mesh(0, vec![2])],
            &skeleton(3),
            &[1],
        );
        let bones = &containers[0].document.bone_node_list;

        assert_eq!(bones.len(), 3);
        assert_eq!(bones[1], BoneNode::masked(1));
        assert_eq!(bones[1].node_name, "unused_bone_1");
        assert_eq!(bones[2].node_name, "bone2");
        assert_eq!(bones[2].parent_index, 1);
        assert_eq!(bones[0].parent_index, -1);
        assert_eq!(bones[0].translation, [-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_json_layout() {
        let containers =
            PlcWriter::new("a.pak", PlcOptions::default()).build(&[mesh(0, vec![3, 4])], &skeleton(1), &[]);
        let json: serde_json::Value =
            serde_json::from_str(&containers[0].document.to_json().unwrap()).unwrap();

        assert_eq!(json["Document"], "Advanced Mesh Reaper Parameter List Container");
        assert_eq!(json["Version"], 102);
        assert_eq!(json["Endianness"], "Big");
        assert_eq!(json["MeshCount"], 1);

        let mesh = &json["MeshParamSets"][0];
        assert_eq!(mesh["FlipUV"], true);
        assert_eq!(mesh["UVSetLabels"][0], "UV0");
        assert_eq!(mesh["PolygonParamSets"][0]["DataType"], "UINT16");
        assert_eq!(mesh["PolygonParamSets"][0]["PolygonVertexIndexCount"], 3);
        assert_eq!(mesh["PolygonParamSets"][0]["Address"], 0x1000);

        let vertex = &mesh["VertexParamSets"][0];
        assert_eq!(vertex["UVFactors"][0], "Auto");
        assert_eq!(vertex["PositionRec"]["Stride"], 64);
        assert_eq!(vertex["TexcoordRecs"][0]["DataType"], "Half-float");
        assert_eq!(vertex["TexcoordRecs"][0]["Stride"], 4);
        assert_eq!(vertex["BlendIndexRec"]["DataType"], "UINT8");
        assert_eq!(vertex["MappingBoneIndices"]["Count"], 2);
        assert_eq!(vertex["MappingBoneIndices"]["UserDefinedIndices"][1], 4);

        assert_eq!(json["BoneNodeList"][0]["ParentIndex"], -1);
    }

    #[test]
    fn test_write_all() {
        let dir = tempfile::tempdir().unwrap();
        let options = PlcOptions {
            rename: false,
            split: true,
        };
        let containers = PlcWriter::new("a.pak", options).build(
            &[mesh(0, vec![0]), mesh(1, vec![0])],
            &skeleton(1),
            &[],
        );

        let paths = write_all(&containers, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(dir.path().join("a.pak.02.plc").exists());

        let back: PlcDocument =
            serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert_eq!(back, containers[0].document);
    }
}
