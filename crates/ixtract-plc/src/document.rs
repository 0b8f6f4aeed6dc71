//! The PLC document model.
//!
//! Field names serialize in PascalCase; a few acronyms are spelled out with
//! explicit renames (`FlipUV`, `UVSetCount`, ...).

use ixtract_pak::{BoneRecord, MeshRecord, StreamLayout, UV_STRIDE, VERTEX_STRIDE};
use log::warn;
use serde::{Deserialize, Serialize};

/// Value of the `Document` field.
pub const DOCUMENT_KIND: &str = "Advanced Mesh Reaper Parameter List Container";

/// Value of the `Version` field.
pub const DOCUMENT_VERSION: u32 = 102;

/// Bone influences stored per vertex.
pub const BONES_PER_VERTEX: u32 = 3;

/// Byte order of the addressed archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Big,
    Little,
}

/// Element type of an addressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Float,
    #[serde(rename = "Half-float")]
    HalfFloat,
    #[serde(rename = "UINT8")]
    Uint8,
    #[serde(rename = "UINT16")]
    Uint16,
}

/// Primitive layout of an index stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Triangle,
}

/// A top-level PLC document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlcDocument {
    pub document: String,
    pub version: u32,
    pub endianness: Endianness,
    /// File name of the archive the addresses point into.
    pub shared_source: String,
    pub mesh_count: usize,
    pub mesh_param_sets: Vec<MeshParamSet>,
    pub bone_count: usize,
    pub bone_node_list: Vec<BoneNode>,
}

impl PlcDocument {
    pub fn new(shared_source: &str, meshes: Vec<MeshParamSet>, bones: Vec<BoneNode>) -> Self {
        Self {
            document: DOCUMENT_KIND.to_string(),
            version: DOCUMENT_VERSION,
            endianness: Endianness::Big,
            shared_source: shared_source.to_string(),
            mesh_count: meshes.len(),
            mesh_param_sets: meshes,
            bone_count: bones.len(),
            bone_node_list: bones,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshParamSet {
    pub mesh_name: String,
    pub vertex_count: usize,
    pub polygon_count: usize,
    pub has_normal: bool,
    pub has_texcoord: bool,
    pub has_tangent: bool,
    pub has_binormal: bool,
    pub has_skinning_info: bool,
    #[serde(rename = "FlipUV")]
    pub flip_uv: bool,
    #[serde(rename = "UVSetCount")]
    pub uv_set_count: usize,
    #[serde(rename = "UVSetLabels")]
    pub uv_set_labels: Vec<String>,
    pub vertex_param_set_count: usize,
    pub polygon_param_set_count: usize,
    pub vertex_param_sets: Vec<VertexParamSet>,
    pub polygon_param_sets: Vec<PolygonParamSet>,
}

impl MeshParamSet {
    /// Describe a mesh record under the given output name.
    pub fn from_record(record: &MeshRecord, name: String) -> Self {
        let vertex_param_sets = vec![VertexParamSet::new(record)];
        let polygon_param_sets = vec![PolygonParamSet::triangles(record)];
        Self {
            mesh_name: name,
            vertex_count: record.vertex_count(),
            polygon_count: record.face_count(),
            has_normal: true,
            has_texcoord: true,
            has_tangent: true,
            has_binormal: true,
            has_skinning_info: true,
            flip_uv: true,
            uv_set_count: 1,
            uv_set_labels: vec!["UV0".to_string()],
            vertex_param_set_count: vertex_param_sets.len(),
            polygon_param_set_count: polygon_param_sets.len(),
            vertex_param_sets,
            polygon_param_sets,
        }
    }
}

/// Address, stride and element type of one attribute stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamRec {
    pub address: usize,
    pub stride: usize,
    pub data_type: DataType,
}

impl StreamRec {
    const fn vertex(address: usize, data_type: DataType) -> Self {
        Self {
            address,
            stride: VERTEX_STRIDE,
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VertexParamSet {
    pub vertex_count: usize,
    pub per_vertex_bone_count: u32,
    pub has_bone_index_mapping: bool,
    pub use_user_defined_indices: bool,
    #[serde(rename = "UVFactors")]
    pub uv_factors: Vec<String>,
    pub position_rec: StreamRec,
    pub normal_rec: StreamRec,
    pub texcoord_recs: Vec<StreamRec>,
    pub tangent_rec: StreamRec,
    pub binormal_rec: StreamRec,
    pub blend_weight_rec: StreamRec,
    pub blend_index_rec: StreamRec,
    pub mapping_bone_indices: MappingBoneIndices,
}

impl VertexParamSet {
    fn new(record: &MeshRecord) -> Self {
        let StreamLayout {
            position,
            normal,
            tangent,
            binormal,
            weights,
            blend_indices,
            uv,
            ..
        } = record.layout;

        Self {
            vertex_count: record.vertex_count(),
            per_vertex_bone_count: BONES_PER_VERTEX,
            has_bone_index_mapping: true,
            use_user_defined_indices: true,
            uv_factors: vec!["Auto".to_string()],
            position_rec: StreamRec::vertex(position, DataType::Float),
            normal_rec: StreamRec::vertex(normal, DataType::Float),
            texcoord_recs: vec![StreamRec {
                address: uv,
                stride: UV_STRIDE,
                data_type: DataType::HalfFloat,
            }],
            tangent_rec: StreamRec::vertex(tangent, DataType::Float),
            binormal_rec: StreamRec::vertex(binormal, DataType::Float),
            blend_weight_rec: StreamRec::vertex(weights, DataType::Float),
            blend_index_rec: StreamRec::vertex(blend_indices, DataType::Uint8),
            mapping_bone_indices: MappingBoneIndices {
                count: record.palette.len(),
                user_defined_indices: record.palette.clone(),
            },
        }
    }
}

/// The blend-slot to skeleton mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MappingBoneIndices {
    pub count: usize,
    pub user_defined_indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolygonParamSet {
    pub decoded_polygon_count: usize,
    pub polygon_vertex_index_count: usize,
    pub address: usize,
    pub data_type: DataType,
    pub encoding: Encoding,
}

impl PolygonParamSet {
    fn triangles(record: &MeshRecord) -> Self {
        Self {
            decoded_polygon_count: record.face_count(),
            polygon_vertex_index_count: record.face_count() * 3,
            address: record.layout.faces,
            data_type: DataType::Uint16,
            encoding: Encoding::Triangle,
        }
    }
}

/// One skeleton node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoneNode {
    pub node_name: String,
    pub node_index: usize,
    /// -1 for roots.
    pub parent_index: i64,
    /// Non-finite components serialize as `null`.
    pub translation: [f32; 3],
}

impl BoneNode {
    pub fn from_record(bone: &BoneRecord) -> Self {
        let translation = bone.bind_translation();
        if !translation.iter().all(|t| t.is_finite()) {
            warn!(
                "bone #{} {}: bind translation {:?} is not finite and will be written as null",
                bone.index, bone.name, translation
            );
        }
        Self {
            node_name: bone.name.clone(),
            node_index: bone.index,
            parent_index: bone.parent.map_or(-1, |p| p as i64),
            translation,
        }
    }

    /// Placeholder for a bone no emitted mesh uses.
    pub fn masked(index: usize) -> Self {
        Self {
            node_name: format!("unused_bone_{index}"),
            node_index: index,
            parent_index: -1,
            translation: [0.0; 3],
        }
    }
}
