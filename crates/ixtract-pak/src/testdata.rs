//! Synthetic archive builders shared by the unit tests.

use crate::archive::{PAK_MODEL_TAG, PAK_PREFIX};
use crate::section::{BONE_SENTINEL, MESH_SENTINEL};

pub(crate) fn put_u32(data: &mut Vec<u8>, at: usize, value: u32) {
    grow(data, at + 4);
    data[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

fn put_f32(data: &mut Vec<u8>, at: usize, value: f32) {
    put_u32(data, at, value.to_bits());
}

fn put_bytes(data: &mut Vec<u8>, at: usize, bytes: &[u8]) {
    grow(data, at + bytes.len());
    data[at..at + bytes.len()].copy_from_slice(bytes);
}

fn grow(data: &mut Vec<u8>, len: usize) {
    if data.len() < len {
        data.resize(len, 0);
    }
}

const fn align16(value: usize) -> usize {
    (value + 15) & !15
}

/// Model PAK file header pointing at an entry table.
pub(crate) fn pak_header(entry_table: u32, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    for (i, word) in [PAK_PREFIX, PAK_MODEL_TAG, 0x0001_0002, entry_table, 0x20]
        .into_iter()
        .enumerate()
    {
        put_u32(&mut data, i * 4, word);
    }
    data
}

/// Write an entry table advertising the two sections.
pub(crate) fn put_entry_table(data: &mut Vec<u8>, at: usize, mesh: usize, bone: usize) {
    for (i, word) in [mesh as u32, 0, bone as u32, 0, 0x20].into_iter().enumerate() {
        put_u32(data, at + i * 4, word);
    }
}

/// One synthetic mesh.
///
/// Vertex `i` is weighted fully to blend slot `i % palette_run`, and the
/// palette covers bones `first_bone..first_bone + palette_run`. Face `i` is
/// `(i, i + 1, i + 2)` modulo the vertex count.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TestMesh {
    pub first_bone: u16,
    pub palette_run: u16,
    pub vertices: u16,
    pub faces: u16,
}

impl TestMesh {
    pub(crate) const fn new(first_bone: u16, palette_run: u16) -> Self {
        Self {
            first_bone,
            palette_run,
            vertices: 4,
            faces: 2,
        }
    }
}

const MESH_LIST: usize = 0x30;
const MESH_TABLE_POINTER: usize = 0x40;
const MESH_TABLE: usize = 0x50;
const MESH_ENTRY: usize = 0x40;

/// Write a mesh section at `base`; returns the section length.
pub(crate) fn put_mesh_section(data: &mut Vec<u8>, base: usize, meshes: &[TestMesh]) -> usize {
    put_u32(data, base, MESH_SENTINEL);
    put_u32(data, base + 10 * 4, MESH_LIST as u32);
    put_u32(data, base + MESH_LIST, MESH_TABLE_POINTER as u32);
    put_u32(data, base + MESH_LIST + 4, (meshes.len() as u32) << 16);
    put_u32(data, base + MESH_TABLE_POINTER, (MESH_TABLE + 16) as u32);

    let mut data_offset = align16(MESH_TABLE + meshes.len() * MESH_ENTRY);
    for (i, mesh) in meshes.iter().enumerate() {
        let entry = base + MESH_TABLE + i * MESH_ENTRY;
        put_u32(
            data,
            entry,
            (u32::from(mesh.first_bone) << 16) | u32::from(mesh.palette_run),
        );
        put_u32(data, entry + 4, 0);
        let header = entry + 16;
        put_u32(
            data,
            header,
            (u32::from(mesh.faces) * 3) << 16 | u32::from(mesh.vertices),
        );
        put_u32(data, header + 4, data_offset as u32);

        data_offset += put_mesh_data(data, base + data_offset, mesh);
    }
    data_offset
}

fn put_mesh_data(data: &mut Vec<u8>, start: usize, mesh: &TestMesh) -> usize {
    let v = usize::from(mesh.vertices);
    let mut at = start;

    for face in 0..usize::from(mesh.faces) {
        for corner in 0..3 {
            let index = ((face + corner) % v) as u16;
            put_bytes(data, at, &index.to_be_bytes());
            at += 2;
        }
    }
    at = start + align16(at - start);

    for i in 0..v {
        let vertex = at + i * 64;
        put_f32(data, vertex, i as f32);
        put_f32(data, vertex + 12 + 8, 1.0);
        put_f32(data, vertex + 48, 1.0);
        let slot = (i % usize::from(mesh.palette_run.max(1))) as u8;
        put_bytes(data, vertex + 60, &[slot, 0, 0, 0]);
    }
    at += v * 64;

    let uv = at;
    for _ in 0..v {
        // 0.5 and 1.0 as IEEE half floats.
        put_bytes(data, at, &[0x38, 0x00, 0x3C, 0x00]);
        at += 4;
    }
    at = uv + align16(at - uv);
    grow(data, at);
    at - start
}

/// One synthetic bone; `parent` is a bone index.
#[derive(Debug, Clone)]
pub(crate) struct TestBone {
    pub name: &'static str,
    pub parent: Option<usize>,
}

const BONE_TABLE: usize = 0x28;
const BONE_ENTRY: usize = 0x1C;

/// Write a bone section at `base`; returns the section length.
///
/// Bone `i` has bind matrix rows `I` and translation row `(1 + i, 2, 3)`.
pub(crate) fn put_bone_section(data: &mut Vec<u8>, base: usize, bones: &[TestBone]) -> usize {
    put_u32(data, base, BONE_SENTINEL);

    let names_start = BONE_TABLE + bones.len() * BONE_ENTRY;
    let mut name_at = names_start;
    for (i, bone) in bones.iter().enumerate() {
        let entry = base + BONE_TABLE + i * BONE_ENTRY;
        put_f32(data, entry, i as f32);
        put_u32(data, entry + 12, (i as u32) << 16);
        let parent = bone
            .parent
            .map_or(0, |p| (BONE_TABLE + p * BONE_ENTRY) as u32);
        put_u32(data, entry + 16, parent);
        put_u32(data, entry + 24, name_at as u32);

        put_bytes(data, base + name_at, bone.name.as_bytes());
        put_bytes(data, base + name_at + bone.name.len(), &[0]);
        name_at += bone.name.len() + 1;
    }

    let matrices = align16(name_at);
    put_u32(data, base + 16, matrices as u32);
    for i in 0..bones.len() {
        let m = base + matrices + i * 64;
        for row in 0..3 {
            put_f32(data, m + row * 16 + row * 4, 1.0);
        }
        put_f32(data, m + 48, 1.0 + i as f32);
        put_f32(data, m + 52, 2.0);
        put_f32(data, m + 56, 3.0);
        put_f32(data, m + 60, 1.0);
    }
    // A zeroed block ends the matrix run.
    let end = matrices + bones.len() * 64 + 64;
    grow(data, base + end);
    end
}

/// A four-bone chain: root, spine, neck, head.
pub(crate) fn chain_bones() -> Vec<TestBone> {
    ["root", "spine", "neck", "head"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| TestBone {
            name,
            parent: i.checked_sub(1),
        })
        .collect()
}
