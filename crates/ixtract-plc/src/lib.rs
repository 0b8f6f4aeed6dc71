//! Parameter List Container (PLC) emission.
//!
//! A PLC document does not carry geometry. It records where each attribute
//! stream of each mesh lives inside the source archive (address, stride,
//! element type) plus the skeleton, so an external mesh tool can read the
//! archive directly.

mod document;
mod error;
mod writer;

pub use document::{
    BoneNode, DataType, Encoding, Endianness, MappingBoneIndices, MeshParamSet, PlcDocument,
    PolygonParamSet, StreamRec, VertexParamSet, BONES_PER_VERTEX, DOCUMENT_KIND,
    DOCUMENT_VERSION,
};
pub use error::{Error, Result};
pub use writer::{derive_mesh_name, write_all, PlcContainer, PlcOptions, PlcWriter};
