//! Container header emission and inspection.

use ixtract_common::ByteCursor;
use zerocopy::IntoBytes;

use crate::header::{
    mipmap_size, DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FourCC, DDSD_LINEARSIZE, DDSD_PITCH,
};
use crate::{Error, Result, DDS_MAGIC};

/// Block-compressed encodings that fit a legacy FourCC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    /// BC1, 8 bytes per 4x4 block.
    Bc1,
    /// BC3, 16 bytes per 4x4 block.
    Bc3,
}

impl BlockFormat {
    /// Bytes per 4x4 block.
    pub fn block_size(self) -> usize {
        match self {
            BlockFormat::Bc1 => 8,
            BlockFormat::Bc3 => 16,
        }
    }

    /// FourCC written into the pixel format.
    pub fn four_cc(self) -> FourCC {
        match self {
            BlockFormat::Bc1 => FourCC::DXT1,
            BlockFormat::Bc3 => FourCC::DXT5,
        }
    }
}

/// Header for a block-compressed texture: magic plus the 124-byte header.
///
/// Fails when the dimensions are not multiples of the block size.
pub fn block_compressed_header(
    format: BlockFormat,
    width: u32,
    height: u32,
    mipmap_count: u32,
) -> Result<Vec<u8>> {
    if width % 4 != 0 || height % 4 != 0 {
        return Err(Error::UnalignedDimensions { width, height });
    }

    let linear_size = mipmap_size(width, height, format.block_size()) as u32;
    let header = DdsHeader::texture_2d(
        width,
        height,
        mipmap_count,
        DDSD_LINEARSIZE,
        linear_size,
        DdsPixelFormat::four_cc(format.four_cc()),
    );

    let mut output = Vec::with_capacity(BLOCK_HEADER_LEN);
    output.extend_from_slice(DDS_MAGIC);
    output.extend_from_slice(header.as_bytes());
    Ok(output)
}

/// Header for an uncompressed R8G8B8A8 texture: magic, header and DX10 extension.
pub fn rgba8_header(width: u32, height: u32, mipmap_count: u32) -> Vec<u8> {
    let header = DdsHeader::texture_2d(
        width,
        height,
        mipmap_count,
        DDSD_PITCH,
        width * 4,
        DdsPixelFormat::four_cc(FourCC::DX10),
    );
    let dx10 = DdsHeaderDxt10::texture_2d(DdsHeaderDxt10::R8G8B8A8_UNORM);

    let mut output = Vec::with_capacity(DX10_HEADER_LEN);
    output.extend_from_slice(DDS_MAGIC);
    output.extend_from_slice(header.as_bytes());
    output.extend_from_slice(dx10.as_bytes());
    output
}

/// Length of a legacy container header (magic + header).
pub const BLOCK_HEADER_LEN: usize = 4 + DdsHeader::SIZE as usize;

/// Length of a container header with the DX10 extension.
pub const DX10_HEADER_LEN: usize = BLOCK_HEADER_LEN + std::mem::size_of::<DdsHeaderDxt10>();

/// Parse the headers at the start of a DDS file.
///
/// Returns the main header, the DX10 extension when present, and the offset
/// at which pixel data begins.
pub fn parse_header(data: &[u8]) -> Result<(DdsHeader, Option<DdsHeaderDxt10>, usize)> {
    let mut reader = ByteCursor::new(data);

    let magic: [u8; 4] = reader.read_struct()?;
    if &magic != DDS_MAGIC {
        return Err(Error::InvalidMagic(magic));
    }

    let header: DdsHeader = reader.read_struct()?;
    let dx10 = if header.is_dx10() {
        Some(reader.read_struct::<DdsHeaderDxt10>()?)
    } else {
        None
    };

    Ok((header, dx10, reader.position()))
}
