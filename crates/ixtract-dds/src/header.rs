//! DDS header structures.
//!
//! Fields use explicit little-endian wrappers so the structs can be written
//! out byte-for-byte with [`IntoBytes::as_bytes`] regardless of host order.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Header carries capability flags.
pub const DDSD_CAPS: u32 = 0x0000_0001;
/// Header carries a height.
pub const DDSD_HEIGHT: u32 = 0x0000_0002;
/// Header carries a width.
pub const DDSD_WIDTH: u32 = 0x0000_0004;
/// `pitch_or_linear_size` is a row pitch.
pub const DDSD_PITCH: u32 = 0x0000_0008;
/// Header carries a pixel format.
pub const DDSD_PIXELFORMAT: u32 = 0x0000_1000;
/// `mipmap_count` is meaningful.
pub const DDSD_MIPMAPCOUNT: u32 = 0x0002_0000;
/// `pitch_or_linear_size` is the size of the top level.
pub const DDSD_LINEARSIZE: u32 = 0x0008_0000;

/// Pixel format uses a four-character code.
pub const DDPF_FOURCC: u32 = 0x0000_0004;

/// Surface has more than one attached surface.
pub const DDSCAPS_COMPLEX: u32 = 0x0000_0008;
/// Surface is a texture.
pub const DDSCAPS_TEXTURE: u32 = 0x0000_1000;
/// Surface has mipmaps.
pub const DDSCAPS_MIPMAP: u32 = 0x0040_0000;

/// DDS file header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DdsHeader {
    /// Header size (should be 124).
    pub size: U32,
    /// Header flags.
    pub flags: U32,
    /// Image height.
    pub height: U32,
    /// Image width.
    pub width: U32,
    /// Pitch or linear size.
    pub pitch_or_linear_size: U32,
    /// Depth (for volume textures).
    pub depth: U32,
    /// Number of mipmap levels.
    pub mipmap_count: U32,
    /// Reserved.
    pub reserved1: [U32; 11],
    /// Pixel format.
    pub pixel_format: DdsPixelFormat,
    /// Surface capabilities.
    pub caps: U32,
    /// Surface capabilities 2.
    pub caps2: U32,
    /// Surface capabilities 3.
    pub caps3: U32,
    /// Surface capabilities 4.
    pub caps4: U32,
    /// Reserved.
    pub reserved2: U32,
}

impl DdsHeader {
    /// Expected header size.
    pub const SIZE: u32 = 124;

    /// A 2D texture header with the given layout and pixel format.
    pub fn texture_2d(
        width: u32,
        height: u32,
        mipmap_count: u32,
        size_flag: u32,
        pitch_or_linear_size: u32,
        pixel_format: DdsPixelFormat,
    ) -> Self {
        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | size_flag;
        let mut caps = DDSCAPS_TEXTURE;
        if mipmap_count > 1 {
            flags |= DDSD_MIPMAPCOUNT;
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
        }

        Self {
            size: U32::new(Self::SIZE),
            flags: U32::new(flags),
            height: U32::new(height),
            width: U32::new(width),
            pitch_or_linear_size: U32::new(pitch_or_linear_size),
            depth: U32::new(1),
            mipmap_count: U32::new(mipmap_count),
            reserved1: [U32::ZERO; 11],
            pixel_format,
            caps: U32::new(caps),
            caps2: U32::ZERO,
            caps3: U32::ZERO,
            caps4: U32::ZERO,
            reserved2: U32::ZERO,
        }
    }

    /// Check if this is a DX10 extended header.
    pub fn is_dx10(&self) -> bool {
        self.pixel_format.four_cc == FourCC::DX10
    }
}

/// DDS pixel format.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DdsPixelFormat {
    /// Structure size (should be 32).
    pub size: U32,
    /// Pixel format flags.
    pub flags: U32,
    /// Four-character code for compression.
    pub four_cc: FourCC,
    /// Number of bits per pixel (for uncompressed).
    pub rgb_bit_count: U32,
    /// Red bit mask.
    pub r_bit_mask: U32,
    /// Green bit mask.
    pub g_bit_mask: U32,
    /// Blue bit mask.
    pub b_bit_mask: U32,
    /// Alpha bit mask.
    pub a_bit_mask: U32,
}

impl DdsPixelFormat {
    /// Expected structure size.
    pub const SIZE: u32 = 32;

    /// A pixel format identified only by its four-character code.
    pub fn four_cc(four_cc: FourCC) -> Self {
        Self {
            size: U32::new(Self::SIZE),
            flags: U32::new(DDPF_FOURCC),
            four_cc,
            rgb_bit_count: U32::ZERO,
            r_bit_mask: U32::ZERO,
            g_bit_mask: U32::ZERO,
            b_bit_mask: U32::ZERO,
            a_bit_mask: U32::ZERO,
        }
    }
}

/// Four-character code for compression type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// DXT1 compression.
    pub const DXT1: Self = Self(*b"DXT1");
    /// DXT5 compression.
    pub const DXT5: Self = Self(*b"DXT5");
    /// DX10 extended header.
    pub const DX10: Self = Self(*b"DX10");
}

/// DX10 extended header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DdsHeaderDxt10 {
    /// DXGI format.
    pub dxgi_format: U32,
    /// Resource dimension.
    pub resource_dimension: U32,
    /// Misc flags.
    pub misc_flag: U32,
    /// Array size.
    pub array_size: U32,
    /// Misc flags 2.
    pub misc_flags2: U32,
}

impl DdsHeaderDxt10 {
    /// R8G8B8A8 UNORM format.
    pub const R8G8B8A8_UNORM: u32 = 0x1C;
    /// `D3D10_RESOURCE_DIMENSION_TEXTURE2D`.
    pub const TEXTURE_2D: u32 = 3;

    /// A single 2D texture of the given DXGI format.
    pub fn texture_2d(dxgi_format: u32) -> Self {
        Self {
            dxgi_format: U32::new(dxgi_format),
            resource_dimension: U32::new(Self::TEXTURE_2D),
            misc_flag: U32::ZERO,
            array_size: U32::new(1),
            misc_flags2: U32::ZERO,
        }
    }
}

/// Calculate the size in bytes of a block-compressed mipmap level.
pub fn mipmap_size(width: u32, height: u32, block_size: usize) -> usize {
    let blocks_x = (width as usize).div_ceil(4);
    let blocks_y = (height as usize).div_ceil(4);
    blocks_x.max(1) * blocks_y.max(1) * block_size
}
