//! Pixel format tags and the static codec table.

use std::fmt;

use ixtract_dds::BlockFormat;

/// A decoded pixel format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 32-bit RGBA stored in the console's swizzled layout.
    Rgba8Swizzled,
    /// BC1 block compression.
    Bc1,
    /// BC3 block compression.
    Bc3,
    /// A tag missing from the codec table.
    Unknown(u8),
}

/// One row of the codec table.
struct CodecEntry {
    tag: u8,
    format: TextureFormat,
}

/// Every pixel format tag this tool knows how to wrap.
static CODECS: &[CodecEntry] = &[
    CodecEntry { tag: 0x85, format: TextureFormat::Rgba8Swizzled },
    CodecEntry { tag: 0x86, format: TextureFormat::Bc1 },
    CodecEntry { tag: 0xA6, format: TextureFormat::Bc1 },
    CodecEntry { tag: 0x88, format: TextureFormat::Bc3 },
];

impl TextureFormat {
    /// Look a tag up in the codec table.
    pub fn from_tag(tag: u8) -> Self {
        CODECS
            .iter()
            .find(|entry| entry.tag == tag)
            .map_or(TextureFormat::Unknown(tag), |entry| entry.format)
    }

    /// Whether the format is in the codec table.
    pub fn is_known(self) -> bool {
        !matches!(self, TextureFormat::Unknown(_))
    }

    /// The block format, for block-compressed encodings.
    pub fn block_format(self) -> Option<BlockFormat> {
        match self {
            TextureFormat::Bc1 => Some(BlockFormat::Bc1),
            TextureFormat::Bc3 => Some(BlockFormat::Bc3),
            _ => None,
        }
    }

    /// Size of the top mip level in bytes, if the format is known.
    pub fn base_size(self, width: u32, height: u32) -> Option<usize> {
        let pixels = width as usize * height as usize;
        match self {
            TextureFormat::Rgba8Swizzled => Some(pixels * 4),
            TextureFormat::Bc1 => Some(pixels / 2),
            TextureFormat::Bc3 => Some(pixels),
            TextureFormat::Unknown(_) => None,
        }
    }

    /// Total payload size and the number of mip levels a DDS reader can use.
    ///
    /// Every declared level contributes to the payload size (each a quarter of
    /// the previous one), but levels that shrink below a whole block (or to
    /// zero pixels) are not counted as usable.
    pub fn mip_chain(self, width: u32, height: u32, declared_levels: u8) -> Option<MipChain> {
        let base = self.base_size(width, height)?;
        let min_edge = if self.block_format().is_some() { 4 } else { 1 };

        let mut total = base;
        let mut level_size = base;
        let (mut w, mut h) = (width, height);
        let mut usable = 0;

        for level in 0..declared_levels {
            if level != 0 {
                level_size /= 4;
                w /= 2;
                h /= 2;
                total += level_size;
            }
            if w >= min_edge && h >= min_edge {
                usable += 1;
            }
        }

        Some(MipChain {
            payload_len: total,
            usable_levels: usable,
        })
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureFormat::Rgba8Swizzled => f.write_str("R8G8B8A8"),
            TextureFormat::Bc1 => f.write_str("BC1"),
            TextureFormat::Bc3 => f.write_str("BC3"),
            TextureFormat::Unknown(tag) => write!(f, "UNK{tag:02X}"),
        }
    }
}

/// Payload size of a full mip chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipChain {
    /// Bytes covered by all declared levels.
    pub payload_len: usize,
    /// Levels with valid dimensions for the container header.
    pub usable_levels: u32,
}
