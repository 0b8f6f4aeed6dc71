//! BLH bundle header parsing.
//!
//! A `.blh` file describes the textures stored back to back in its paired
//! `.bli` payload file. Layout (big-endian):
//! - 32 bytes: prefix `0x040E0000`, unknown, string table offset, unknown,
//!   texture count, unknown, two padding words
//! - count × 28 bytes: one [`TextureRecord`] per texture
//! - at the string table offset: count × absolute pointers to NUL-terminated names

use std::fmt::Write as _;
use std::ops::Range;

use ixtract_common::ByteCursor;
use log::{debug, warn};
use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::format::TextureFormat;
use crate::{Error, Result};

/// Expected value of the first header word.
pub const BLH_PREFIX: u32 = 0x040E_0000;

/// Raw bundle header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct BundleHeaderRaw {
    pub prefix: U32,
    pub unk0: U32,
    pub string_table: U32,
    pub unk1: U32,
    pub count: U32,
    pub unk2: U32,
    pub padding: [U32; 2],
}

/// Raw per-texture record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct TextureRecord {
    /// Absolute offset of the payload in the `.bli` file.
    pub payload_offset: U32,
    pub unk0: U32,
    pub unk1: U32,
    pub unk2: U32,
    pub width: U16,
    pub height: U16,
    pub unk3: U16,
    /// Pixel format tag.
    pub format: u8,
    /// Declared mip level count.
    pub mip_levels: u8,
    pub unk4: U32,
}

/// Size of [`BundleHeaderRaw`] on disk.
pub const BUNDLE_HEADER_SIZE: usize = std::mem::size_of::<BundleHeaderRaw>();

/// Size of [`TextureRecord`] on disk.
pub const TEXTURE_RECORD_SIZE: usize = std::mem::size_of::<TextureRecord>();

/// One texture described by the bundle header.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Position in the header table.
    pub index: usize,
    /// Name from the string table, or the hex payload offset.
    pub name: String,
    /// Byte address into the payload buffer.
    pub offset: usize,
    /// Payload length; `None` when the format is unknown and the length has
    /// to be inferred from the neighbouring descriptors.
    pub length: Option<usize>,
    /// Raw format tag.
    pub format_tag: u8,
    /// Decoded format.
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Mip levels declared by the record.
    pub declared_mips: u8,
    /// Mip levels usable in a container header.
    pub usable_mips: u32,
    /// The record as read from disk.
    pub record: TextureRecord,
}

impl TextureDescriptor {
    fn from_record(index: usize, record: TextureRecord) -> Self {
        let offset = record.payload_offset.get() as usize;
        let width = u32::from(record.width.get());
        let height = u32::from(record.height.get());
        let format = TextureFormat::from_tag(record.format);
        let chain = format.mip_chain(width, height, record.mip_levels);

        Self {
            index,
            name: default_name(offset),
            offset,
            length: chain.map(|c| c.payload_len),
            format_tag: record.format,
            format,
            width,
            height,
            declared_mips: record.mip_levels,
            usable_mips: chain.map_or(0, |c| c.usable_levels),
            record,
        }
    }
}

fn default_name(offset: usize) -> String {
    format!("{offset:#010X}")
}

/// A parsed `.blh` header.
#[derive(Debug, Clone)]
pub struct BundleHeader {
    raw: BundleHeaderRaw,
    descriptors: Vec<TextureDescriptor>,
}

impl BundleHeader {
    /// Parse a header buffer.
    ///
    /// Fails with [`Error::HeaderCorrupt`] when the fixed header is missing or
    /// wrong, or when the declared record table exceeds the buffer. Problems
    /// with the name table are logged and returned by [`Self::parse_with_warnings`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_warnings(data).map(|(header, _)| header)
    }

    /// Parse a header buffer, also returning non-fatal naming warnings.
    pub fn parse_with_warnings(data: &[u8]) -> Result<(Self, Vec<Error>)> {
        if data.len() < BUNDLE_HEADER_SIZE {
            return Err(Error::HeaderCorrupt(format!(
                "{} bytes is smaller than the {BUNDLE_HEADER_SIZE}-byte bundle header",
                data.len()
            )));
        }

        let mut reader = ByteCursor::new(data);
        let raw: BundleHeaderRaw = reader.read_struct()?;

        if raw.prefix.get() != BLH_PREFIX {
            return Err(Error::HeaderCorrupt(format!(
                "prefix {:#010X} is not {BLH_PREFIX:#010X}",
                raw.prefix.get()
            )));
        }

        let count = raw.count.get() as usize;
        let table_end = count
            .checked_mul(TEXTURE_RECORD_SIZE)
            .and_then(|n| n.checked_add(BUNDLE_HEADER_SIZE));
        match table_end {
            Some(end) if end <= data.len() => {}
            _ => {
                return Err(Error::HeaderCorrupt(format!(
                    "{count} records of {TEXTURE_RECORD_SIZE} bytes exceed the {}-byte header",
                    data.len()
                )))
            }
        }

        let mut descriptors = Vec::with_capacity(count);
        for index in 0..count {
            let record: TextureRecord = reader.read_struct()?;
            descriptors.push(TextureDescriptor::from_record(index, record));
        }

        let mut header = Self { raw, descriptors };
        let warnings = header.resolve_names(data);
        for warning in &warnings {
            warn!("{warning}");
        }
        debug!("parsed {} texture descriptors", header.descriptors.len());

        Ok((header, warnings))
    }

    /// Attach names from the string table. Failures keep the default name.
    fn resolve_names(&mut self, data: &[u8]) -> Vec<Error> {
        let table = self.raw.string_table.get() as usize;
        let count = self.descriptors.len();
        if count == 0 {
            return Vec::new();
        }

        let mut reader = match ByteCursor::new_at(data, table) {
            Ok(reader) if reader.remaining() >= count * 4 => reader,
            _ => {
                return vec![Error::NameUnavailable {
                    index: 0,
                    reason: format!("string table at {table:#X} is outside the header"),
                }]
            }
        };

        let mut warnings = Vec::new();
        for descriptor in &mut self.descriptors {
            let pointer = match reader.read_u32_be() {
                Ok(pointer) => pointer as usize,
                Err(e) => {
                    warnings.push(Error::NameUnavailable {
                        index: descriptor.index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let name = ByteCursor::new_at(data, pointer).and_then(|mut c| c.read_cstring());
            match name {
                Ok(name) if !name.is_empty() => descriptor.name = name.to_string(),
                Ok(_) => {}
                Err(e) => warnings.push(Error::NameUnavailable {
                    index: descriptor.index,
                    reason: e.to_string(),
                }),
            }
        }
        warnings
    }

    /// All descriptors in file order.
    pub fn descriptors(&self) -> &[TextureDescriptor] {
        &self.descriptors
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The raw header words.
    pub fn raw(&self) -> &BundleHeaderRaw {
        &self.raw
    }

    /// Byte range of a descriptor's payload within a payload buffer of `payload_len` bytes.
    ///
    /// Unknown formats have no intrinsic size; their payload runs up to the
    /// next higher descriptor offset, or to the end of the buffer.
    pub fn payload_range(&self, index: usize, payload_len: usize) -> Result<Range<usize>> {
        let descriptor = self
            .descriptors
            .get(index)
            .ok_or(Error::NoSuchTexture {
                index,
                count: self.descriptors.len(),
            })?;
        let start = descriptor.offset;

        let length = match descriptor.length {
            Some(length) => length,
            None => {
                let next = self
                    .descriptors
                    .iter()
                    .map(|d| d.offset)
                    .filter(|&offset| offset > start)
                    .min()
                    .unwrap_or(payload_len)
                    .min(payload_len);
                next.saturating_sub(start)
            }
        };

        match start.checked_add(length) {
            Some(end) if start < payload_len && end <= payload_len => Ok(start..end),
            _ => Err(Error::PayloadOutOfBounds {
                index,
                offset: start,
                length,
                available: payload_len,
            }),
        }
    }

    /// Human-readable dump of the header and every record.
    pub fn describe(&self) -> String {
        let raw = &self.raw;
        let mut out = String::new();
        let _ = writeln!(out, "prefix       = {:#010X}", raw.prefix.get());
        let _ = writeln!(out, "unk0         = {:#010X}", raw.unk0.get());
        let _ = writeln!(out, "string_table = {:#010X}", raw.string_table.get());
        let _ = writeln!(out, "unk1         = {:#010X}", raw.unk1.get());
        let _ = writeln!(out, "count        = {}", raw.count.get());
        let _ = writeln!(out, "unk2         = {:#010X}", raw.unk2.get());

        for d in &self.descriptors {
            let r = &d.record;
            let _ = writeln!(out, "--------------------------------");
            let _ = writeln!(out, "[{:03}] {} ({})", d.index + 1, d.name, d.format);
            let _ = writeln!(out, "  offset     = {:#010X}", d.offset);
            let _ = writeln!(out, "  unk0..2    = {:#010X} {:#010X} {:#010X}", r.unk0.get(), r.unk1.get(), r.unk2.get());
            let _ = writeln!(out, "  size       = {}x{}", d.width, d.height);
            let _ = writeln!(out, "  unk3       = {:#06X}", r.unk3.get());
            let _ = writeln!(out, "  format     = {:#04X}", d.format_tag);
            let _ = writeln!(out, "  mips       = {} ({} usable)", d.declared_mips, d.usable_mips);
            let _ = writeln!(out, "  unk4       = {:#010X}", r.unk4.get());
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One texture to place in a synthetic bundle.
    pub(crate) struct TestTexture<'a> {
        pub name: &'a str,
        pub offset: u32,
        pub width: u16,
        pub height: u16,
        pub format: u8,
        pub mips: u8,
    }

    /// Build a `.blh` buffer with a string table after the records.
    pub(crate) fn build_blh(textures: &[TestTexture<'_>]) -> Vec<u8> {
        let count = textures.len();
        let table = BUNDLE_HEADER_SIZE + count * TEXTURE_RECORD_SIZE;
        let strings = table + count * 4;

        let mut out = Vec::new();
        for word in [BLH_PREFIX, 0, table as u32, 0, count as u32, 0, 0, 0] {
            out.extend_from_slice(&word.to_be_bytes());
        }
        for t in textures {
            out.extend_from_slice(&t.offset.to_be_bytes());
            out.extend_from_slice(&[0u8; 12]);
            out.extend_from_slice(&t.width.to_be_bytes());
            out.extend_from_slice(&t.height.to_be_bytes());
            out.extend_from_slice(&[0u8; 2]);
            out.push(t.format);
            out.push(t.mips);
            out.extend_from_slice(&[0u8; 4]);
        }

        let mut pointer = strings;
        for t in textures {
            out.extend_from_slice(&(pointer as u32).to_be_bytes());
            pointer += t.name.len() + 1;
        }
        for t in textures {
            out.extend_from_slice(t.name.as_bytes());
            out.push(0);
        }
        out
    }

    #[test]
    fn test_record_size() {
        assert_eq!(BUNDLE_HEADER_SIZE, 32);
        assert_eq!(TEXTURE_RECORD_SIZE, 28);
    }

    #[test]
    fn test_parse_descriptors_in_file_order() {
        let data = build_blh(&[
            TestTexture { name: "ui_logo", offset: 0, width: 64, height: 64, format: 0x86, mips: 1 },
            TestTexture { name: "card_fire", offset: 0x800, width: 32, height: 32, format: 0x88, mips: 2 },
        ]);
        let header = BundleHeader::parse(&data).unwrap();

        assert_eq!(header.len(), 2);
        let d = &header.descriptors()[0];
        assert_eq!(d.name, "ui_logo");
        assert_eq!(d.format, TextureFormat::Bc1);
        assert_eq!(d.length, Some(64 * 64 / 2));

        let d = &header.descriptors()[1];
        assert_eq!(d.name, "card_fire");
        assert_eq!(d.offset, 0x800);
        assert_eq!(d.length, Some(32 * 32 + 16 * 16));
        assert_eq!(d.usable_mips, 2);
    }

    #[test]
    fn test_count_exceeding_buffer_is_corrupt() {
        let mut data = build_blh(&[TestTexture {
            name: "a",
            offset: 0,
            width: 4,
            height: 4,
            format: 0x86,
            mips: 1,
        }]);
        data[16..20].copy_from_slice(&1000u32.to_be_bytes());

        assert!(matches!(BundleHeader::parse(&data), Err(Error::HeaderCorrupt(_))));
    }

    #[test]
    fn test_bad_prefix_is_corrupt() {
        let mut data = build_blh(&[]);
        data[0] = 0xFF;
        assert!(matches!(BundleHeader::parse(&data), Err(Error::HeaderCorrupt(_))));
        assert!(matches!(BundleHeader::parse(&data[..8]), Err(Error::HeaderCorrupt(_))));
    }

    #[test]
    fn test_missing_string_table_falls_back_to_offset_names() {
        let mut data = build_blh(&[TestTexture {
            name: "lost",
            offset: 0x1234,
            width: 4,
            height: 4,
            format: 0x86,
            mips: 1,
        }]);
        data[8..12].copy_from_slice(&0xFFFF_0000u32.to_be_bytes());

        let (header, warnings) = BundleHeader::parse_with_warnings(&data).unwrap();
        assert_eq!(header.descriptors()[0].name, "0x00001234");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_unknown_format_length_runs_to_next_offset() {
        let data = build_blh(&[
            TestTexture { name: "odd", offset: 0x100, width: 8, height: 8, format: 0x10, mips: 1 },
            TestTexture { name: "first", offset: 0, width: 8, height: 8, format: 0x86, mips: 1 },
            TestTexture { name: "tail", offset: 0x300, width: 8, height: 8, format: 0x11, mips: 1 },
        ]);
        let header = BundleHeader::parse(&data).unwrap();

        assert_eq!(header.payload_range(0, 0x400).unwrap(), 0x100..0x300);
        assert_eq!(header.payload_range(1, 0x400).unwrap(), 0..32);
        assert_eq!(header.payload_range(2, 0x400).unwrap(), 0x300..0x400);
    }

    #[test]
    fn test_payload_out_of_bounds() {
        let data = build_blh(&[TestTexture {
            name: "big",
            offset: 0x10,
            width: 64,
            height: 64,
            format: 0x88,
            mips: 1,
        }]);
        let header = BundleHeader::parse(&data).unwrap();

        assert!(matches!(
            header.payload_range(0, 0x100),
            Err(Error::PayloadOutOfBounds { index: 0, offset: 0x10, .. })
        ));
        assert!(matches!(
            header.payload_range(1, 0x100),
            Err(Error::NoSuchTexture { index: 1, count: 1 })
        ));
    }
}
