//! Archive loading and the PAK file header.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use ixtract_common::ByteCursor;
use memmap2::Mmap;
use zerocopy::byteorder::big_endian::U32;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::{Error, Result};

/// Leading word of a model PAK.
pub const PAK_PREFIX: u32 = 0x020E_0000;

/// `unk0` value carried by every model PAK seen so far.
pub const PAK_MODEL_TAG: u32 = 0x44;

/// Accepted `unk1` version words.
pub const PAK_VERSIONS: [u32; 2] = [0x0001_0001, 0x0001_0002];

/// Read-only archive contents, memory-mapped when loaded from disk.
pub struct ArchiveBuffer {
    name: String,
    backing: Backing,
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ArchiveBuffer {
    /// Map an archive from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        // Mapping a zero-length file fails on some platforms.
        let backing = if file.metadata()?.len() == 0 {
            Backing::Owned(Vec::new())
        } else {
            Backing::Mapped(unsafe { Mmap::map(&file)? })
        };

        Ok(Self { name, backing })
    }

    /// Wrap an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            backing: Backing::Owned(data),
        }
    }

    /// Archive file name (no directory).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => mmap,
            Backing::Owned(data) => data,
        }
    }
}

impl Deref for ArchiveBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for ArchiveBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBuffer")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

/// Raw 32-byte PAK file header.
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct PakHeaderRaw {
    pub prefix: U32,
    pub unk0: U32,
    pub unk1: U32,
    pub entry_table: U32,
    pub edo: U32,
    pub padding: [U32; 3],
}

/// Validated PAK file header.
#[derive(Debug, Clone, Copy)]
pub struct PakHeader {
    pub entry_table: usize,
    pub edo: usize,
    pub version: u32,
}

impl PakHeader {
    /// Parse and validate the file header of a model PAK.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw: PakHeaderRaw = ByteCursor::new(data).read_struct()?;

        if raw.prefix.get() != PAK_PREFIX {
            return Err(Error::InvalidHeader(format!(
                "prefix {:#010X}, expected {PAK_PREFIX:#010X}",
                raw.prefix.get()
            )));
        }
        if raw.unk0.get() != PAK_MODEL_TAG {
            return Err(Error::InvalidHeader(format!(
                "not a model package (unk0={:#010X})",
                raw.unk0.get()
            )));
        }
        if !PAK_VERSIONS.contains(&raw.unk1.get()) {
            return Err(Error::InvalidHeader(format!(
                "not a model package (unk1={:#010X})",
                raw.unk1.get()
            )));
        }

        let entry_table = check_pointer(data, "entry table", raw.entry_table.get())?;
        let edo = check_pointer(data, "EDO", raw.edo.get())?;

        Ok(Self {
            entry_table,
            edo,
            version: raw.unk1.get(),
        })
    }
}

/// Raw entry table: absolute section pointers.
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct EntryTableRaw {
    pub mesh_section: U32,
    pub unk0: U32,
    pub bone_section: U32,
    pub unk1: U32,
    pub unk2_section: U32,
}

/// Section offsets advertised by the archive itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTable {
    pub mesh_section: usize,
    pub bone_section: usize,
}

impl EntryTable {
    /// Read the entry table named by the file header.
    pub fn read(data: &[u8], header: &PakHeader) -> Result<Self> {
        let raw: EntryTableRaw = ByteCursor::new_at(data, header.entry_table)?.read_struct()?;

        let mesh_section = check_pointer(data, "mesh section", raw.mesh_section.get())?;
        let bone_section = check_pointer(data, "bone section", raw.bone_section.get())?;
        check_pointer(data, "unk2 section", raw.unk2_section.get())?;

        Ok(Self {
            mesh_section,
            bone_section,
        })
    }

    /// Parse the file header and its entry table in one go.
    pub fn from_archive(data: &[u8]) -> Result<Self> {
        let header = PakHeader::parse(data)?;
        Self::read(data, &header)
    }
}

fn check_pointer(data: &[u8], what: &str, pointer: u32) -> Result<usize> {
    let pointer = pointer as usize;
    if pointer == 0 || pointer >= data.len() {
        return Err(Error::InvalidHeader(format!(
            "{what} pointer {pointer:#010X} is outside the archive"
        )));
    }
    Ok(pointer)
}
