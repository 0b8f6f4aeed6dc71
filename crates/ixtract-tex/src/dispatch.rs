//! Codec dispatch: turn one texture payload into one output file.

use std::fs;
use std::path::{Path, PathBuf};

use ixtract_dds::{block_compressed_header, rgba8_header};
use log::{debug, warn};

use crate::format::TextureFormat;
use crate::header::{BundleHeader, TextureDescriptor};
use crate::swizzle::unswizzle_rgba;
use crate::{Error, Result};

/// Options controlling texture emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Reorder swizzled RGBA payloads into linear pixel order.
    pub unswizzle: bool,
    /// Append `@0x{offset}.{format}` to file names so duplicates cannot collide.
    pub tag_names: bool,
}

/// A descriptor paired with the payload bytes it designates.
#[derive(Debug, Clone, Copy)]
pub struct TextureAsset<'a> {
    pub descriptor: &'a TextureDescriptor,
    pub payload: &'a [u8],
}

impl<'a> TextureAsset<'a> {
    /// Slice the descriptor's payload out of the `.bli` buffer.
    pub fn from_bundle(header: &'a BundleHeader, index: usize, payload: &'a [u8]) -> Result<Self> {
        let range = header.payload_range(index, payload.len())?;
        Ok(Self {
            descriptor: &header.descriptors()[index],
            payload: &payload[range],
        })
    }
}

/// The kind of file produced for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// DDS header followed by the payload.
    Dds,
    /// The payload bytes unchanged.
    Raw,
}

impl ContainerKind {
    /// File extension for this container.
    pub fn extension(self) -> &'static str {
        match self {
            ContainerKind::Dds => "dds",
            ContainerKind::Raw => "raw",
        }
    }
}

/// One emitted output file, still in memory.
#[derive(Debug)]
pub struct EmittedTexture {
    /// Descriptor index.
    pub index: usize,
    /// Descriptor name, verbatim.
    pub name: String,
    /// File name to write (sanitized name plus extension).
    pub file_name: String,
    pub kind: ContainerKind,
    /// Length of the container header prefix (0 for raw).
    pub header_len: usize,
    /// Full file contents.
    pub bytes: Vec<u8>,
    /// Non-fatal problems, e.g. [`Error::UnknownFormat`].
    pub warnings: Vec<Error>,
}

impl EmittedTexture {
    /// Write the file into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Produce exactly one output for a texture asset.
///
/// Known formats get a DDS header in front of the payload. Unknown formats,
/// and known formats whose header cannot be built, are emitted raw with a
/// warning.
pub fn dispatch(asset: TextureAsset<'_>, options: &DispatchOptions) -> EmittedTexture {
    let descriptor = asset.descriptor;
    let mut warnings = Vec::new();

    let header = match (descriptor.format, descriptor.format.block_format()) {
        (TextureFormat::Unknown(tag), _) => {
            warnings.push(Error::UnknownFormat {
                index: descriptor.index,
                tag,
            });
            None
        }
        (_, Some(block)) => match block_compressed_header(
            block,
            descriptor.width,
            descriptor.height,
            descriptor.usable_mips,
        ) {
            Ok(header) => Some(header),
            Err(source) => {
                warnings.push(Error::ContainerHeader {
                    index: descriptor.index,
                    source,
                });
                None
            }
        },
        (_, None) => Some(rgba8_header(
            descriptor.width,
            descriptor.height,
            descriptor.usable_mips,
        )),
    };

    let payload = if options.unswizzle && descriptor.format == TextureFormat::Rgba8Swizzled {
        unswizzle_rgba(
            asset.payload,
            descriptor.width,
            descriptor.height,
            descriptor.declared_mips,
        )
    } else {
        asset.payload.to_vec()
    };

    let (kind, header_len, bytes) = match header {
        Some(mut header) => {
            let header_len = header.len();
            header.extend_from_slice(&payload);
            (ContainerKind::Dds, header_len, header)
        }
        None => (ContainerKind::Raw, 0, payload),
    };

    for warning in &warnings {
        warn!("{warning}");
    }
    debug!(
        "texture #{} {} -> {} ({} bytes)",
        descriptor.index,
        descriptor.name,
        kind.extension(),
        bytes.len()
    );

    EmittedTexture {
        index: descriptor.index,
        name: descriptor.name.clone(),
        file_name: output_file_name(descriptor, kind, options.tag_names),
        kind,
        header_len,
        bytes,
        warnings,
    }
}

/// File name for a descriptor's output.
pub fn output_file_name(descriptor: &TextureDescriptor, kind: ContainerKind, tagged: bool) -> String {
    let stem: String = descriptor
        .name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();

    if tagged {
        format!(
            "{stem}@{:#010X}.{}.{}",
            descriptor.offset,
            descriptor.format,
            kind.extension()
        )
    } else {
        format!("{stem}.{}", kind.extension())
    }
}

/// Outcome of a whole bundle.
#[derive(Debug, Default)]
pub struct BundleReport {
    /// One entry per usable descriptor, in header order.
    pub emitted: Vec<EmittedTexture>,
    /// Descriptors that produced no file.
    pub failures: Vec<Error>,
}

/// Dispatch every descriptor of a bundle against its payload buffer.
///
/// Out-of-range descriptors are reported in [`BundleReport::failures`] and do
/// not stop the batch.
pub fn extract_bundle(
    header: &BundleHeader,
    payload: &[u8],
    options: &DispatchOptions,
) -> BundleReport {
    let mut report = BundleReport::default();
    for index in 0..header.len() {
        match TextureAsset::from_bundle(header, index, payload) {
            Ok(asset) => report.emitted.push(dispatch(asset, options)),
            Err(e) => {
                warn!("{e}");
                report.failures.push(e);
            }
        }
    }
    report
}
