//! ixtract CLI - Command-line tool for Invizimals asset extraction.
//!
//! This is the main entry point for the ixtract command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use ixtract::prelude::*;
use ixtract::tex::{dispatch, ContainerKind, TextureAsset};

/// ixtract - Invizimals texture and model extraction tool
#[derive(Parser)]
#[command(name = "ixtract")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the structure of a texture bundle header
    TexShow {
        /// Path to the .blh header
        #[arg(long, env = "IXTRACT_BLH")]
        blh: PathBuf,
    },

    /// Extract every texture of a bundle as DDS (or raw for unknown formats)
    TexUnpack {
        /// Path to the .blh header
        #[arg(long, env = "IXTRACT_BLH")]
        blh: PathBuf,

        /// Path to the .bli payload (default: the header path with a .bli extension)
        #[arg(long)]
        bli: Option<PathBuf>,

        /// Output directory (default: next to the header)
        #[arg(short, long, env = "IXTRACT_OUTPUT")]
        output: Option<PathBuf>,

        /// Reorder swizzled R8G8B8A8 payloads into linear order
        #[arg(long)]
        unswizzle: bool,

        /// Append the payload offset and format to every file name
        #[arg(long)]
        tag_names: bool,
    },

    /// Extract meshes and bones from model PAKs into PLC documents
    PakExtract {
        /// PAK file, or a glob pattern matching several
        #[arg(short, long, env = "IXTRACT_PAK")]
        pak: String,

        /// Hex offset of the mesh section (default: auto)
        #[arg(short, long, value_parser = parse_hex)]
        mesh: Option<usize>,

        /// Hex offset of the bone section (default: auto)
        #[arg(short, long, value_parser = parse_hex)]
        bone: Option<usize>,

        /// Skip the first N meshes
        #[arg(short, long, default_value_t = 0)]
        skip: usize,

        /// Reverse the order of the mesh list
        #[arg(short, long)]
        reverse: bool,

        /// Name meshes after the bone indices they use
        #[arg(short = 'a', long)]
        rename: bool,

        /// Write one PLC file per mesh
        #[arg(short = 't', long)]
        split: bool,

        /// Output directory (default: next to each PAK)
        #[arg(short, long, env = "IXTRACT_OUTPUT")]
        output: Option<PathBuf>,

        /// Leading records that must validate when auto-detecting a section
        #[arg(long, default_value_t = 3)]
        quorum: usize,

        /// Print the bone hierarchy
        #[arg(long)]
        show_tree: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::TexShow { blh } => {
            cmd_tex_show(&blh)?;
        }
        Commands::TexUnpack {
            blh,
            bli,
            output,
            unswizzle,
            tag_names,
        } => {
            let bli = bli.unwrap_or_else(|| blh.with_extension("bli"));
            let options = DispatchOptions {
                unswizzle,
                tag_names,
            };
            cmd_tex_unpack(&blh, &bli, output.as_deref(), &options)?;
        }
        Commands::PakExtract {
            pak,
            mesh,
            bone,
            skip,
            reverse,
            rename,
            split,
            output,
            quorum,
            show_tree,
        } => {
            let options = PakOptions {
                // Offset 0 is the file header, never a section: treat it as "auto".
                sections: SectionRequest {
                    mesh: mesh.filter(|&offset| offset != 0),
                    bone: bone.filter(|&offset| offset != 0),
                },
                locator: LocatorConfig {
                    quorum,
                    ..LocatorConfig::default()
                },
                mesh: MeshOptions { skip, reverse },
            };
            let plc = PlcOptions { rename, split };
            cmd_pak_extract(&pak, output.as_deref(), &options, &plc, show_tree)?;
        }
    }

    Ok(())
}

fn cmd_tex_show(blh: &Path) -> Result<()> {
    let data = fs::read(blh).context("Failed to read header file")?;
    let header = BundleHeader::parse(&data).context("Failed to parse texture header")?;

    println!("{}", blh.display());
    print!("{}", header.describe());

    Ok(())
}

fn cmd_tex_unpack(
    blh: &Path,
    bli: &Path,
    output: Option<&Path>,
    options: &DispatchOptions,
) -> Result<()> {
    let header_data = fs::read(blh).context("Failed to read header file")?;
    let header = BundleHeader::parse(&header_data).context("Failed to parse texture header")?;
    let payload = ArchiveBuffer::open(bli).context("Failed to open payload file")?;

    let output = output_dir(output, blh);
    fs::create_dir_all(&output)?;

    info!(
        "Extracting {} textures from {} to {}",
        header.len(),
        bli.display(),
        output.display()
    );

    let pb = ProgressBar::new(header.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut written = 0;
    let mut raw = 0;
    let mut failed = 0;

    for index in 0..header.len() {
        match TextureAsset::from_bundle(&header, index, &payload) {
            Ok(asset) => {
                let texture = dispatch(asset, options);
                if texture.kind == ContainerKind::Raw {
                    raw += 1;
                }
                match texture.write_to(&output) {
                    Ok(_) => written += 1,
                    Err(e) => {
                        pb.suspend(|| error!("Error writing {}: {}", texture.file_name, e));
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                pb.suspend(|| warn!("{e}"));
                failed += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!(
        "Wrote {} textures in {:?} ({} raw, {} failed)",
        written,
        start.elapsed(),
        raw,
        failed
    );

    Ok(())
}

fn cmd_pak_extract(
    pattern: &str,
    output: Option<&Path>,
    options: &PakOptions,
    plc: &PlcOptions,
    show_tree: bool,
) -> Result<()> {
    let paths: Vec<PathBuf> = glob::glob(pattern)
        .context("Invalid PAK path pattern")?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{e}");
                None
            }
        })
        .collect();

    if paths.is_empty() {
        anyhow::bail!("No PAK file matches {pattern}");
    }

    let mut failed = 0;
    for path in &paths {
        if let Err(e) = extract_one_pak(path, output, options, plc, show_tree) {
            error!("{}: {:#}", path.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} archives failed", paths.len());
    }

    Ok(())
}

fn extract_one_pak(
    path: &Path,
    output: Option<&Path>,
    options: &PakOptions,
    plc: &PlcOptions,
    show_tree: bool,
) -> Result<()> {
    println!("Opening PAK: {}", path.display());

    let start = Instant::now();
    let archive = ArchiveBuffer::open(path).context("Failed to open PAK")?;
    let model = extract_pak(&archive, options).context("Failed to extract model")?;

    println!("  {}", model.sections.mesh);
    println!("  {}", model.sections.bone);
    println!(
        "  {} meshes ({} skipped), {} bones, {} warnings",
        model.meshes.len(),
        model.skipped.len(),
        model.skeleton.len(),
        model.issues.len()
    );

    if show_tree {
        print!("{}", model.skeleton.render_tree());
    }

    let output = output_dir(output, path);
    fs::create_dir_all(&output)?;

    let writer = PlcWriter::new(archive.name(), *plc);
    let paths = write_all(&writer.from_extraction(&model), &output)
        .context("Failed to write PLC files")?;

    println!("Wrote {} PLC file(s) in {:?}", paths.len(), start.elapsed());

    Ok(())
}

/// The requested directory, or the one containing `input`.
fn output_dir(requested: Option<&Path>, input: &Path) -> PathBuf {
    match requested {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    }
}

/// Parse a hex offset, with or without a `0x` prefix.
fn parse_hex(value: &str) -> std::result::Result<usize, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    usize::from_str_radix(digits, 16).map_err(|e| format!("invalid hex offset `{value}`: {e}"))
}
