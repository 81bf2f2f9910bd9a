//! hexmark - Annotate byte ranges of binary files
//!
//! This tool keeps labeled, typed annotations for a binary file in an `.hva`
//! sidecar and renders them over a hex dump.

mod render;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hexmark_core::codec::readout_table;
use hexmark_core::layout::total_rows;
use hexmark_core::persist::FILE_EXTENSION;
use hexmark_core::{DisplayFormat, LoadWarning, Session, Viewport};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Annotate byte ranges of binary files and view them over a hex grid
#[derive(Parser, Debug)]
#[command(name = "hexmark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a hex dump with annotations drawn over it
    Dump {
        #[command(flatten)]
        doc: DocumentArgs,

        /// First row to show (16 bytes per row)
        #[arg(long, default_value = "0")]
        row: usize,

        /// Number of rows to show
        #[arg(long, default_value = "32")]
        rows: usize,
    },

    /// Decode the bytes at an offset as every primitive type
    Inspect {
        /// Binary file to read
        #[arg(short, long)]
        file: PathBuf,

        /// Byte offset (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_offset)]
        offset: usize,
    },

    /// List annotations with their decoded values
    List {
        #[command(flatten)]
        doc: DocumentArgs,
    },

    /// Annotate a byte range
    Add {
        #[command(flatten)]
        doc: DocumentArgs,

        /// First byte of the range (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_offset)]
        start: usize,

        /// Last byte of the range, inclusive (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_offset)]
        end: usize,

        /// Annotation label
        #[arg(short, long)]
        label: String,

        /// How to decode the range
        #[arg(long, value_enum, default_value = "hex")]
        format: FormatArg,
    },

    /// Change the label and format of an annotation
    Edit {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Annotation number as shown by `list`
        #[arg(long)]
        index: usize,

        /// New label
        #[arg(short, long)]
        label: String,

        /// New display format
        #[arg(long, value_enum)]
        format: FormatArg,
    },

    /// Delete an annotation; removing the last one deletes the default sidecar
    Remove {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Annotation number as shown by `list`
        #[arg(long)]
        index: usize,
    },
}

#[derive(Args, Debug)]
struct DocumentArgs {
    /// Binary file being annotated
    #[arg(short, long)]
    file: PathBuf,

    /// Annotation file (default: <FILE>.hva next to the binary)
    #[arg(short, long)]
    annotations: Option<PathBuf>,

    /// Load annotations even if they were saved for a different file
    #[arg(long)]
    accept_mismatch: bool,
}

impl DocumentArgs {
    /// True when the annotation file is the default sidecar
    fn uses_sidecar(&self) -> bool {
        self.annotations.is_none()
    }

    fn annotation_path(&self) -> PathBuf {
        self.annotations
            .clone()
            .unwrap_or_else(|| sidecar_path(&self.file))
    }
}

/// Display format of an annotation
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Hex bytes
    Hex,
    /// Signed little-endian integer
    Int,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Printable ASCII
    Ascii,
    /// Every other byte as ASCII
    Unicode,
}

impl From<FormatArg> for DisplayFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Hex => DisplayFormat::Hex,
            FormatArg::Int => DisplayFormat::Int,
            FormatArg::Float => DisplayFormat::Float,
            FormatArg::Double => DisplayFormat::Double,
            FormatArg::Ascii => DisplayFormat::Ascii,
            FormatArg::Unicode => DisplayFormat::Unicode,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Dump { doc, row, rows } => dump(&doc, row, rows),
        Command::Inspect { file, offset } => inspect(&file, offset),
        Command::List { doc } => list(&doc),
        Command::Add {
            doc,
            start,
            end,
            label,
            format,
        } => {
            let (mut session, path) = open_session(&doc)?;
            let index = session.add_annotation(start, end, &label, format.into())?;
            session
                .save(&path)
                .with_context(|| format!("Failed to save annotations: {}", path.display()))?;
            println!("Added #{} '{}' to {}", index, label, path.display());
            Ok(())
        }
        Command::Edit {
            doc,
            index,
            label,
            format,
        } => {
            let (mut session, path) = open_session(&doc)?;
            session.update_annotation(index, &label, format.into())?;
            session
                .save(&path)
                .with_context(|| format!("Failed to save annotations: {}", path.display()))?;
            println!("Updated #{}", index);
            Ok(())
        }
        Command::Remove { doc, index } => remove(&doc, index),
    }
}

/// Open the binary and apply its annotation file, if one exists
fn open_session(doc: &DocumentArgs) -> Result<(Session, PathBuf)> {
    if !doc.file.is_file() {
        bail!("Input file does not exist: {}", doc.file.display());
    }

    let mut session = Session::open(&doc.file)
        .with_context(|| format!("Failed to open {}", doc.file.display()))?;
    let path = doc.annotation_path();

    if !path.exists() {
        debug!("No annotation file at {}", path.display());
        return Ok((session, path));
    }

    let outcome = session
        .load(&path)
        .with_context(|| format!("Failed to load annotations: {}", path.display()))?;

    for warning in &outcome.warnings {
        match warning {
            LoadWarning::DocumentMismatch { .. } if !doc.accept_mismatch => {
                bail!("{} (use --accept-mismatch to load anyway)", warning);
            }
            _ => warn!("{}", warning),
        }
    }

    if outcome.skipped > 0 {
        warn!(
            "{} of {} annotations do not fit {} and were dropped",
            outcome.skipped,
            outcome.header.annotation_count,
            doc.file.display()
        );
    }

    info!(
        "Loaded {} annotations from {}",
        outcome.annotations.len(),
        path.display()
    );
    session.apply_loaded(outcome);
    Ok((session, path))
}

fn dump(doc: &DocumentArgs, row: usize, rows: usize) -> Result<()> {
    let (session, _) = open_session(doc)?;
    let total = total_rows(session.document().len());
    let viewport = Viewport::new(row, rows).clamped(total);

    print!("{}", render::render_dump(&session, viewport));
    Ok(())
}

fn inspect(file: &Path, offset: usize) -> Result<()> {
    let data =
        std::fs::read(file).with_context(|| format!("Failed to read input file: {}", file.display()))?;
    if offset >= data.len() {
        bail!("Offset {} is past the end of {} ({} bytes)", offset, file.display(), data.len());
    }

    println!("Offset {:08X}", offset);
    for (ty, readout) in readout_table(&data, offset) {
        println!("  {:<16} {}", ty.name(), readout);
    }
    Ok(())
}

fn list(doc: &DocumentArgs) -> Result<()> {
    let (session, path) = open_session(doc)?;
    if session.annotations().is_empty() {
        println!("No annotations ({} not found or empty)", path.display());
        return Ok(());
    }

    let index = session.index();
    let mut values = vec![""; session.annotations().len()];
    for info in index.iter() {
        values[info.annotation_index] = info.formatted_value.as_str();
    }

    for (i, anno) in session.annotations().iter().enumerate() {
        println!(
            "#{:<3} {:08X}..={:08X} {:>6} {:<7} {:<20} {}",
            i,
            anno.start(),
            anno.end(),
            anno.len(),
            anno.format(),
            anno.label(),
            values[i]
        );
    }
    Ok(())
}

fn remove(doc: &DocumentArgs, index: usize) -> Result<()> {
    let (mut session, path) = open_session(doc)?;
    let removed = session.remove_annotation(index)?;

    if session.annotations().is_empty() {
        // an .hva file cannot hold zero annotations
        if !doc.uses_sidecar() {
            bail!(
                "Removing '{}' would leave {} empty; delete that file instead",
                removed.label(),
                path.display()
            );
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        println!("Removed '{}'; deleted empty {}", removed.label(), path.display());
        return Ok(());
    }

    session
        .save(&path)
        .with_context(|| format!("Failed to save annotations: {}", path.display()))?;
    println!("Removed '{}'", removed.label());
    Ok(())
}

/// Default annotation file for a binary: `firmware.bin` -> `firmware.bin.hva`
fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".");
    name.push(FILE_EXTENSION);
    PathBuf::from(name)
}

/// Parse a decimal or `0x`-prefixed hex offset
fn parse_offset(s: &str) -> std::result::Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", s, e))
}
