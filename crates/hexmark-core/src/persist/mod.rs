//! The `.hva` annotation file format.
//!
//! ## Layout
//!
//! All integers are little-endian `int32`, with no padding:
//!
//! ```text
//! header      "HVA\0"  version  annotation_count  reserved[16] (zero)
//! document    name_len  name bytes
//! per record  start  end  color  label_len label  format_len format
//! ```
//!
//! `color` is the raw `0x00BBGGRR` palette value and `format` is one of the
//! [`DisplayFormat`] names.
//!
//! ## Loading
//!
//! A load either parses the whole file or fails; nothing is applied until the
//! caller has the complete [`LoadOutcome`]. Within a successful parse,
//! records that do not fit the current document (or carry an unknown format
//! name) are dropped and only counted. A newer file version or a different
//! document name is reported as a [`LoadWarning`] and left to the caller to
//! act on.

mod wire;

use crate::codec::DisplayFormat;
use crate::document::{Annotation, Document};
use crate::error::{Error, Result};
use crate::palette;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::path::Path;
use tracing::{debug, trace, warn};
use wire::{put_len_prefixed, to_i32, FieldReader};

/// File signature: "HVA" plus a zero byte
pub const SIGNATURE: [u8; 4] = *b"HVA\0";

/// Version written by this implementation
pub const FORMAT_VERSION: i32 = 1;

/// Conventional file extension
pub const FILE_EXTENSION: &str = "hva";

/// Size of the reserved block in the header
const RESERVED_LEN: usize = 16;

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = SIGNATURE.len() + 4 + 4 + RESERVED_LEN;

/// Smallest possible record: five `int32` fields with empty strings
const MIN_RECORD_LEN: usize = 5 * 4;

/// Fixed header of an `.hva` file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version the file was written with
    pub version: i32,
    /// Number of records the writer declared
    pub annotation_count: i32,
}

/// Non-fatal conditions found while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The file was written by a newer version; only known fields were read
    NewerVersion {
        /// Version found in the header
        found: i32,
        /// Highest version this implementation understands
        supported: i32,
    },
    /// The file was saved against a document with another name
    DocumentMismatch {
        /// Name stored in the file
        stored: String,
        /// Name of the open document
        current: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::NewerVersion { found, supported } => write!(
                f,
                "annotation file version {} is newer than supported version {}",
                found, supported
            ),
            LoadWarning::DocumentMismatch { stored, current } => write!(
                f,
                "annotations were saved for '{}', not '{}'",
                stored, current
            ),
        }
    }
}

/// Result of parsing an `.hva` file against an open document
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// The parsed header
    pub header: FileHeader,
    /// Document name stored in the file, as raw bytes
    pub document_name: Bytes,
    /// Records that fit the document, in file order
    pub annotations: Vec<Annotation>,
    /// Records dropped for being out of bounds or unreadable as annotations
    pub skipped: usize,
    /// Conditions the caller should surface
    pub warnings: Vec<LoadWarning>,
}

impl LoadOutcome {
    /// Returns true if the file names another document
    pub fn is_document_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, LoadWarning::DocumentMismatch { .. }))
    }

    /// Stored document name, with invalid UTF-8 replaced
    pub fn document_name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.document_name).into_owned()
    }

    /// Returns true if every declared record survived
    pub fn is_complete(&self) -> bool {
        i32::try_from(self.annotations.len()).ok() == Some(self.header.annotation_count)
    }
}

/// Encodes `annotations` as an `.hva` file for the document `document_name`.
///
/// An empty list is refused with [`Error::NothingToSave`]. The document name
/// and labels are written as raw bytes.
pub fn encode(document_name: impl AsRef<[u8]>, annotations: &[Annotation]) -> Result<Bytes> {
    let document_name = document_name.as_ref();
    if annotations.is_empty() {
        return Err(Error::NothingToSave);
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 + document_name.len());
    buf.put_slice(&SIGNATURE);
    buf.put_i32_le(FORMAT_VERSION);
    buf.put_i32_le(to_i32(annotations.len(), "annotation count")?);
    buf.put_bytes(0, RESERVED_LEN);
    put_len_prefixed(&mut buf, document_name, "document name length")?;

    for anno in annotations {
        buf.put_i32_le(to_i32(anno.start(), "start offset")?);
        buf.put_i32_le(to_i32(anno.end(), "end offset")?);
        buf.put_u32_le(anno.color().to_raw());
        put_len_prefixed(&mut buf, anno.raw_label(), "label length")?;
        put_len_prefixed(&mut buf, anno.format().as_str().as_bytes(), "format length")?;
    }

    debug!(
        "Encoded {} annotations for '{}' ({} bytes)",
        annotations.len(),
        String::from_utf8_lossy(document_name),
        buf.len()
    );
    Ok(buf.freeze())
}

/// Parses an `.hva` file against `document`.
pub fn decode(data: &[u8], document: &Document) -> Result<LoadOutcome> {
    let mut reader = FieldReader::new(data);

    let signature: [u8; 4] = reader.read_array("signature")?;
    if signature != SIGNATURE {
        return Err(Error::InvalidSignature { found: signature });
    }

    let header = FileHeader {
        version: reader.read_i32("version")?,
        annotation_count: reader.read_i32("annotation count")?,
    };
    let _reserved: [u8; RESERVED_LEN] = reader.read_array("reserved block")?;

    let mut warnings = Vec::new();
    if header.version > FORMAT_VERSION {
        warn!(
            "Annotation file version {} is newer than {}; reading known fields only",
            header.version, FORMAT_VERSION
        );
        warnings.push(LoadWarning::NewerVersion {
            found: header.version,
            supported: FORMAT_VERSION,
        });
    }

    let document_name = reader.read_bytes("document name")?;
    if document_name[..] != *document.raw_name() {
        let stored = String::from_utf8_lossy(&document_name).into_owned();
        warn!(
            "Annotation file was saved for '{}', open document is '{}'",
            stored,
            document.name()
        );
        warnings.push(LoadWarning::DocumentMismatch {
            stored,
            current: document.name().to_string(),
        });
    }

    let declared = usize::try_from(header.annotation_count).unwrap_or(0);
    let capacity = declared.min(data.len().saturating_sub(reader.position()) / MIN_RECORD_LEN);
    let mut annotations = Vec::with_capacity(capacity);
    let mut skipped = 0;

    for i in 0..declared {
        let at = reader.position();
        let record = read_record(&mut reader)?;

        match record.into_annotation(document, annotations.len()) {
            Some(anno) => {
                trace!("Record {} at {}: {:?}", i, at, anno.range());
                annotations.push(anno);
            }
            None => {
                debug!("Skipping record {} at offset {}: does not fit document", i, at);
                skipped += 1;
            }
        }
    }

    if reader.position() < data.len() {
        trace!(
            "Ignoring {} trailing bytes",
            data.len() - reader.position()
        );
    }

    debug!(
        "Decoded {} of {} annotations ({} skipped)",
        annotations.len(),
        header.annotation_count,
        skipped
    );

    Ok(LoadOutcome {
        header,
        document_name,
        annotations,
        skipped,
        warnings,
    })
}

/// Writes `annotations` for `document` to `path`
pub fn save(path: impl AsRef<Path>, document: &Document, annotations: &[Annotation]) -> Result<()> {
    let path = path.as_ref();
    let data = encode(document.raw_name(), annotations)?;
    std::fs::write(path, &data).map_err(|e| Error::file_write(path, e))?;
    debug!("Saved {} annotations to {}", annotations.len(), path.display());
    Ok(())
}

/// Reads and parses the `.hva` file at `path` against `document`
pub fn load(path: impl AsRef<Path>, document: &Document) -> Result<LoadOutcome> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    decode(&data, document)
}

/// One record exactly as stored
struct RawRecord {
    start: i32,
    end: i32,
    color: u32,
    label: Bytes,
    format: Bytes,
}

fn read_record(reader: &mut FieldReader<'_>) -> Result<RawRecord> {
    Ok(RawRecord {
        start: reader.read_i32("start offset")?,
        end: reader.read_i32("end offset")?,
        color: reader.read_i32("color")? as u32,
        label: reader.read_bytes("label")?,
        format: reader.read_bytes("format")?,
    })
}

impl RawRecord {
    /// Validates the record against `document`; `position` is the number of
    /// records already accepted
    fn into_annotation(self, document: &Document, position: usize) -> Option<Annotation> {
        let start = usize::try_from(self.start).ok()?;
        let end = usize::try_from(self.end).ok()?;
        if !document.contains_range(start, end) {
            return None;
        }
        let format: DisplayFormat = std::str::from_utf8(&self.format).ok()?.parse().ok()?;
        let color_index = palette::index_of_raw(self.color)
            .unwrap_or_else(|| palette::color_for_position(position));

        Annotation::with_raw_label(start, end, self.label, format, color_index).ok()
    }
}
