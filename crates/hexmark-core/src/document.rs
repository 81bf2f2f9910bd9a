//! The annotated document and its annotations.

use crate::codec::DisplayFormat;
use crate::error::{Error, Result};
use crate::palette::{self, Rgb, PALETTE_SIZE};
use bytes::Bytes;
use std::ffi::OsStr;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::debug;

/// An opened binary file: a name plus its immutable bytes
///
/// The name is kept as the raw bytes that `.hva` files store, with a lossy
/// UTF-8 rendering for display.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    raw_name: Bytes,
    data: Bytes,
}

impl Document {
    /// Creates a document from bytes already in memory
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        Self {
            raw_name: Bytes::from(name.clone().into_bytes()),
            name,
            data: data.into(),
        }
    }

    /// Creates a document whose name is not necessarily UTF-8
    pub fn with_raw_name(raw_name: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        let raw_name = raw_name.into();
        Self {
            name: String::from_utf8_lossy(&raw_name).into_owned(),
            raw_name,
            data: data.into(),
        }
    }

    /// Reads a document from disk.
    ///
    /// The document is named after the file name component of `path`, which
    /// is also the name stored in `.hva` files saved against it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        let raw_name = match path.file_name() {
            Some(name) => os_str_bytes(name),
            None => path.display().to_string().into_bytes(),
        };

        let document = Self::with_raw_name(raw_name, data);
        debug!("Opened {} ({} bytes)", document.name, document.len());
        Ok(document)
    }

    /// Returns the document name, with invalid UTF-8 replaced
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the document name exactly as stored in `.hva` files
    pub fn raw_name(&self) -> &[u8] {
        &self.raw_name
    }

    /// Returns the document bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the document length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the document is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if `start..=end` is a well-formed range inside the document
    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        start <= end && end < self.data.len()
    }
}

#[cfg(unix)]
fn os_str_bytes(name: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn os_str_bytes(name: &OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

/// A labeled, formatted byte range
///
/// Offsets are fixed at creation; only the label and format can change.
/// Labels loaded from `.hva` files may be in a legacy code page, so the raw
/// bytes are kept and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    start: usize,
    end: usize,
    label: String,
    raw_label: Bytes,
    format: DisplayFormat,
    color_index: usize,
}

impl Annotation {
    /// Creates an annotation over the inclusive range `start..=end`
    pub fn new(
        start: usize,
        end: usize,
        label: impl Into<String>,
        format: DisplayFormat,
        color_index: usize,
    ) -> Result<Self> {
        let label = label.into();
        Self::with_raw_label(start, end, label.into_bytes(), format, color_index)
    }

    /// Creates an annotation whose label is not necessarily UTF-8.
    ///
    /// `color_index` must be below [`PALETTE_SIZE`].
    pub fn with_raw_label(
        start: usize,
        end: usize,
        raw_label: impl Into<Bytes>,
        format: DisplayFormat,
        color_index: usize,
    ) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        if color_index >= PALETTE_SIZE {
            return Err(Error::InvalidColor { index: color_index });
        }
        let raw_label = raw_label.into();
        Ok(Self {
            start,
            end,
            label: String::from_utf8_lossy(&raw_label).into_owned(),
            raw_label,
            format,
            color_index,
        })
    }

    /// First annotated offset
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last annotated offset (inclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    /// Annotated offsets as an inclusive range
    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Number of annotated bytes
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: an annotation covers at least one byte
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if `offset` lies inside the annotation
    pub fn contains(&self, offset: usize) -> bool {
        self.range().contains(&offset)
    }

    /// Returns true if the two annotations share at least one byte
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start <= end && start <= self.end
    }

    /// Annotation label, with invalid UTF-8 replaced
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Annotation label exactly as stored
    pub fn raw_label(&self) -> &[u8] {
        &self.raw_label
    }

    /// Display format
    pub fn format(&self) -> DisplayFormat {
        self.format
    }

    /// Palette index assigned at creation
    pub fn color_index(&self) -> usize {
        self.color_index
    }

    /// Palette color assigned at creation
    pub fn color(&self) -> Rgb {
        palette::color(self.color_index)
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.raw_label = Bytes::from(label.clone().into_bytes());
        self.label = label;
    }

    pub(crate) fn set_format(&mut self, format: DisplayFormat) {
        self.format = format;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_geometry() {
        let a = Annotation::new(10, 20, "header", DisplayFormat::Hex, 0).unwrap();
        assert_eq!(a.len(), 11);
        assert!(a.contains(10));
        assert!(a.contains(20));
        assert!(!a.contains(21));
        assert!(a.overlaps(20, 30));
        assert!(a.overlaps(0, 10));
        assert!(!a.overlaps(21, 30));
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(matches!(
            Annotation::new(5, 4, "x", DisplayFormat::Int, 0),
            Err(Error::InvalidRange { start: 5, end: 4 })
        ));
    }

    #[test]
    fn test_color_index_must_be_in_palette() {
        assert!(Annotation::new(0, 1, "x", DisplayFormat::Hex, PALETTE_SIZE - 1).is_ok());
        assert!(matches!(
            Annotation::new(0, 1, "x", DisplayFormat::Hex, 7),
            Err(Error::InvalidColor { index: 7 })
        ));
    }

    #[test]
    fn test_raw_label_is_kept() {
        let mut a = Annotation::with_raw_label(0, 3, &b"caf\xE9"[..], DisplayFormat::Ascii, 0).unwrap();
        assert_eq!(a.raw_label(), b"caf\xE9");
        assert_eq!(a.label(), "caf\u{FFFD}");

        a.set_label("tea".to_string());
        assert_eq!(a.raw_label(), b"tea");
        assert_eq!(a.label(), "tea");
    }

    #[test]
    fn test_raw_document_name() {
        let doc = Document::with_raw_name(&b"caf\xE9.bin"[..], vec![0u8; 4]);
        assert_eq!(doc.raw_name(), b"caf\xE9.bin");
        assert_eq!(doc.name(), "caf\u{FFFD}.bin");
        assert_eq!(Document::new("a.bin", vec![0u8]).raw_name(), b"a.bin");
    }

    #[test]
    fn test_document_bounds() {
        let doc = Document::new("a.bin", vec![0u8; 32]);
        assert!(doc.contains_range(0, 31));
        assert!(!doc.contains_range(0, 32));
        assert!(!doc.contains_range(8, 7));
    }

    #[test]
    fn test_open_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firmware.bin");
        std::fs::write(&path, [1, 2, 3]).unwrap();

        let doc = Document::open(&path).unwrap();
        assert_eq!(doc.name(), "firmware.bin");
        assert_eq!(doc.as_bytes(), &[1, 2, 3]);

        let missing = Document::open(dir.path().join("missing.bin"));
        assert!(matches!(missing, Err(Error::FileRead { .. })));
    }
}
