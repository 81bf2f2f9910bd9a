//! Error types for the hexmark-core library.
//!
//! Only failures that abort an operation live here. Conditions the core
//! recovers from locally (records skipped on load, decodes that run out of
//! bytes, newer file versions) are reported as values instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hexmark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all hexmark operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The annotation file does not start with the `HVA\0` signature
    #[error("invalid annotation file signature: {found:02X?}")]
    InvalidSignature {
        /// The four bytes found where the signature was expected
        found: [u8; 4],
    },

    /// The annotation file ended early or carries an impossible length field
    #[error("truncated annotation file at offset {offset}: {details}")]
    Truncated {
        /// Byte offset where the read failed
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Save was requested for an empty annotation list
    #[error("no annotations to save")]
    NothingToSave,

    /// A display format name outside the fixed vocabulary
    #[error("unknown display format '{name}' (expected one of hex, int, float, double, ascii, unicode)")]
    UnknownFormat {
        /// The rejected format name
        name: String,
    },

    /// Start offset lies after end offset
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start offset
        start: usize,
        /// Requested end offset
        end: usize,
    },

    /// Color index past the end of the palette
    #[error("color index {index} is outside the palette")]
    InvalidColor {
        /// Requested palette index
        index: usize,
    },

    /// Offset outside the document
    #[error("offset {offset} is outside the document ({len} bytes)")]
    OutOfBounds {
        /// The offending offset
        offset: usize,
        /// Document length
        len: usize,
    },

    /// A new annotation would overlap an existing one
    #[error("range {start}..={end} overlaps annotation #{existing}")]
    OverlappingAnnotation {
        /// Requested start offset
        start: usize,
        /// Requested end offset
        end: usize,
        /// Index of the annotation already covering part of the range
        existing: usize,
    },

    /// Annotation label is empty
    #[error("annotation label must not be empty")]
    EmptyLabel,

    /// Annotation label exceeds the configured maximum
    #[error("annotation label is {len} characters long (max {max})")]
    LabelTooLong {
        /// Actual label length in characters
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// No annotation exists at the given position
    #[error("no annotation at index {index} ({count} annotations)")]
    AnnotationNotFound {
        /// Requested index
        index: usize,
        /// Number of annotations in the session
        count: usize,
    },

    /// A value does not fit the 32-bit signed field of the file format
    #[error("{field} value {value} does not fit a 32-bit file field")]
    OffsetOverflow {
        /// Name of the field being written
        field: &'static str,
        /// The value that overflowed
        value: usize,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new truncation error
    pub fn truncated(offset: usize, details: impl Into<String>) -> Self {
        Self::Truncated {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new unknown format error
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat { name: name.into() }
    }

    /// Returns true if the error came from the `.hva` parser rather than
    /// from I/O or annotation validation
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidSignature { .. } | Self::Truncated { .. })
    }

    /// Returns true if the user can correct the input and retry the same
    /// edit without any state having changed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownFormat { .. }
                | Self::InvalidRange { .. }
                | Self::InvalidColor { .. }
                | Self::OutOfBounds { .. }
                | Self::OverlappingAnnotation { .. }
                | Self::EmptyLabel
                | Self::LabelTooLong { .. }
                | Self::AnnotationNotFound { .. }
        )
    }
}
