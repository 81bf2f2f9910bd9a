//! # hexmark-core
//!
//! A library for labeling byte ranges of binary files and drawing those labels
//! over a hex grid.
//!
//! This crate provides the core functionality for:
//! - Decoding raw byte spans into display text under a fixed set of formats
//! - Looking up the annotation that covers a byte offset
//! - Cutting annotations into per-row geometry for a 16-byte-wide grid
//! - Saving and loading annotation sets in the `.hva` file format
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`]: Span decoding and fixed-width primitive read-outs
//! - [`index`]: Sorted interval index with cached decoded values
//! - [`layout`]: Row projection and grid text
//! - [`persist`]: The `.hva` file format
//! - [`session`]: Document plus annotations, with index rebuilds on edit
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use hexmark_core::{DisplayFormat, RowProjector, Session, Viewport};
//!
//! let mut session = Session::open("./firmware.bin")?;
//! session.add_annotation(0, 3, "magic", DisplayFormat::Hex)?;
//! session.add_annotation(4, 7, "length", DisplayFormat::Int)?;
//!
//! let projector = RowProjector::new(Viewport::new(0, 24));
//! for info in session.index().iter() {
//!     for segment in projector.project(info) {
//!         println!("row {} {:?} {:?}", segment.row, segment.kind, segment.value_text);
//!     }
//! }
//!
//! session.save("./firmware.bin.hva")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod document;
pub mod error;
pub mod index;
pub mod layout;
pub mod palette;
pub mod persist;
pub mod session;

// Re-export primary types for convenience
pub use codec::{format_at_offset, format_span, DisplayFormat, PrimitiveType, Readout};
pub use document::{Annotation, Document};
pub use error::{Error, Result};
pub use index::{AnnotationIndex, AnnotationInfo};
pub use layout::{ColumnSpan, GridRow, RowKind, RowProjector, RowSegment, Viewport, ROW_WIDTH};
pub use persist::{LoadOutcome, LoadWarning};
pub use session::{Session, SessionConfig};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
