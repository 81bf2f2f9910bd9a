//! A document plus its annotations.
//!
//! [`Session`] is the handle a host keeps per open document. Each edit runs
//! to completion and then rebuilds the [`AnnotationIndex`] wholesale,
//! swapping in a new `Arc`. Readers holding an older snapshot from
//! [`Session::index`] keep a consistent view.
//!
//! The session does no locking. A multi-threaded host should put the session
//! behind one exclusive lock that covers each edit, and hand readers index
//! snapshots.

use crate::codec::DisplayFormat;
use crate::document::{Annotation, Document};
use crate::error::{Error, Result};
use crate::index::{AnnotationIndex, AnnotationInfo};
use crate::palette;
use crate::persist::{self, LoadOutcome};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for annotation editing
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Longest accepted label, in characters
    pub max_label_len: usize,
    /// Refuse new annotations that share bytes with an existing one
    pub reject_overlaps: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_label_len: 255,
            reject_overlaps: true,
        }
    }
}

impl SessionConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum label length
    pub fn max_label_len(mut self, len: usize) -> Self {
        self.max_label_len = len;
        self
    }

    /// Sets whether overlapping annotations are refused
    pub fn reject_overlaps(mut self, reject: bool) -> Self {
        self.reject_overlaps = reject;
        self
    }
}

/// An open document with its annotations and lookup index
#[derive(Debug)]
pub struct Session {
    document: Document,
    annotations: Vec<Annotation>,
    index: Arc<AnnotationIndex>,
    config: SessionConfig,
}

impl Session {
    /// Creates a session with no annotations
    pub fn new(document: Document) -> Self {
        Self::with_config(document, SessionConfig::default())
    }

    /// Creates a session with custom configuration
    pub fn with_config(document: Document, config: SessionConfig) -> Self {
        Self {
            document,
            annotations: Vec::new(),
            index: Arc::new(AnnotationIndex::default()),
            config,
        }
    }

    /// Opens the file at `path` as a new session
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Document::open(path)?))
    }

    /// Returns the document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Annotations in creation order
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Returns a snapshot of the current index
    pub fn index(&self) -> Arc<AnnotationIndex> {
        Arc::clone(&self.index)
    }

    /// Returns the annotation covering `offset`, via the index
    pub fn query(&self, offset: usize) -> Option<&AnnotationInfo> {
        self.index.query(offset)
    }

    /// Returns the first annotation, in creation order, containing `offset`
    pub fn annotation_at(&self, offset: usize) -> Option<usize> {
        self.annotations.iter().position(|a| a.contains(offset))
    }

    /// Annotates a selection.
    ///
    /// The selection ends may come in either order. The new annotation is
    /// colored by its position in creation order.
    pub fn add_annotation(
        &mut self,
        anchor: usize,
        cursor: usize,
        label: &str,
        format: DisplayFormat,
    ) -> Result<usize> {
        let (start, end) = (anchor.min(cursor), anchor.max(cursor));
        self.check_label(label)?;
        if !self.document.contains_range(start, end) {
            return Err(Error::OutOfBounds {
                offset: end,
                len: self.document.len(),
            });
        }
        if self.config.reject_overlaps {
            if let Some(existing) = self.annotations.iter().position(|a| a.overlaps(start, end)) {
                return Err(Error::OverlappingAnnotation {
                    start,
                    end,
                    existing,
                });
            }
        }

        let color = palette::color_for_position(self.annotations.len());
        self.annotations
            .push(Annotation::new(start, end, label, format, color)?);
        info!("Added annotation '{}' at {}..={}", label, start, end);

        self.rebuild();
        Ok(self.annotations.len() - 1)
    }

    /// Changes the label and format of an annotation
    pub fn update_annotation(&mut self, index: usize, label: &str, format: DisplayFormat) -> Result<()> {
        self.check_label(label)?;
        let count = self.annotations.len();
        let anno = self
            .annotations
            .get_mut(index)
            .ok_or(Error::AnnotationNotFound { index, count })?;

        anno.set_label(label.to_string());
        anno.set_format(format);
        info!("Updated annotation #{} to '{}' ({})", index, label, format);

        self.rebuild();
        Ok(())
    }

    /// Removes an annotation; later annotations keep their colors
    pub fn remove_annotation(&mut self, index: usize) -> Result<Annotation> {
        let count = self.annotations.len();
        if index >= count {
            return Err(Error::AnnotationNotFound { index, count });
        }
        let removed = self.annotations.remove(index);
        info!("Removed annotation '{}'", removed.label());

        self.rebuild();
        Ok(removed)
    }

    /// Writes the annotations to an `.hva` file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::save(path, &self.document, &self.annotations)
    }

    /// Parses an `.hva` file against this document without applying it
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadOutcome> {
        persist::load(path, &self.document)
    }

    /// Replaces all annotations with a loaded set
    pub fn apply_loaded(&mut self, outcome: LoadOutcome) {
        debug!(
            "Replacing {} annotations with {} loaded",
            self.annotations.len(),
            outcome.annotations.len()
        );
        self.annotations = outcome.annotations;
        self.rebuild();
    }

    fn check_label(&self, label: &str) -> Result<()> {
        if label.is_empty() {
            return Err(Error::EmptyLabel);
        }
        let len = label.chars().count();
        if len > self.config.max_label_len {
            return Err(Error::LabelTooLong {
                len,
                max: self.config.max_label_len,
            });
        }
        Ok(())
    }

    fn rebuild(&mut self) {
        self.index = Arc::new(AnnotationIndex::rebuild(
            &self.annotations,
            self.document.as_bytes(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(len: usize) -> Session {
        Session::new(Document::new("t.bin", (0..len).map(|i| i as u8).collect::<Vec<u8>>()))
    }

    #[test]
    fn test_add_normalizes_selection() {
        let mut s = session(64);
        let i = s.add_annotation(20, 10, "field", DisplayFormat::Hex).unwrap();
        assert_eq!(i, 0);
        assert_eq!(s.annotations()[0].range(), 10..=20);
        assert_eq!(s.query(15).unwrap().annotation_index, 0);
    }

    #[test]
    fn test_colors_cycle_by_creation_order() {
        let mut s = session(64);
        for i in 0..8 {
            s.add_annotation(i * 4, i * 4 + 1, "x", DisplayFormat::Hex).unwrap();
        }
        let colors: Vec<usize> = s.annotations().iter().map(|a| a.color_index()).collect();
        assert_eq!(colors, vec![0, 1, 2, 3, 4, 5, 0, 1]);

        s.remove_annotation(0).unwrap();
        assert_eq!(s.annotations()[0].color_index(), 1);
    }

    #[test]
    fn test_validation() {
        let mut s = session(32);
        assert!(matches!(
            s.add_annotation(0, 1, "", DisplayFormat::Hex),
            Err(Error::EmptyLabel)
        ));
        assert!(matches!(
            s.add_annotation(30, 32, "x", DisplayFormat::Hex),
            Err(Error::OutOfBounds { offset: 32, len: 32 })
        ));

        s.add_annotation(4, 8, "a", DisplayFormat::Hex).unwrap();
        assert!(matches!(
            s.add_annotation(8, 12, "b", DisplayFormat::Hex),
            Err(Error::OverlappingAnnotation { existing: 0, .. })
        ));

        let mut short = Session::with_config(
            Document::new("t.bin", vec![0u8; 8]),
            SessionConfig::new().max_label_len(3),
        );
        assert!(matches!(
            short.add_annotation(0, 0, "long", DisplayFormat::Hex),
            Err(Error::LabelTooLong { len: 4, max: 3 })
        ));
        assert!(s.annotations().len() == 1);
    }

    #[test]
    fn test_overlaps_allowed_when_configured() {
        let mut s = Session::with_config(
            Document::new("t.bin", vec![0u8; 32]),
            SessionConfig::new().reject_overlaps(false),
        );
        s.add_annotation(0, 20, "outer", DisplayFormat::Hex).unwrap();
        s.add_annotation(5, 6, "inner", DisplayFormat::Hex).unwrap();
        assert_eq!(s.annotation_at(10), Some(0));
        assert_eq!(s.index().query_all(5).count(), 2);
    }

    #[test]
    fn test_update_rebuilds_index() {
        let mut s = session(16);
        s.add_annotation(0, 1, "word", DisplayFormat::Hex).unwrap();
        let before = s.index();
        assert_eq!(before.query(0).unwrap().formatted_value, "00 01 ");

        s.update_annotation(0, "word", DisplayFormat::Int).unwrap();
        assert_eq!(s.query(0).unwrap().formatted_value, "256");
        // the old snapshot is untouched
        assert_eq!(before.query(0).unwrap().formatted_value, "00 01 ");

        assert!(matches!(
            s.update_annotation(3, "x", DisplayFormat::Hex),
            Err(Error::AnnotationNotFound { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_remove() {
        let mut s = session(16);
        s.add_annotation(0, 1, "a", DisplayFormat::Hex).unwrap();
        s.add_annotation(2, 3, "b", DisplayFormat::Hex).unwrap();

        let removed = s.remove_annotation(0).unwrap();
        assert_eq!(removed.label(), "a");
        assert!(s.query(0).is_none());
        assert_eq!(s.query(2).unwrap().annotation_index, 0);
        assert!(s.remove_annotation(5).is_err());
    }
}
