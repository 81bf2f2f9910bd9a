//! Offset-to-annotation lookup.
//!
//! [`AnnotationIndex`] is a sorted array of `(start, end)` intervals with the
//! decoded display text of each annotation precomputed. Lookups binary-search
//! for the last interval starting at or before the offset and check only that
//! one, which is exact as long as annotations do not overlap.
//!
//! The index is immutable. Any change to the document or the annotations
//! means building a new one with [`AnnotationIndex::rebuild`].

use crate::codec::format_span;
use crate::document::Annotation;
use tracing::debug;

/// Decoded view of one annotation, cached in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationInfo {
    /// The span decoded under the annotation's display format
    pub formatted_value: String,
    /// Palette index
    pub color_index: usize,
    /// Number of annotated bytes
    pub length: usize,
    /// First annotated offset
    pub start_offset: usize,
    /// Position of the annotation in creation order
    pub annotation_index: usize,
}

impl AnnotationInfo {
    /// Last annotated offset (inclusive)
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.length - 1
    }
}

#[derive(Debug, Clone)]
struct IntervalEntry {
    start: usize,
    end: usize,
    info: AnnotationInfo,
}

/// Sorted interval index over a set of annotations
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    entries: Vec<IntervalEntry>,
}

impl AnnotationIndex {
    /// Builds an index from annotations in creation order.
    ///
    /// Each span is decoded against `data` once here; queries only hand out
    /// the cached text.
    pub fn rebuild(annotations: &[Annotation], data: &[u8]) -> Self {
        let mut entries: Vec<IntervalEntry> = annotations
            .iter()
            .enumerate()
            .map(|(i, anno)| IntervalEntry {
                start: anno.start(),
                end: anno.end(),
                info: AnnotationInfo {
                    formatted_value: format_span(data, anno.start(), anno.len(), anno.format()),
                    color_index: anno.color_index(),
                    length: anno.len(),
                    start_offset: anno.start(),
                    annotation_index: i,
                },
            })
            .collect();

        entries.sort_by_key(|e| (e.start, e.end));

        debug!("Rebuilt annotation index: {} intervals", entries.len());
        Self { entries }
    }

    /// Returns the annotation covering `offset`.
    ///
    /// Only the interval with the greatest start `<= offset` is inspected, so
    /// with overlapping annotations an offset inside an earlier interval can
    /// be reported as uncovered.
    pub fn query(&self, offset: usize) -> Option<&AnnotationInfo> {
        let after = self.entries.partition_point(|e| e.start <= offset);
        let entry = self.entries.get(after.checked_sub(1)?)?;
        (offset <= entry.end).then_some(&entry.info)
    }

    /// Returns every annotation covering `offset`, in `(start, end)` order.
    ///
    /// Linear in the number of intervals starting at or before `offset`.
    pub fn query_all(&self, offset: usize) -> impl Iterator<Item = &AnnotationInfo> + '_ {
        let after = self.entries.partition_point(|e| e.start <= offset);
        self.entries[..after]
            .iter()
            .filter(move |e| offset <= e.end)
            .map(|e| &e.info)
    }

    /// Number of indexed annotations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no annotations are indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed annotations in `(start, end)` order
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationInfo> + '_ {
        self.entries.iter().map(|e| &e.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DisplayFormat;
    use pretty_assertions::assert_eq;

    fn anno(start: usize, end: usize, format: DisplayFormat) -> Annotation {
        Annotation::new(start, end, "a", format, 0).unwrap()
    }

    #[test]
    fn test_query_disjoint() {
        let data: Vec<u8> = (0..64).collect();
        let annotations = vec![
            anno(40, 47, DisplayFormat::Hex),
            anno(0, 3, DisplayFormat::Int),
            anno(10, 20, DisplayFormat::Ascii),
        ];
        let index = AnnotationIndex::rebuild(&annotations, &data);

        for offset in 0..64 {
            let expected = annotations.iter().position(|a| a.contains(offset));
            assert_eq!(
                index.query(offset).map(|i| i.annotation_index),
                expected,
                "offset {offset}"
            );
        }
        assert!(index.query(1000).is_none());
    }

    #[test]
    fn test_info_is_precomputed() {
        let data = (-1i32).to_le_bytes();
        let index = AnnotationIndex::rebuild(&[anno(0, 3, DisplayFormat::Int)], &data);
        let info = index.query(2).unwrap();
        assert_eq!(info.formatted_value, "-1");
        assert_eq!(info.length, 4);
        assert_eq!(info.start_offset, 0);
        assert_eq!(info.end_offset(), 3);
    }

    #[test]
    fn test_sorted_by_start_then_end() {
        let data = [0u8; 16];
        let annotations = vec![
            anno(4, 9, DisplayFormat::Hex),
            anno(4, 5, DisplayFormat::Hex),
            anno(0, 1, DisplayFormat::Hex),
        ];
        let index = AnnotationIndex::rebuild(&annotations, &data);
        let order: Vec<usize> = index.iter().map(|i| i.annotation_index).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_overlap_single_candidate() {
        let data = [0u8; 32];
        // 0..=20 fully contains 5..=6; offset 10 is past the later interval
        let annotations = vec![anno(0, 20, DisplayFormat::Hex), anno(5, 6, DisplayFormat::Hex)];
        let index = AnnotationIndex::rebuild(&annotations, &data);

        assert!(index.query(10).is_none());
        let all: Vec<usize> = index.query_all(10).map(|i| i.annotation_index).collect();
        assert_eq!(all, vec![0]);
        let all: Vec<usize> = index.query_all(5).map(|i| i.annotation_index).collect();
        assert_eq!(all, vec![0, 1]);
    }

    #[test]
    fn test_empty_index() {
        let index = AnnotationIndex::default();
        assert!(index.is_empty());
        assert!(index.query(0).is_none());
        assert_eq!(index.query_all(0).count(), 0);
    }
}
