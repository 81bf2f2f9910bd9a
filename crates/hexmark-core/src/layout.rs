//! Row geometry for the wrapped hex grid.
//!
//! The grid shows [`ROW_WIDTH`] bytes per row, with a hex region and a
//! parallel text region that use the same columns. An annotation is a 1-D
//! byte interval; [`RowProjector`] cuts it into one [`RowSegment`] per
//! visible row, telling the renderer which columns to outline, which corners
//! are rounded, where the label goes and which slice of the decoded value to
//! draw in the text region.
//!
//! ## Continuation text
//!
//! The decoded value is drawn starting at the annotation's first column and
//! continues at column 0 of each following row. The characters already shown
//! before a row are estimated as
//!
//! ```text
//! floor(bytes_in_prior_rows * value_len / annotation_len)
//! ```
//!
//! which is exact only when the value length is a multiple of the byte
//! length. Renderers rely on this split staying as it is.

use crate::index::AnnotationInfo;

/// Bytes per grid row
pub const ROW_WIDTH: usize = 16;

/// Number of grid rows needed for `len` bytes
pub fn total_rows(len: usize) -> usize {
    len.div_ceil(ROW_WIDTH)
}

/// Which part of an annotation a row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// The whole annotation fits in this row
    Single,
    /// First row of a multi-row annotation
    First,
    /// Interior row of a multi-row annotation
    Middle,
    /// Last row of a multi-row annotation
    Last,
}

impl RowKind {
    fn classify(row: usize, start_row: usize, end_row: usize) -> Self {
        if start_row == end_row {
            RowKind::Single
        } else if row == start_row {
            RowKind::First
        } else if row == end_row {
            RowKind::Last
        } else {
            RowKind::Middle
        }
    }

    /// The outline is closed with rounded corners on the left
    pub fn rounded_left(&self) -> bool {
        matches!(self, RowKind::Single | RowKind::First)
    }

    /// The outline is closed with rounded corners on the right
    pub fn rounded_right(&self) -> bool {
        matches!(self, RowKind::Single | RowKind::Last)
    }
}

/// Inclusive column range within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnSpan {
    /// First column
    pub start: usize,
    /// Last column (inclusive)
    pub end: usize,
}

impl ColumnSpan {
    /// Number of columns covered
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a span covers at least one column
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Geometry of one annotation on one grid row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSegment {
    /// Absolute row number
    pub row: usize,
    /// Part of the annotation this row shows
    pub kind: RowKind,
    /// Columns to outline in the hex region
    pub hex_columns: ColumnSpan,
    /// Columns to outline in the text region
    pub text_columns: ColumnSpan,
    /// The label is anchored on this row
    pub draws_label: bool,
    /// Slice of the decoded value drawn at the start of `text_columns`
    pub value_text: Option<String>,
}

/// The rows currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Topmost visible row (the scroll position)
    pub first_row: usize,
    /// Number of visible rows
    pub row_count: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            first_row: 0,
            row_count: usize::MAX,
        }
    }
}

impl Viewport {
    /// Creates a viewport showing `row_count` rows from `first_row`
    pub fn new(first_row: usize, row_count: usize) -> Self {
        Self {
            first_row,
            row_count,
        }
    }

    /// Sets the scroll position
    pub fn first_row(mut self, row: usize) -> Self {
        self.first_row = row;
        self
    }

    /// Sets the number of visible rows
    pub fn row_count(mut self, count: usize) -> Self {
        self.row_count = count;
        self
    }

    /// Clamps the scroll position so the viewport does not start past the
    /// last full page of a grid with `total_rows` rows
    pub fn clamped(mut self, total_rows: usize) -> Self {
        let max_first = total_rows.saturating_sub(self.row_count);
        self.first_row = self.first_row.min(max_first);
        self
    }

    /// Last visible row (inclusive)
    pub fn last_row(&self) -> usize {
        self.first_row
            .saturating_add(self.row_count.saturating_sub(1))
    }

    /// Returns true if `row` is on screen
    pub fn contains(&self, row: usize) -> bool {
        self.row_count > 0 && row >= self.first_row && row <= self.last_row()
    }
}

/// Projects annotations onto the visible rows of the grid
#[derive(Debug, Clone, Copy, Default)]
pub struct RowProjector {
    viewport: Viewport,
}

impl RowProjector {
    /// Creates a projector for the given viewport
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    /// Returns the viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Rows of the inclusive byte range `start..=end` that are on screen.
    ///
    /// Segments carry geometry only; `value_text` is always `None`.
    pub fn project_range(&self, start: usize, end: usize) -> Vec<RowSegment> {
        let start_row = start / ROW_WIDTH;
        let end_row = end / ROW_WIDTH;

        if self.viewport.row_count == 0
            || end_row < self.viewport.first_row
            || start_row > self.viewport.last_row()
        {
            return Vec::new();
        }

        let first_visible = start_row.max(self.viewport.first_row);
        let last_visible = end_row.min(self.viewport.last_row());

        (first_visible..=last_visible)
            .map(|row| {
                let columns = ColumnSpan {
                    start: if row == start_row { start % ROW_WIDTH } else { 0 },
                    end: if row == end_row { end % ROW_WIDTH } else { ROW_WIDTH - 1 },
                };
                RowSegment {
                    row,
                    kind: RowKind::classify(row, start_row, end_row),
                    hex_columns: columns,
                    text_columns: columns,
                    draws_label: row == first_visible,
                    value_text: None,
                }
            })
            .collect()
    }

    /// Rows of an indexed annotation that are on screen, with the slice of
    /// its decoded value each row displays
    pub fn project(&self, info: &AnnotationInfo) -> Vec<RowSegment> {
        let start = info.start_offset;
        let mut segments = self.project_range(start, info.end_offset());

        for segment in &mut segments {
            segment.value_text = if segment.row == start / ROW_WIDTH {
                let room = ROW_WIDTH - segment.text_columns.start;
                Some(info.formatted_value.chars().take(room).collect())
            } else {
                let bytes_before = segment.row * ROW_WIDTH - start;
                continuation_text(&info.formatted_value, info.length, bytes_before)
            };
        }

        segments
    }
}

/// Remainder of `value` for a row that starts `bytes_before` bytes into an
/// annotation of `annotation_len` bytes, clipped to one row.
///
/// Returns `None` once the estimate says the whole value was already shown.
pub fn continuation_text(value: &str, annotation_len: usize, bytes_before: usize) -> Option<String> {
    if annotation_len == 0 {
        return None;
    }
    let value_len = value.chars().count();
    let consumed = (bytes_before as u128 * value_len as u128 / annotation_len as u128) as usize;
    if consumed >= value_len {
        return None;
    }
    Some(value.chars().skip(consumed).take(ROW_WIDTH).collect())
}

/// Plain text of one grid row, drawn underneath the annotation overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow<'a> {
    /// Absolute row number
    pub row: usize,
    /// The row's bytes; shorter than [`ROW_WIDTH`] only on the last row
    pub bytes: &'a [u8],
}

impl<'a> GridRow<'a> {
    /// Returns row `row` of `data`, or `None` past the end
    pub fn new(data: &'a [u8], row: usize) -> Option<Self> {
        let start = row.checked_mul(ROW_WIDTH)?;
        if start >= data.len() {
            return None;
        }
        let end = (start + ROW_WIDTH).min(data.len());
        Some(Self {
            row,
            bytes: &data[start..end],
        })
    }

    /// Offset of the row's first byte
    pub fn offset(&self) -> usize {
        self.row * ROW_WIDTH
    }

    /// Eight uppercase hex digits of the row offset
    pub fn offset_label(&self) -> String {
        format!("{:08X}", self.offset())
    }

    /// Hex cell for a column, `None` past the end of the document
    pub fn hex_cell(&self, column: usize) -> Option<String> {
        self.bytes.get(column).map(|b| format!("{:02X}", b))
    }

    /// Printable-ASCII column, padded with spaces to [`ROW_WIDTH`]
    pub fn ascii(&self) -> String {
        (0..ROW_WIDTH)
            .map(|col| {
                self.bytes
                    .get(col)
                    .map_or(' ', |&b| crate::codec::printable(b))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(start: usize, end: usize, value: &str) -> AnnotationInfo {
        AnnotationInfo {
            formatted_value: value.to_string(),
            color_index: 0,
            length: end - start + 1,
            start_offset: start,
            annotation_index: 0,
        }
    }

    fn span(start: usize, end: usize) -> ColumnSpan {
        ColumnSpan { start, end }
    }

    #[test]
    fn test_two_row_annotation() {
        let segments = RowProjector::default().project_range(10, 20);
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].row, 0);
        assert_eq!(segments[0].kind, RowKind::First);
        assert_eq!(segments[0].hex_columns, span(10, 15));
        assert_eq!(segments[0].text_columns, span(10, 15));

        assert_eq!(segments[1].row, 1);
        assert_eq!(segments[1].kind, RowKind::Last);
        assert_eq!(segments[1].hex_columns, span(0, 4));
    }

    #[test]
    fn test_kinds() {
        let kinds: Vec<RowKind> = RowProjector::default()
            .project_range(4, 60)
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![RowKind::First, RowKind::Middle, RowKind::Middle, RowKind::Last]
        );

        let single = RowProjector::default().project_range(17, 19);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].kind, RowKind::Single);
        assert_eq!(single[0].hex_columns, span(1, 3));
        assert!(single[0].kind.rounded_left() && single[0].kind.rounded_right());
        assert!(!RowKind::Middle.rounded_left() && !RowKind::Middle.rounded_right());
    }

    #[test]
    fn test_viewport_clipping_and_label_anchor() {
        // rows 0..=5, screen shows rows 2..=3
        let projector = RowProjector::new(Viewport::new(2, 2));
        let segments = projector.project_range(3, 90);
        let rows: Vec<usize> = segments.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![2, 3]);
        assert!(segments.iter().all(|s| s.kind == RowKind::Middle));
        assert!(segments[0].draws_label);
        assert!(!segments[1].draws_label);

        let visible_start = RowProjector::new(Viewport::new(0, 2)).project_range(3, 90);
        assert!(visible_start[0].draws_label);
        assert_eq!(visible_start[0].row, 0);
    }

    #[test]
    fn test_offscreen_annotation() {
        let projector = RowProjector::new(Viewport::new(10, 5));
        assert!(projector.project_range(0, 100).is_empty());
        assert!(projector.project_range(16 * 15, 16 * 15 + 3).is_empty());
        assert!(RowProjector::new(Viewport::new(0, 0)).project_range(0, 3).is_empty());
    }

    #[test]
    fn test_first_row_text_is_clipped() {
        let segments = RowProjector::default().project(&info(12, 13, "ABCDEFGH"));
        assert_eq!(segments[0].value_text.as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_continuation_text_exact_split() {
        // ascii: one character per byte, split lines up exactly
        let value: String = ('a'..='z').chain('A'..='F').collect();
        let segments = RowProjector::default().project(&info(8, 39, &value));
        let texts: Vec<Option<&str>> = segments.iter().map(|s| s.value_text.as_deref()).collect();
        assert_eq!(
            texts,
            vec![Some("abcdefgh"), Some("ijklmnopqrstuvwx"), Some("yzABCDEF")]
        );
    }

    #[test]
    fn test_continuation_text_is_proportional() {
        // hex: 3 characters per byte, 20 bytes from column 10
        let value = "00 ".repeat(20);
        let projector = RowProjector::default();
        let segments = projector.project(&info(10, 29, &value));
        assert_eq!(segments.len(), 2);
        // 6 bytes in the first row -> 18 characters consumed
        assert_eq!(continuation_text(&value, 20, 6).unwrap().len(), ROW_WIDTH);
        assert_eq!(segments[1].value_text, continuation_text(&value, 20, 6));

        // 7 characters over 3 bytes: floor(1 * 7 / 3) = 2
        assert_eq!(continuation_text("1234567", 3, 1).as_deref(), Some("34567"));
        assert_eq!(continuation_text("12", 3, 2).as_deref(), Some("2"));
        assert_eq!(continuation_text("12", 2, 2), None);
        assert_eq!(continuation_text("", 3, 1), None);
    }

    #[test]
    fn test_scrolled_annotation_uses_continuation() {
        let value: String = std::iter::repeat('x').take(40).collect();
        let projector = RowProjector::new(Viewport::new(1, 4));
        let segments = projector.project(&info(0, 39, &value));
        assert_eq!(segments[0].row, 1);
        assert!(segments[0].draws_label);
        assert_eq!(segments[0].value_text.as_deref().map(str::len), Some(16));
    }

    #[test]
    fn test_viewport() {
        let vp = Viewport::new(8, 4);
        assert_eq!(vp.last_row(), 11);
        assert!(vp.contains(8) && vp.contains(11));
        assert!(!vp.contains(12) && !vp.contains(7));
        assert_eq!(vp.clamped(10).first_row, 6);
        assert_eq!(Viewport::new(3, 20).clamped(10).first_row, 0);
        assert!(Viewport::default().contains(usize::MAX - 1));
    }

    #[test]
    fn test_grid_row() {
        let data: Vec<u8> = (0x3Eu8..0x52).collect();
        assert_eq!(total_rows(data.len()), 2);
        assert_eq!(total_rows(0), 0);
        assert_eq!(total_rows(32), 2);

        let row = GridRow::new(&data, 1).unwrap();
        assert_eq!(row.offset_label(), "00000010");
        assert_eq!(row.hex_cell(0).as_deref(), Some("4E"));
        assert_eq!(row.hex_cell(4), None);
        assert_eq!(row.ascii(), "NOPQ            ");
        assert!(GridRow::new(&data, 2).is_none());
    }
}
