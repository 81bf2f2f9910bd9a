//! Plain-text rendering of the hex grid with annotation overlays.
//!
//! Each hex cell is four characters wide: a left edge, two hex digits and a
//! right edge. Closed ends of an annotation are drawn as `[` and `]`, ends that
//! continue on a neighbouring row as `>`. Labels go on a line above the row
//! they are anchored to. The text column shows the decoded value over the
//! annotated bytes and plain ASCII everywhere else.

use hexmark_core::layout::{GridRow, RowProjector, RowSegment, Viewport, ROW_WIDTH};
use hexmark_core::{RowKind, Session};
use std::collections::BTreeMap;

const CELL_WIDTH: usize = 4;

/// Width of the `00000000  ` offset gutter
const GUTTER: usize = 10;

pub(crate) fn render_dump(session: &Session, viewport: Viewport) -> String {
    let data = session.document().as_bytes();
    let index = session.index();
    let projector = RowProjector::new(viewport);

    let mut by_row: BTreeMap<usize, Vec<(usize, RowSegment)>> = BTreeMap::new();
    for info in index.iter() {
        for segment in projector.project(info) {
            by_row
                .entry(segment.row)
                .or_default()
                .push((info.annotation_index, segment));
        }
    }

    let mut out = String::new();
    out.push_str(&header());

    let mut row = viewport.first_row;
    while viewport.contains(row) {
        let Some(grid) = GridRow::new(data, row) else {
            break;
        };
        let segments = by_row.get(&row).map(Vec::as_slice).unwrap_or(&[]);

        let labels = label_line(session, segments);
        if !labels.is_empty() {
            out.push_str(&labels);
            out.push('\n');
        }
        out.push_str(&format!(
            "{}  {}  |{}|\n",
            grid.offset_label(),
            hex_cells(&grid, segments),
            text_column(&grid, segments)
        ));
        row += 1;
    }
    out
}

fn header() -> String {
    let mut line = format!("{:<width$}", "Offset", width = GUTTER);
    for col in 0..ROW_WIDTH {
        line.push_str(&format!(" {:02X} ", col));
    }
    line.push_str("  ASCII\n");
    line
}

fn label_line(session: &Session, segments: &[(usize, RowSegment)]) -> String {
    let mut line: Vec<char> = Vec::new();
    for (anno, segment) in segments.iter().filter(|(_, s)| s.draws_label) {
        let Some(annotation) = session.annotations().get(*anno) else {
            continue;
        };
        let at = GUTTER + segment.hex_columns.start * CELL_WIDTH;
        for (i, c) in annotation.label().chars().enumerate() {
            if line.len() <= at + i {
                line.resize(at + i + 1, ' ');
            }
            line[at + i] = c;
        }
    }
    line.into_iter().collect::<String>().trim_end().to_string()
}

fn hex_cells(grid: &GridRow<'_>, segments: &[(usize, RowSegment)]) -> String {
    let mut left = [' '; ROW_WIDTH];
    let mut right = [' '; ROW_WIDTH];
    for (_, segment) in segments {
        left[segment.hex_columns.start] = if segment.kind.rounded_left() { '[' } else { '>' };
        right[segment.hex_columns.end] = if segment.kind.rounded_right() { ']' } else { '>' };
    }

    let mut cells = String::with_capacity(ROW_WIDTH * CELL_WIDTH);
    for col in 0..ROW_WIDTH {
        cells.push(left[col]);
        cells.push_str(&grid.hex_cell(col).unwrap_or_else(|| "  ".to_string()));
        cells.push(right[col]);
    }
    cells
}

fn text_column(grid: &GridRow<'_>, segments: &[(usize, RowSegment)]) -> String {
    let mut overlay: [Option<char>; ROW_WIDTH] = [None; ROW_WIDTH];
    for (_, segment) in segments {
        let columns = segment.text_columns;
        if matches!(segment.kind, RowKind::First | RowKind::Single) {
            for cell in &mut overlay[columns.start..=columns.end] {
                *cell = Some(' ');
            }
        }
        if let Some(text) = &segment.value_text {
            for (cell, c) in overlay[columns.start..].iter_mut().zip(text.chars()) {
                *cell = Some(c);
            }
        }
    }

    let ascii: Vec<char> = grid.ascii().chars().collect();
    overlay
        .iter()
        .zip(ascii)
        .map(|(over, plain)| over.unwrap_or(plain))
        .collect()
}
