//! Per-window cell matrix.
//!
//! `CellGrid` stores `rows * cols` optional cells row-major plus one
//! significant-length entry per row. Absent cells were never written (or were
//! blanked by a scroll/clear) and paint as background only.
//!
//! Significant length is the column just past the last non-blank cell of a
//! row, as observed by the most recent line update. It is maintained with a
//! running gap counter:
//! * the counter starts at the update's start column;
//! * every written cell bumps it, and a non-space cell folds it into the
//!   length and resets it;
//! * if the result falls short of the previous length, the old tail is
//!   re-scanned from the new length up to the previous length, stopping at the
//!   first absent cell.
//!
//! Partial updates never touch columns outside the written span.

use std::sync::Arc;

use core_events::GridCell;

use crate::highlight::Highlight;

const SIGN_COLUMN_GROUPS: &[&str] = &[
    "SignColumn",
    "LineNr",
    "ALEErrorSign",
    "ALEStyleErrorSign",
    "ALEWarningSign",
    "ALEStyleWarningSign",
    "ALEInfoSign",
    "ALESignColumnWithErrors",
    "LspErrorHighlight",
    "LspWarningHighlight",
    "LspInformationHighlight",
    "LspHintHighlight",
];

/// One grid position. The highlight is a snapshot taken at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub normal_width: bool,
    pub highlight: Arc<Highlight>,
}

impl Cell {
    pub fn is_space(&self) -> bool {
        self.text == " "
    }

    /// Cells painted with a sign-column or line-number group count as
    /// indentation for indent guides.
    pub fn is_sign_column(&self) -> bool {
        SIGN_COLUMN_GROUPS.contains(&self.highlight.hl_name.as_str())
    }
}

/// Scroll region as sent by the backend (`bot` and `right` exclusive).
/// All-zero means the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollRegion {
    pub top: i64,
    pub bot: i64,
    pub left: i64,
    pub right: i64,
}

impl ScrollRegion {
    pub fn is_whole(&self) -> bool {
        self.top == 0 && self.bot == 0 && self.left == 0 && self.right == 0
    }
}

/// Outcome of a line update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineWrite {
    /// Runs that started inside the row; each one is a full-row damage hint.
    pub runs_applied: usize,
    pub cells_written: usize,
}

/// Cell-coordinate rectangle touched by a scroll (right/bottom exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellGrid {
    cols: usize,
    rows: usize,
    cells: Vec<Option<Cell>>,
    sig_len: Vec<usize>,
}

impl CellGrid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![None; cols * rows],
            sig_len: vec![0; rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col].as_ref()
    }

    pub fn row(&self, row: usize) -> Option<&[Option<Cell>]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.cells[start..start + self.cols])
    }

    pub fn significant_len(&self, row: usize) -> usize {
        self.sig_len.get(row).copied().unwrap_or(0)
    }

    /// Reallocate to `cols x rows`. With `preserve`, the overlapping top-left
    /// block and the row lengths of surviving rows carry over unchanged.
    pub fn resize(&mut self, cols: usize, rows: usize, preserve: bool) {
        let mut next = CellGrid::new(cols, rows);
        if preserve {
            let keep_cols = cols.min(self.cols);
            for r in 0..rows.min(self.rows) {
                let src = r * self.cols;
                let dst = r * cols;
                for c in 0..keep_cols {
                    next.cells[dst + c] = self.cells[src + c].take();
                }
                next.sig_len[r] = self.sig_len[r];
            }
        }
        *self = next;
    }

    /// Drop every cell and length, keeping the dimensions.
    pub fn clear(&mut self) {
        *self = CellGrid::new(self.cols, self.rows);
    }

    /// Apply one `grid_line` update.
    ///
    /// `highlight` resolves an id (it must never fail; unknown ids map to the
    /// default). `normal_width` classifies cell text against the active font.
    /// A run without an id reuses the previous run's highlight, or the cell
    /// left of the start column, or id 0.
    pub fn put_line<H, W>(
        &mut self,
        row: i64,
        col_start: i64,
        runs: &[GridCell],
        mut highlight: H,
        mut normal_width: W,
    ) -> LineWrite
    where
        H: FnMut(u64) -> Arc<Highlight>,
        W: FnMut(&str) -> bool,
    {
        let mut out = LineWrite::default();
        let (Ok(row), Ok(col_start)) = (usize::try_from(row), usize::try_from(col_start)) else {
            return out;
        };
        if row >= self.rows {
            return out;
        }
        let cols = self.cols;
        let base = row * cols;

        let mut col = col_start;
        let mut gap = col_start;
        let mut len = 0usize;
        let mut last: Option<Arc<Highlight>> = None;

        for run in runs {
            if col >= cols {
                continue;
            }
            let hl = match (run.hl_id, &last) {
                (Some(id), _) => highlight(id),
                (None, Some(prev)) => Arc::clone(prev),
                (None, None) => {
                    let left = col
                        .checked_sub(1)
                        .and_then(|c| self.cells[base + c].as_ref())
                        .map(|c| Arc::clone(&c.highlight));
                    match left {
                        Some(h) => h,
                        None => highlight(0),
                    }
                }
            };
            let normal = normal_width(&run.text);
            let repeat = run.repeat.filter(|&n| n > 0).unwrap_or(1);
            for _ in 0..repeat {
                if col >= cols {
                    break;
                }
                self.cells[base + col] = Some(Cell {
                    text: run.text.clone(),
                    normal_width: normal,
                    highlight: Arc::clone(&hl),
                });
                gap += 1;
                if run.text != " " {
                    len += gap;
                    gap = 0;
                }
                col += 1;
                out.cells_written += 1;
            }
            last = Some(hl);
            out.runs_applied += 1;
        }

        let prev = self.sig_len[row];
        if len < prev {
            gap = 0;
            for x in len..prev.min(cols) {
                let Some(cell) = &self.cells[base + x] else {
                    break;
                };
                gap += 1;
                if !cell.is_space() {
                    len += gap;
                    gap = 0;
                }
            }
        }
        self.sig_len[row] = len;
        out
    }

    /// Shift rows inside `region` by `count` (positive moves content up).
    /// Vacated rows inside the region become absent. Returns the touched
    /// rectangle, or `None` when the region does not intersect the grid.
    pub fn scroll(&mut self, region: ScrollRegion, count: i64) -> Option<CellSpan> {
        if self.rows == 0 || self.cols == 0 {
            return None;
        }
        let max_row = self.rows as i64 - 1;
        let max_col = self.cols as i64 - 1;
        let (top, bot, left, right) = if region.is_whole() {
            (0, max_row, 0, max_col)
        } else {
            (
                region.top.max(0),
                (region.bot - 1).min(max_row),
                region.left.max(0),
                (region.right - 1).min(max_col),
            )
        };
        if top > bot || left > right {
            return None;
        }
        let (left_u, right_u) = (left as usize, right as usize);

        if count > 0 {
            let mut row = top;
            while row <= bot - count {
                self.move_row(row + count, row, left_u, right_u);
                row += 1;
            }
            for row in (bot - count + 1).max(top)..=bot {
                self.blank_row(row as usize, left_u, right_u);
            }
        } else if count < 0 {
            let mut row = bot;
            while row >= top - count {
                self.move_row(row + count, row, left_u, right_u);
                row -= 1;
            }
            for row in top..(top - count).min(bot + 1) {
                self.blank_row(row as usize, left_u, right_u);
            }
        }

        Some(CellSpan {
            left: left_u,
            top: top as usize,
            right: right_u + 1,
            bottom: bot as usize + 1,
        })
    }

    // The source row is always overwritten or blanked later in the same
    // scroll, so cells are moved rather than cloned.
    fn move_row(&mut self, src: i64, dst: i64, left: usize, right: usize) {
        let (src, dst) = (src as usize, dst as usize);
        for col in left..=right {
            let cell = self.cells[src * self.cols + col].take();
            self.cells[dst * self.cols + col] = cell;
        }
        self.sig_len[dst] = self.sig_len[src];
    }

    fn blank_row(&mut self, row: usize, left: usize, right: usize) {
        for col in left..=right {
            self.cells[row * self.cols + col] = None;
        }
    }

    /// Leading blank or sign-column cells of `row`, skipping absent cells.
    /// A row made only of such cells counts as zero.
    pub fn head_space(&self, row: usize) -> usize {
        let Some(line) = self.row(row) else {
            return 0;
        };
        let mut count = 0;
        for cell in line.iter().flatten() {
            if !cell.is_space() && !cell.is_sign_column() {
                break;
            }
            count += 1;
        }
        if count == line.len() { 0 } else { count }
    }

    /// Row text with absent cells rendered as spaces.
    pub fn row_text(&self, row: usize) -> String {
        self.row(row)
            .map(|line| {
                line.iter()
                    .map(|c| c.as_ref().map_or(" ", |c| c.text.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HighlightTable;
    use core_events::{HlAttrDefine, HlAttrs, HlInfo};
    use pretty_assertions::assert_eq;

    fn table() -> HighlightTable {
        let mut t = HighlightTable::default();
        for (id, name) in [(5, "Normal"), (6, "Comment"), (7, "SignColumn")] {
            t.define(&HlAttrDefine {
                id,
                rgb_attrs: HlAttrs::default(),
                info: vec![HlInfo {
                    hi_name: Some(name.into()),
                    ..HlInfo::default()
                }],
            });
        }
        t
    }

    fn write(grid: &mut CellGrid, t: &HighlightTable, row: i64, col: i64, runs: &[GridCell]) -> LineWrite {
        grid.put_line(row, col, runs, |id| t.get(id), |_| true)
    }

    fn text(s: &str) -> Vec<GridCell> {
        s.chars().map(|c| GridCell::new(c.to_string())).collect()
    }

    #[test]
    fn line_update_writes_runs_and_inherits_highlight() {
        let t = table();
        let mut g = CellGrid::new(10, 2);
        let w = write(
            &mut g,
            &t,
            0,
            0,
            &[GridCell::new("H").with_hl(5), GridCell::new("i"), GridCell::new("-").with_hl(6).repeated(3)],
        );
        assert_eq!(w, LineWrite { runs_applied: 3, cells_written: 5 });
        assert_eq!(g.row_text(0), "Hi---     ");
        assert_eq!(g.get(0, 1).unwrap().highlight.id, 5);
        assert_eq!(g.get(0, 4).unwrap().highlight.id, 6);
        assert_eq!(g.significant_len(0), 5);
        assert!(g.get(0, 5).is_none());
    }

    #[test]
    fn missing_first_id_uses_left_neighbor_then_default() {
        let t = table();
        let mut g = CellGrid::new(6, 1);
        write(&mut g, &t, 0, 0, &[GridCell::new("a").with_hl(6)]);
        write(&mut g, &t, 0, 1, &[GridCell::new("b")]);
        assert_eq!(g.get(0, 1).unwrap().highlight.id, 6);
        write(&mut g, &t, 0, 4, &[GridCell::new("c")]);
        assert_eq!(g.get(0, 4).unwrap().highlight.id, 0);
    }

    #[test]
    fn writes_past_row_end_are_dropped() {
        let t = table();
        let mut g = CellGrid::new(3, 1);
        let w = write(&mut g, &t, 0, 1, &[GridCell::new("x").repeated(5), GridCell::new("y")]);
        assert_eq!(w.cells_written, 2);
        assert_eq!(w.runs_applied, 1);
        assert_eq!(g.row_text(0), " xx");
    }

    #[test]
    fn out_of_range_row_or_negative_col_is_noop() {
        let t = table();
        let mut g = CellGrid::new(3, 1);
        assert_eq!(write(&mut g, &t, 1, 0, &text("abc")), LineWrite::default());
        assert_eq!(write(&mut g, &t, 0, -1, &text("abc")), LineWrite::default());
        assert_eq!(g, CellGrid::new(3, 1));
    }

    #[test]
    fn zero_repeat_counts_as_one() {
        let t = table();
        let mut g = CellGrid::new(4, 1);
        write(&mut g, &t, 0, 0, &[GridCell::new("z").repeated(0)]);
        assert_eq!(g.row_text(0), "z   ");
    }

    #[test]
    fn partial_update_keeps_tail_and_rescans_length() {
        let t = table();
        let mut g = CellGrid::new(10, 1);
        write(&mut g, &t, 0, 0, &text("abcdefg"));
        assert_eq!(g.significant_len(0), 7);
        // Overwrite the head with blanks; the tail "defg" survives and the
        // length is recovered by the tail scan.
        write(&mut g, &t, 0, 0, &text("   "));
        assert_eq!(g.row_text(0), "   defg   ");
        assert_eq!(g.significant_len(0), 7);
        // Blank out the tail explicitly: length shrinks.
        write(&mut g, &t, 0, 2, &text("     "));
        assert_eq!(g.significant_len(0), 0);
    }

    #[test]
    fn tail_scan_stops_at_absent_cell() {
        let t = table();
        let mut g = CellGrid::new(8, 1);
        write(&mut g, &t, 0, 5, &text("xyz"));
        assert_eq!(g.significant_len(0), 8);
        write(&mut g, &t, 0, 0, &text(" "));
        assert_eq!(g.significant_len(0), 0, "cell 1 is absent, scan stops there");
    }

    #[test]
    fn resize_preserves_overlap_and_lengths() {
        let t = table();
        let mut g = CellGrid::new(4, 3);
        write(&mut g, &t, 0, 0, &text("abcd"));
        write(&mut g, &t, 2, 0, &text("wxyz"));
        g.resize(2, 2, true);
        assert_eq!((g.cols(), g.rows()), (2, 2));
        assert_eq!(g.row_text(0), "ab");
        assert_eq!(g.significant_len(0), 4);
        assert_eq!(g.row_text(1), "  ");
        g.resize(5, 3, true);
        assert_eq!(g.row_text(0), "ab   ");
        assert_eq!(g.significant_len(2), 0);
    }

    #[test]
    fn resize_without_preserve_starts_blank() {
        let t = table();
        let mut g = CellGrid::new(3, 1);
        write(&mut g, &t, 0, 0, &text("abc"));
        g.resize(3, 2, false);
        assert_eq!(g.row_text(0), "   ");
        assert_eq!(g.significant_len(0), 0);
    }

    fn filled(rows: usize, cols: usize) -> CellGrid {
        let t = table();
        let mut g = CellGrid::new(cols, rows);
        for r in 0..rows {
            let line: String = (0..cols).map(|_| char::from(b'a' + r as u8)).collect();
            write(&mut g, &t, r as i64, 0, &text(&line));
        }
        g
    }

    #[test]
    fn scroll_up_moves_rows_and_blanks_bottom() {
        let mut g = filled(4, 3);
        let span = g.scroll(ScrollRegion::default(), 1).unwrap();
        assert_eq!(span, CellSpan { left: 0, top: 0, right: 3, bottom: 4 });
        assert_eq!(g.row_text(0), "bbb");
        assert_eq!(g.row_text(2), "ddd");
        assert_eq!(g.row_text(3), "   ");
    }

    #[test]
    fn scroll_down_inside_region_and_columns() {
        let mut g = filled(4, 4);
        let region = ScrollRegion { top: 1, bot: 4, left: 1, right: 3 };
        g.scroll(region, -1).unwrap();
        assert_eq!(g.row_text(0), "aaaa");
        assert_eq!(g.row_text(1), "b  b");
        assert_eq!(g.row_text(2), "cbbc");
        assert_eq!(g.row_text(3), "dccd");
    }

    #[test]
    fn scroll_more_than_region_only_blanks_region() {
        let mut g = filled(4, 2);
        let region = ScrollRegion { top: 1, bot: 3, left: 0, right: 2 };
        g.scroll(region, 5).unwrap();
        assert_eq!(g.row_text(0), "aa");
        assert_eq!(g.row_text(1), "  ");
        assert_eq!(g.row_text(2), "  ");
        assert_eq!(g.row_text(3), "dd");
    }

    #[test]
    fn head_space_counts_blank_and_sign_cells() {
        let t = table();
        let mut g = CellGrid::new(8, 2);
        write(&mut g, &t, 0, 0, &[GridCell::new("1").with_hl(7), GridCell::new(" ").with_hl(5).repeated(3), GridCell::new("x")]);
        assert_eq!(g.head_space(0), 4);
        write(&mut g, &t, 1, 0, &[GridCell::new(" ").repeated(8)]);
        assert_eq!(g.head_space(1), 0, "all-blank rows count as zero");
    }
}
