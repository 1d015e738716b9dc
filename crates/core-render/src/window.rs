//! One grid surface: its cell grid and damage behind a per-window lock, its
//! placement in global font units, and its optional private font.

use std::sync::Arc;

use core_events::{FloatAnchor, GridCell, GridId, PRIMARY_GRID};
use core_model::{CellGrid, HighlightTable, LineWrite, ScrollRegion};
use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::damage::{Damage, DamageRect};
use crate::font::{Font, FontSource};
use crate::geometry::PixelRect;
use crate::glyph_cache::GlyphCache;
use crate::painter::RasterImage;

/// Cell grid plus the damage it has accumulated since the last repaint.
/// Every mutation takes the window lock and touches both together.
#[derive(Debug, Default)]
pub struct GridContent {
    pub grid: CellGrid,
    pub damage: Damage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
            Side::Top => 2,
            Side::Bottom => 3,
        }
    }
}

/// Resize partner on one side of an own-font window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalSlot {
    pub partner: Option<GridId>,
    /// Pixel extent (own size plus partner size) latched on first contact.
    pub baseline: f64,
    pub latched: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalWindows {
    slots: [LocalSlot; 4],
}

impl LocalWindows {
    pub fn get(&self, side: Side) -> &LocalSlot {
        &self.slots[side.index()]
    }

    pub fn get_mut(&mut self, side: Side) -> &mut LocalSlot {
        &mut self.slots[side.index()]
    }

    pub fn reset(&mut self) {
        self.slots = Default::default();
    }
}

#[derive(Debug)]
pub struct Window {
    grid: GridId,
    handle: Option<i64>,
    /// (col, row) in global font units.
    pos: (i64, i64),
    cols: usize,
    rows: usize,
    shown: bool,
    is_float: bool,
    is_msg: bool,
    anchor: FloatAnchor,
    z: u64,
    pub(crate) font: FontSource,
    /// Pixel size tracked for own-font windows; zero means no baseline yet.
    pub(crate) pixel_width: f64,
    pub(crate) pixel_height: f64,
    pub(crate) local: LocalWindows,
    surface: PixelRect,
    content: Arc<Mutex<GridContent>>,
}

impl Window {
    pub fn new(grid: GridId) -> Self {
        Self {
            grid,
            handle: None,
            pos: (0, 0),
            cols: 0,
            rows: 0,
            shown: false,
            is_float: false,
            is_msg: false,
            anchor: FloatAnchor::NW,
            z: 0,
            font: FontSource::Inherited,
            pixel_width: 0.0,
            pixel_height: 0.0,
            local: LocalWindows::default(),
            surface: PixelRect::default(),
            content: Arc::new(Mutex::new(GridContent::default())),
        }
    }

    pub fn grid(&self) -> GridId {
        self.grid
    }

    pub fn handle(&self) -> Option<i64> {
        self.handle
    }

    pub fn pos(&self) -> (i64, i64) {
        self.pos
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_float(&self) -> bool {
        self.is_float
    }

    pub fn is_msg(&self) -> bool {
        self.is_msg
    }

    pub fn anchor(&self) -> FloatAnchor {
        self.anchor
    }

    /// Composite order; higher paints on top.
    pub fn z(&self) -> u64 {
        self.z
    }

    pub fn surface(&self) -> PixelRect {
        self.surface
    }

    pub fn font_source(&self) -> &FontSource {
        &self.font
    }

    pub fn font<'a>(&'a self, global: &'a Font) -> &'a Font {
        self.font.effective(global)
    }

    pub fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_width, self.pixel_height)
    }

    pub fn local_windows(&self) -> &LocalWindows {
        &self.local
    }

    /// Shared handle for paint callbacks running off the event thread.
    pub fn content(&self) -> Arc<Mutex<GridContent>> {
        Arc::clone(&self.content)
    }

    pub fn lock(&self) -> MutexGuard<'_, GridContent> {
        self.content.lock()
    }

    pub fn is_normal_width(&self, text: &str, global: &Font) -> bool {
        self.font(global).is_normal_width(text)
    }

    /// Reallocate the grid, preserving the overlap except on the primary
    /// grid. Returns the previous `(cols, rows)`.
    pub fn resize_grid(&mut self, cols: usize, rows: usize) -> (usize, usize) {
        let old = (self.cols, self.rows);
        let preserve = self.grid != PRIMARY_GRID;
        self.lock().grid.resize(cols, rows, preserve);
        self.cols = cols;
        self.rows = rows;
        old
    }

    pub fn clear(&mut self) {
        let (cols, rows) = (self.cols, self.rows);
        let mut content = self.lock();
        content.grid.clear();
        content.damage.mark_all(cols, rows);
    }

    /// Apply a line update; every applied run damages its whole row.
    pub fn put_line(
        &self,
        row: i64,
        col_start: i64,
        cells: &[GridCell],
        highlights: &HighlightTable,
        global: &Font,
    ) -> LineWrite {
        let font = self.font(global);
        let cols = self.cols;
        let mut content = self.lock();
        let write = content.grid.put_line(
            row,
            col_start,
            cells,
            |id| highlights.get(id),
            |text| font.is_normal_width(text),
        );
        if write.runs_applied > 0 {
            content.damage.mark(0, row as usize, cols, 1);
        }
        trace!(target: "grid.line", grid = self.grid, row, col_start, cells = write.cells_written, "put_line");
        write
    }

    pub fn scroll(&self, region: ScrollRegion, count: i64) {
        let mut content = self.lock();
        if let Some(span) = content.grid.scroll(region, count) {
            content
                .damage
                .mark(span.left, span.top, span.right - span.left, span.bottom - span.top);
            trace!(target: "grid.scroll", grid = self.grid, top = span.top, bottom = span.bottom, count, "scroll");
        }
    }

    pub fn mark_all_damaged(&self) {
        let (cols, rows) = (self.cols, self.rows);
        self.lock().damage.mark_all(cols, rows);
    }

    pub fn take_damage(&self) -> Option<DamageRect> {
        self.lock().damage.take()
    }

    /// Surface size follows the window's own font.
    pub fn update_geometry(&mut self, global: &Font) {
        let (cw, lh) = {
            let font = self.font(global);
            (font.char_width(), font.line_height())
        };
        self.surface.width = (self.cols as f64 * cw) as i64;
        self.surface.height = (self.rows as f64 * lh) as i64;
    }

    /// Place the surface at `(col, row)` global cells. The message window is
    /// pushed down so its last row sits at the bottom of the screen.
    pub fn move_to(&mut self, col: i64, row: i64, global: &Font, screen_height: i64) {
        let lh = global.line_height();
        let mut offset = 0;
        if self.is_msg {
            offset = (screen_height - (self.rows as f64 * lh) as i64).max(0);
        }
        self.surface.x = (col as f64 * global.char_width()) as i64;
        self.surface.y = (row as f64 * lh) as i64 + offset;
    }

    pub fn set_pos(&mut self, col: i64, row: i64) {
        self.pos = (col, row);
    }

    pub fn set_handle(&mut self, handle: i64) {
        self.handle = Some(handle);
    }

    pub fn set_float(&mut self, anchor: FloatAnchor) {
        self.is_float = true;
        self.anchor = anchor;
    }

    pub fn set_msg(&mut self) {
        self.is_msg = true;
    }

    pub fn show(&mut self) {
        self.shown = true;
    }

    pub fn hide(&mut self) {
        self.shown = false;
    }

    pub fn raise(&mut self, z: u64) {
        self.z = z;
    }

    /// Switch to a private font. The current pixel size becomes the local
    /// baseline and neighbor slots start over.
    pub fn set_own_font(&mut self, font: Font, global: &Font, cache_capacity: usize) -> Vec<RasterImage> {
        let (cw, lh) = {
            let current = self.font(global);
            (current.char_width(), current.line_height())
        };
        self.pixel_width = self.cols as f64 * cw;
        self.pixel_height = self.rows as f64 * lh;
        self.local.reset();
        if let FontSource::Owned { font: own, cache } = &mut self.font {
            *own = font;
            return cache.drain();
        }
        self.font = FontSource::Owned {
            font,
            cache: GlyphCache::new(cache_capacity),
        };
        Vec::new()
    }

    /// Forget the tracked pixel size (screen resize); the next negotiation
    /// latches a fresh baseline.
    pub fn reset_pixel_size(&mut self) {
        if self.font.is_owned() {
            self.pixel_width = 0.0;
            self.pixel_height = 0.0;
        }
    }

    pub fn row_text(&self, row: usize) -> String {
        self.lock().grid.row_text(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::HighlightTable;

    fn global() -> Font {
        Font::new(
            "g",
            14,
            0,
            Arc::new(crate::font::MonospaceMetrics::new(8.0, 16.0, 12.0)),
        )
    }

    #[test]
    fn line_update_damages_full_row() {
        let g = global();
        let mut w = Window::new(2);
        w.resize_grid(10, 3);
        w.put_line(1, 2, &[GridCell::new("x")], &HighlightTable::default(), &g);
        assert_eq!(
            w.take_damage(),
            Some(DamageRect {
                left: 0,
                top: 1,
                right: 10,
                bottom: 2
            })
        );
        assert!(w.take_damage().is_none());
    }

    #[test]
    fn ignored_line_update_leaves_damage_empty() {
        let g = global();
        let mut w = Window::new(2);
        w.resize_grid(4, 2);
        w.put_line(5, 0, &[GridCell::new("x")], &HighlightTable::default(), &g);
        w.put_line(0, 9, &[GridCell::new("x")], &HighlightTable::default(), &g);
        assert!(w.take_damage().is_none());
    }

    #[test]
    fn message_window_sits_at_screen_bottom() {
        let g = global();
        let mut w = Window::new(4);
        w.resize_grid(80, 2);
        w.set_msg();
        w.move_to(0, 1, &g, 24 * 16);
        assert_eq!(w.surface().y, 16 + 22 * 16);
        let mut n = Window::new(5);
        n.resize_grid(10, 2);
        n.move_to(3, 2, &g, 24 * 16);
        assert_eq!((n.surface().x, n.surface().y), (24, 32));
    }

    #[test]
    fn own_font_sets_baseline_and_geometry() {
        let g = global();
        let mut w = Window::new(3);
        w.resize_grid(10, 5);
        let own = Font::new(
            "o",
            20,
            0,
            Arc::new(crate::font::MonospaceMetrics::new(10.0, 20.0, 15.0)),
        );
        assert!(w.set_own_font(own, &g, 16).is_empty());
        assert_eq!(w.pixel_size(), (80.0, 80.0));
        w.update_geometry(&g);
        assert_eq!((w.surface().width, w.surface().height), (100, 100));
        w.reset_pixel_size();
        assert_eq!(w.pixel_size(), (0.0, 0.0));
    }

    #[test]
    fn opposite_sides() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
        }
    }
}
