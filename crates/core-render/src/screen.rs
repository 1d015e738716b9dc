//! Compositor for one rendering surface.
//!
//! A `Screen` owns every [`Window`] keyed by grid id, the highlight table,
//! the global font and cursor, and the shared glyph cache. Redraw events are
//! applied with [`Screen::handle`]; [`Screen::update`] turns accumulated damage
//! into repaint requests which the host answers with [`Screen::paint`].
//!
//! Pointer and wheel input is translated here too, since focusing a window
//! before scrolling needs the window geometry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use core_config::RenderContext;
use core_events::{
    FloatAnchor, GridCell, GridId, ModMask, MouseAction, MouseButton, MouseInput, PRIMARY_GRID,
    PointerEvent, RedrawEvent, UiBackend, WheelEvent,
};
use core_input::{CellSize, ScrollDust, cell_at, mod_prefix, mouse_notation, wheel_notation};
use core_model::{HighlightTable, ScrollRegion};
use tracing::{debug, trace, warn};

use crate::font::{Font, FontLoader, FontSource, parse_font_spec};
use crate::geometry::PixelRect;
use crate::glyph_cache::{CacheStats, GlyphCache};
use crate::metrics::PaintMetrics;
use crate::negotiator::negotiate;
use crate::paint::{BorderWindow, PaintEnv, PaintStats, is_border_child, paint_window, window_bottom};
use crate::painter::{Painter, RasterImage, Rasterizer};
use crate::resize::try_resize_with_retry;
use crate::window::Window;

const ESCAPE: &str = "<Esc>";
const LEAVE_TERMINAL: &str = r"<C-\><C-n>";

/// Window-local pixel area the host should repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaintRequest {
    pub grid: GridId,
    pub rect: PixelRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub grid: GridId,
    pub row: i64,
    pub col: i64,
}

/// Editor mode as far as wheel handling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Normal,
    Insert,
    TerminalInput,
}

impl EditorMode {
    pub fn from_name(name: &str) -> Self {
        match name {
            "insert" => EditorMode::Insert,
            "terminal-input" => EditorMode::TerminalInput,
            _ => EditorMode::Normal,
        }
    }
}

pub struct Screen {
    name: String,
    ctx: Arc<RenderContext>,
    font: Font,
    backend: Arc<dyn UiBackend>,
    loader: Arc<dyn FontLoader>,
    windows: BTreeMap<GridId, Window>,
    highlights: HighlightTable,
    cursor: Cursor,
    dust: ScrollDust,
    cache: GlyphCache,
    /// Images dropped outside a paint call; released on the next paint.
    retired: Vec<RasterImage>,
    width: i64,
    height: i64,
    cols: usize,
    rows: usize,
    ui_attached: bool,
    mode: EditorMode,
    next_z: u64,
    metrics: Arc<PaintMetrics>,
}

impl Screen {
    pub fn new(
        name: impl Into<String>,
        ctx: Arc<RenderContext>,
        font: Font,
        backend: Arc<dyn UiBackend>,
        loader: Arc<dyn FontLoader>,
    ) -> Self {
        let highlights = HighlightTable::new(ctx.default_colors());
        let cache = GlyphCache::new(ctx.glyph_capacity);
        Self {
            name: name.into(),
            ctx,
            font,
            backend,
            loader,
            windows: BTreeMap::new(),
            highlights,
            cursor: Cursor::default(),
            dust: ScrollDust::new(),
            cache,
            retired: Vec::new(),
            width: 0,
            height: 0,
            cols: 0,
            rows: 0,
            ui_attached: false,
            mode: EditorMode::Normal,
            next_z: 0,
            metrics: Arc::new(PaintMetrics::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn global_font(&self) -> &Font {
        &self.font
    }

    pub fn window(&self, grid: GridId) -> Option<&Window> {
        self.windows.get(&grid)
    }

    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    /// Shown windows, bottom of the composite order first.
    pub fn shown_windows(&self) -> Vec<&Window> {
        let mut shown: Vec<&Window> = self.windows.values().filter(|w| w.is_shown()).collect();
        shown.sort_by_key(|w| (w.grid() != PRIMARY_GRID, w.z()));
        shown
    }

    pub fn highlights(&self) -> &HighlightTable {
        &self.highlights
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    pub fn metrics(&self) -> Arc<PaintMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn glyph_cache(&self) -> &GlyphCache {
        &self.cache
    }

    /// UI size in global cells.
    pub fn ui_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn pixel_size(&self) -> (i64, i64) {
        (self.width, self.height)
    }

    pub fn attach_ui(&mut self) {
        self.ui_attached = true;
    }

    fn cell_size(&self) -> CellSize {
        CellSize::new(self.font.char_width(), self.font.line_height())
    }

    /// Apply one redraw event.
    pub fn handle(&mut self, event: RedrawEvent) {
        trace!(target: "screen.event", screen = %self.name, event = event.name(), grid = ?event.grid(), "handle");
        // The cursor position is recorded even for a skipped grid.
        if let RedrawEvent::GridCursorGoto { grid, row, col } = event {
            self.cursor_goto(grid, row, col);
            return;
        }
        if let Some(grid) = event.grid() {
            if self.ctx.is_skip_grid(grid) {
                trace!(target: "screen.event", grid, "skip_grid");
                return;
            }
        }
        match event {
            RedrawEvent::GridResize { grid, cols, rows } => self.grid_resize(grid, cols, rows),
            RedrawEvent::GridClear { grid } => match self.windows.get_mut(&grid) {
                Some(win) => win.clear(),
                None => debug!(target: "screen.event", grid, "grid_clear_unknown_grid"),
            },
            RedrawEvent::GridDestroy { grid } => self.grid_destroy(grid),
            RedrawEvent::GridLine {
                grid,
                row,
                col_start,
                cells,
            } => self.grid_line(grid, row, col_start, &cells),
            RedrawEvent::GridScroll {
                grid,
                top,
                bot,
                left,
                right,
                rows,
            } => match self.windows.get(&grid) {
                Some(win) => win.scroll(ScrollRegion { top, bot, left, right }, rows),
                None => debug!(target: "screen.event", grid, "grid_scroll_unknown_grid"),
            },
            RedrawEvent::GridCursorGoto { .. } => {}
            RedrawEvent::HlAttrDefine(def) => {
                self.highlights.define(&def);
                for win in self.windows.values() {
                    win.mark_all_damaged();
                }
            }
            RedrawEvent::HlGroupSet { name, id } => self.highlights.set_group(&name, id),
            RedrawEvent::WinPos { grid, win, row, col } => self.window_position(grid, win, row, col),
            RedrawEvent::WinFloatPos {
                grid,
                win,
                anchor,
                anchor_grid,
                anchor_row,
                anchor_col,
                ..
            } => self.float_position(grid, win, anchor, anchor_grid, anchor_row, anchor_col),
            RedrawEvent::WinHide { grid } => {
                if let Some(win) = self.windows.get_mut(&grid) {
                    win.hide();
                }
            }
            RedrawEvent::MsgSetPos { grid, row } => self.msg_set_pos(grid, row),
            RedrawEvent::GridFont { spec } => self.grid_font(&spec),
            RedrawEvent::ModeChange { mode, index } => {
                let resolved = EditorMode::from_name(&mode);
                debug!(target: "screen.event", mode = %mode, index, resolved = ?resolved, "mode_change");
                self.set_mode(resolved);
            }
            RedrawEvent::Flush => {}
        }
    }

    pub fn handle_batch(&mut self, events: impl IntoIterator<Item = RedrawEvent>) {
        for event in events {
            self.handle(event);
        }
    }

    fn create_window(&mut self, grid: GridId) -> &mut Window {
        if self.windows.is_empty() {
            self.cursor.grid = grid;
        }
        self.next_z += 1;
        let z = self.next_z;
        debug!(target: "screen.event", grid, "window_created");
        self.windows.entry(grid).or_insert_with(|| {
            let mut win = Window::new(grid);
            win.raise(z);
            win
        })
    }

    fn grid_resize(&mut self, grid: GridId, cols: usize, rows: usize) {
        match self.windows.get(&grid).map(|w| (w.cols(), w.rows())) {
            Some(dims) if dims == (cols, rows) => return,
            Some(_) => {}
            None => {
                self.create_window(grid);
            }
        }
        let Some(win) = self.windows.get_mut(&grid) else {
            return;
        };
        let (old_cols, old_rows) = win.resize_grid(cols, rows);
        debug!(target: "grid.resize", grid, old_cols, old_rows, cols, rows, "grid_resize");

        for req in negotiate(&mut self.windows, grid, old_cols, old_rows, &self.font) {
            if let Err(e) = self.backend.try_resize_grid(req.grid, req.cols, req.rows) {
                warn!(target: "grid.negotiate", grid = req.grid, error = %e, "grid_resize_request_failed");
            }
        }

        let Some(win) = self.windows.get_mut(&grid) else {
            return;
        };
        win.update_geometry(&self.font);
        let (col, row) = win.pos();
        win.move_to(col, row, &self.font, self.height);
        win.show();
        win.mark_all_damaged();
    }

    fn grid_destroy(&mut self, grid: GridId) {
        if grid == PRIMARY_GRID {
            if let Some(win) = self.windows.get_mut(&grid) {
                win.hide();
            }
            return;
        }
        if let Some(mut win) = self.windows.remove(&grid) {
            win.hide();
            if let Some(cache) = win.font.cache_mut() {
                self.retired.extend(cache.drain());
            }
            debug!(target: "screen.event", grid, "window_destroyed");
        }
    }

    fn grid_line(&mut self, grid: GridId, row: i64, col_start: i64, cells: &[GridCell]) {
        if grid == PRIMARY_GRID && self.ctx.flags.draw_border {
            return;
        }
        if !self.windows.contains_key(&grid) {
            self.create_window(grid);
        }
        let Some(win) = self.windows.get_mut(&grid) else {
            return;
        };
        win.put_line(row, col_start, cells, &self.highlights, &self.font);
        if !win.is_shown() {
            win.show();
        }
    }

    fn cursor_goto(&mut self, grid: GridId, row: i64, col: i64) {
        self.cursor.row = row;
        self.cursor.col = col;
        if self.ctx.is_skip_grid(grid) || self.cursor.grid == grid {
            return;
        }
        if !self.windows.contains_key(&grid) {
            return;
        }
        self.cursor.grid = grid;
        if grid != PRIMARY_GRID {
            self.next_z += 1;
            let z = self.next_z;
            if let Some(win) = self.windows.get_mut(&grid) {
                win.raise(z);
            }
        }
        trace!(target: "screen.event", grid, row, col, "cursor_grid_changed");
    }

    fn window_position(&mut self, grid: GridId, handle: i64, row: i64, col: i64) {
        let Some(win) = self.windows.get_mut(&grid) else {
            debug!(target: "screen.event", grid, "win_pos_unknown_grid");
            return;
        };
        win.set_handle(handle);
        win.set_pos(col, row);
        win.move_to(col, row, &self.font, self.height);
        let surface = win.surface();
        let is_msg = win.is_msg();

        if !is_msg {
            for (&id, other) in self.windows.iter_mut() {
                if id == PRIMARY_GRID || id == grid {
                    continue;
                }
                if other.is_msg() || other.is_float() || !other.is_shown() {
                    continue;
                }
                if surface.contains_rect(&other.surface()) {
                    other.hide();
                    debug!(target: "screen.event", grid = id, covered_by = grid, "window_hidden_overlapped");
                }
            }
        }
        if let Some(win) = self.windows.get_mut(&grid) {
            win.show();
        }
    }

    fn float_position(
        &mut self,
        grid: GridId,
        handle: i64,
        anchor: FloatAnchor,
        anchor_grid: GridId,
        anchor_row: f64,
        anchor_col: f64,
    ) {
        let base = self.windows.get(&anchor_grid).map_or((0, 0), Window::pos);
        let Some(win) = self.windows.get_mut(&grid) else {
            debug!(target: "screen.event", grid, "win_float_pos_unknown_grid");
            return;
        };
        let (mut col, mut row) = (anchor_col.trunc() as i64, anchor_row.trunc() as i64);
        let (cols, rows) = (win.cols() as i64, win.rows() as i64);
        match anchor {
            FloatAnchor::NW => {}
            FloatAnchor::NE => col -= cols,
            FloatAnchor::SW => row -= rows,
            FloatAnchor::SE => {
                col -= cols;
                row -= rows;
            }
        }
        win.set_handle(handle);
        win.set_pos(col, row);
        win.set_float(anchor);
        win.move_to(base.0 + col, base.1 + row, &self.font, self.height);
        win.show();
    }

    fn msg_set_pos(&mut self, grid: GridId, row: i64) {
        let Some(win) = self.windows.get_mut(&grid) else {
            debug!(target: "screen.event", grid, "msg_set_pos_unknown_grid");
            return;
        };
        win.set_msg();
        let col = win.pos().0;
        win.set_pos(col, row);
        win.move_to(col, row, &self.font, self.height);
        win.show();
    }

    /// Give the cursor's window its own font and ask the backend to refit the
    /// grid into its current pixel size.
    fn grid_font(&mut self, spec: &str) {
        let grid = self.cursor.grid;
        if !self.windows.contains_key(&grid) {
            debug!(target: "screen.event", grid, "grid_font_unknown_grid");
            return;
        }
        let font = match parse_font_spec(spec).and_then(|(family, height)| self.loader.load(&family, height)) {
            Ok(font) => font,
            Err(e) => {
                warn!(target: "screen.event", spec, error = %e, "grid_font_rejected");
                return;
            }
        };
        let Some(win) = self.windows.get_mut(&grid) else {
            return;
        };
        let (old_width, old_height) = {
            let current = win.font(&self.font);
            (
                win.cols() as f64 * current.char_width(),
                win.rows() as f64 * current.line_height(),
            )
        };
        let (cw, lh) = (font.char_width(), font.line_height());
        let drained = win.set_own_font(font, &self.font, self.ctx.glyph_capacity);
        self.retired.extend(drained);
        win.mark_all_damaged();
        if cw <= 0.0 || lh <= 0.0 {
            return;
        }
        let cols = (old_width / cw) as usize;
        let rows = (old_height / lh) as usize;
        debug!(target: "screen.event", grid, family = %spec, cols, rows, "grid_font");
        if let Err(e) = self.backend.try_resize_grid(grid, cols, rows) {
            warn!(target: "screen.event", grid, error = %e, "grid_font_resize_failed");
        }
    }

    /// Collect damage from every window as pixel rectangles, resetting it.
    pub fn update(&mut self) -> Vec<RepaintRequest> {
        let mut out = Vec::new();
        for (&grid, win) in &self.windows {
            let Some(d) = win.take_damage() else {
                continue;
            };
            let font = win.font(&self.font);
            let (cw, lh) = (font.char_width(), font.line_height());
            let rect = PixelRect::new(
                (d.left as f64 * cw) as i64,
                (d.top as f64 * lh) as i64,
                (d.width() as f64 * cw) as i64,
                (d.height() as f64 * lh) as i64,
            );
            if rect.width > 0 && rect.height > 0 {
                out.push(RepaintRequest { grid, rect });
            }
        }
        PaintMetrics::add(&self.metrics.repaint_requests, out.len() as u64);
        out
    }

    /// Paint `rect` (window-local pixels) of `grid`. Returns `None` for an
    /// unknown grid.
    pub fn paint<P, R>(&mut self, grid: GridId, rect: PixelRect, painter: &mut P, raster: &mut R) -> Option<PaintStats>
    where
        P: Painter + ?Sized,
        R: Rasterizer + ?Sized,
    {
        for image in self.retired.drain(..) {
            raster.release(image);
        }
        let started = Instant::now();
        let borders = if grid == PRIMARY_GRID && self.ctx.flags.draw_border {
            self.border_windows()
        } else {
            Vec::new()
        };
        let bottom_window_pos = self.bottom_window_pos();
        let Some(win) = self.windows.get_mut(&grid) else {
            debug!(target: "render.paint", grid, "paint_unknown_grid");
            return None;
        };

        let before = cache_stats(win, &self.cache);
        let env = PaintEnv {
            ctx: self.ctx.as_ref(),
            global: &self.font,
            highlights: &self.highlights,
            screen_height: self.height,
            bottom_window_pos,
            borders: &borders,
        };
        let stats = paint_window(win, &mut self.cache, &env, rect, painter, raster);
        let after = cache_stats(win, &self.cache);

        let m = &self.metrics;
        PaintMetrics::add(&m.paints, 1);
        PaintMetrics::add(&m.rows_painted, stats.rows);
        PaintMetrics::add(&m.fills, stats.fills);
        PaintMetrics::add(&m.text_runs, stats.text_runs);
        PaintMetrics::add(&m.glyph_hits, after.hits.saturating_sub(before.hits));
        PaintMetrics::add(&m.glyph_misses, after.misses.saturating_sub(before.misses));
        PaintMetrics::add(&m.glyph_evictions, after.evictions.saturating_sub(before.evictions));
        let ns = started.elapsed().as_nanos() as u64;
        m.record_last_paint_ns(ns);
        trace!(target: "render.paint", grid, rows = stats.rows, ns, "paint");
        Some(stats)
    }

    fn border_windows(&self) -> Vec<BorderWindow> {
        self.windows
            .values()
            .filter(|w| is_border_child(w))
            .map(|w| {
                let font = w.font(&self.font);
                BorderWindow {
                    pos: w.pos(),
                    cols: w.cols(),
                    rows: w.rows(),
                    char_width: font.char_width(),
                    line_height: font.line_height(),
                    surface: w.surface(),
                }
            })
            .collect()
    }

    /// Lowest bottom edge among child windows, message window excluded.
    pub fn bottom_window_pos(&self) -> i64 {
        let glh = self.font.line_height();
        self.windows
            .values()
            .filter(|w| w.grid() != PRIMARY_GRID && !w.is_msg())
            .map(|w| window_bottom(w.pos().1, glh, w.surface()))
            .max()
            .unwrap_or(0)
            .max(0)
    }

    /// Track the surface pixel size. When the cell size changes on an
    /// attached UI, own-font windows drop their pixel baselines and the
    /// backend is asked to resize.
    pub fn update_size(&mut self, width: i64, height: i64) {
        self.width = width;
        self.height = height;
        let (cw, lh) = (self.font.char_width(), self.font.line_height());
        if cw <= 0.0 || lh <= 0.0 {
            return;
        }
        let cols = (width.max(0) as f64 / cw) as usize;
        let rows = (height.max(0) as f64 / lh) as usize;
        if cols == self.cols && rows == self.rows {
            return;
        }
        self.cols = cols;
        self.rows = rows;
        debug!(target: "render.resize", screen = %self.name, width, height, cols, rows, "screen_size");
        if !self.ui_attached {
            return;
        }
        for win in self.windows.values_mut() {
            win.reset_pixel_size();
        }
        if let Err(e) = try_resize_with_retry(&self.backend, cols, rows) {
            warn!(target: "render.resize", cols, rows, error = %e, "ui_resize_failed");
        }
    }

    /// Send the key notation for a pointer event. Returns what was sent.
    pub fn mouse_event(&mut self, ev: &PointerEvent) -> Option<String> {
        let notation = mouse_notation(ev, self.cell_size())?;
        trace!(target: "screen.input", %notation, "mouse");
        self.send(&notation);
        Some(notation)
    }

    /// Translate a wheel event; returns the wheel notations sent.
    pub fn wheel_event(&mut self, ev: &WheelEvent) -> Vec<String> {
        let cell = self.cell_size();
        let steps = self.dust.accumulate(ev.delta, cell);
        if steps.is_empty() {
            return Vec::new();
        }
        self.focus_window(ev.x, ev.y, ev.mods);
        match self.mode {
            EditorMode::Insert => self.send(ESCAPE),
            EditorMode::TerminalInput => self.send(LEAVE_TERMINAL),
            EditorMode::Normal => {}
        }
        let (col, row) = cell_at(ev.x, ev.y, cell);
        let keys = wheel_notation(&steps, ev.mods, col, row);
        for key in &keys {
            self.send(key);
        }
        trace!(target: "screen.input", vertical = steps.vertical, horizontal = steps.horizontal, accel = steps.accel, "wheel");
        keys
    }

    /// Click into the child window under the pointer so the scroll applies to it.
    fn focus_window(&self, x: f64, y: f64, mods: ModMask) {
        let (col, row) = cell_at(x, y, self.cell_size());
        let target = self.windows.values().find(|w| {
            w.grid() != PRIMARY_GRID && !w.is_msg() && w.is_shown() && w.surface().contains_point(x, y)
        });
        let Some(win) = target else {
            return;
        };
        let modifier = mod_prefix(mods);
        for action in [MouseAction::Press, MouseAction::Release] {
            let input = MouseInput {
                button: MouseButton::Left,
                action,
                modifier: modifier.clone(),
                grid: win.grid(),
                row,
                col,
            };
            if let Err(e) = self.backend.input_mouse(input) {
                warn!(target: "screen.input", error = %e, "input_mouse_failed");
            }
        }
        self.send(ESCAPE);
    }

    fn send(&self, keys: &str) {
        if let Err(e) = self.backend.input(keys) {
            warn!(target: "screen.input", keys, error = %e, "input_failed");
        }
    }

    /// Replace the render context (theme reload). Every cached image is
    /// retired and every window repaints.
    pub fn set_context(&mut self, ctx: Arc<RenderContext>) {
        self.retired.extend(self.cache.drain());
        for win in self.windows.values_mut() {
            if let Some(cache) = win.font.cache_mut() {
                self.retired.extend(cache.drain());
            }
        }
        if ctx.glyph_capacity != self.cache.capacity() {
            self.cache = GlyphCache::new(ctx.glyph_capacity);
        }
        self.highlights.set_defaults(ctx.default_colors());
        self.ctx = ctx;
        for win in self.windows.values() {
            win.mark_all_damaged();
        }
        debug!(target: "screen.event", screen = %self.name, retired = self.retired.len(), "context_replaced");
    }

    /// Release every rasterized image, cached or retired.
    pub fn release_all<R: Rasterizer + ?Sized>(&mut self, raster: &mut R) {
        for image in self.retired.drain(..) {
            raster.release(image);
        }
        self.cache.purge(raster);
        for win in self.windows.values_mut() {
            if let Some(cache) = win.font.cache_mut() {
                cache.purge(raster);
            }
        }
    }
}

fn cache_stats(win: &Window, shared: &GlyphCache) -> CacheStats {
    match win.font_source() {
        FontSource::Owned { cache, .. } => cache.stats(),
        FontSource::Inherited => shared.stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{MonospaceLoader, MonospaceMetrics};
    use crate::painter::{CountingRasterizer, RecordingPainter};
    use core_events::{RecordingBackend, UiRequest, WheelDelta};

    fn screen() -> (Screen, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::new());
        let font = Font::new("g", 14, 0, Arc::new(MonospaceMetrics::new(8.0, 16.0, 12.0)));
        let s = Screen::new(
            "main",
            Arc::new(RenderContext::default()),
            font,
            backend.clone(),
            Arc::new(MonospaceLoader::default()),
        );
        (s, backend)
    }

    #[test]
    fn first_grid_becomes_cursor_target() {
        let (mut s, _) = screen();
        s.handle(RedrawEvent::GridResize { grid: 1, cols: 80, rows: 24 });
        s.handle(RedrawEvent::GridResize { grid: 2, cols: 40, rows: 10 });
        assert_eq!(s.cursor().grid, 1);
        let w = s.window(2).unwrap();
        assert!(w.is_shown());
        assert_eq!((w.surface().width, w.surface().height), (320, 160));
    }

    #[test]
    fn update_converts_damage_once() {
        let (mut s, _) = screen();
        s.handle(RedrawEvent::GridResize { grid: 2, cols: 10, rows: 4 });
        s.update();
        s.handle(RedrawEvent::GridLine {
            grid: 2,
            row: 2,
            col_start: 0,
            cells: vec![GridCell::new("x")],
        });
        assert_eq!(
            s.update(),
            vec![RepaintRequest { grid: 2, rect: PixelRect::new(0, 32, 80, 16) }]
        );
        assert!(s.update().is_empty());
        assert_eq!(s.metrics().snapshot().repaint_requests, 2);
    }

    #[test]
    fn cursor_change_raises_window() {
        let (mut s, _) = screen();
        s.handle(RedrawEvent::GridResize { grid: 1, cols: 80, rows: 24 });
        s.handle(RedrawEvent::GridResize { grid: 2, cols: 10, rows: 4 });
        s.handle(RedrawEvent::GridResize { grid: 3, cols: 10, rows: 4 });
        s.handle(RedrawEvent::GridCursorGoto { grid: 2, row: 1, col: 3 });
        assert_eq!(s.cursor(), Cursor { grid: 2, row: 1, col: 3 });
        let order: Vec<_> = s.shown_windows().iter().map(|w| w.grid()).collect();
        assert_eq!(order, vec![1, 3, 2]);
        s.handle(RedrawEvent::GridCursorGoto { grid: 9, row: 0, col: 0 });
        assert_eq!(s.cursor().grid, 2, "unknown grid keeps the cursor grid");
    }

    #[test]
    fn grid_font_requests_refit() {
        let (mut s, backend) = screen();
        s.handle(RedrawEvent::GridResize { grid: 2, cols: 20, rows: 10 });
        s.handle(RedrawEvent::GridFont { spec: "Mono:h20".into() });
        // Monospace 20px: 12px wide, 25px tall; 160x160 old pixels.
        assert_eq!(
            backend.take(),
            vec![UiRequest::ResizeGrid { grid: 2, cols: 13, rows: 6 }]
        );
        assert!(s.window(2).unwrap().font_source().is_owned());
        s.handle(RedrawEvent::GridFont { spec: "Mono:hx".into() });
        assert!(backend.take().is_empty());
    }

    #[test]
    fn wheel_in_insert_mode_leaves_insert_first() {
        let (mut s, backend) = screen();
        s.set_mode(EditorMode::Insert);
        let sent = s.wheel_event(&WheelEvent {
            delta: WheelDelta::Angle { x: 0, y: 120 },
            x: 10.0,
            y: 10.0,
            mods: ModMask::CTRL,
        });
        assert_eq!(sent, vec!["<C-ScrollWheelUp>"]);
        assert_eq!(backend.inputs(), vec!["<Esc>", "<C-ScrollWheelUp>"]);
    }

    #[test]
    fn destroyed_own_font_cache_is_released_on_next_paint() {
        let (mut s, _) = screen();
        s.handle(RedrawEvent::GridResize { grid: 1, cols: 10, rows: 2 });
        s.handle(RedrawEvent::GridResize { grid: 2, cols: 10, rows: 2 });
        s.handle(RedrawEvent::GridCursorGoto { grid: 2, row: 0, col: 0 });
        s.handle(RedrawEvent::GridFont { spec: "Mono:h14".into() });
        s.handle(RedrawEvent::GridLine {
            grid: 2,
            row: 0,
            col_start: 0,
            cells: vec![GridCell::new("a")],
        });
        let mut painter = RecordingPainter::new();
        let mut raster = CountingRasterizer::new();
        s.paint(2, PixelRect::new(0, 0, 80, 16), &mut painter, &mut raster).unwrap();
        assert_eq!(raster.live(), 1);
        s.handle(RedrawEvent::GridDestroy { grid: 2 });
        assert!(s.window(2).is_none());
        s.paint(1, PixelRect::new(0, 0, 80, 16), &mut painter, &mut raster).unwrap();
        assert_eq!(raster.live(), 0);
    }
}
