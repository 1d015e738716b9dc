//! Paint pass for one window and one repaint rectangle.
//!
//! Per damaged row: background runs, then text runs, then decorations.
//! Afterwards the message separator, window borders (grid 1 only) and indent
//! guides are drawn as overlays. Only rows and columns covered by the pixel
//! rectangle are visited.

use std::f64::consts::PI;
use std::sync::Arc;

use ahash::AHashMap;
use core_config::{FillPattern, RenderContext};
use core_events::PRIMARY_GRID;
use core_model::{Cell, CellGrid, DefaultColors, Highlight, HighlightTable, HlFlags, Rgba};
use tracing::trace;

use crate::font::Font;
use crate::geometry::{PixelRect, PointF, RectF};
use crate::glyph_cache::{GlyphCache, GlyphKey};
use crate::painter::{Painter, RasterRequest, Rasterizer};
use crate::window::Window;

pub const MSG_SEPARATOR_GROUP: &str = "MsgSeparator";
const MSG_SEPARATOR_ALPHA: u8 = 200;

/// Child window geometry needed to draw separators on the primary grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderWindow {
    pub pos: (i64, i64),
    pub cols: usize,
    pub rows: usize,
    pub char_width: f64,
    pub line_height: f64,
    pub surface: PixelRect,
}

/// Screen-level inputs to a paint call.
pub struct PaintEnv<'a> {
    pub ctx: &'a RenderContext,
    pub global: &'a Font,
    pub highlights: &'a HighlightTable,
    pub screen_height: i64,
    /// Lowest window bottom edge in pixels (see `Screen::bottom_window_pos`).
    pub bottom_window_pos: i64,
    pub borders: &'a [BorderWindow],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintStats {
    pub rows: u64,
    pub fills: u64,
    pub text_runs: u64,
}

/// Cell range covered by a pixel rectangle in a window's own metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl CellRange {
    pub fn from_pixels(rect: PixelRect, font: &Font) -> Self {
        let (cw, lh) = (font.char_width(), font.line_height());
        if cw <= 0.0 || lh <= 0.0 || rect.is_empty() {
            return Self {
                row: 0,
                col: 0,
                rows: 0,
                cols: 0,
            };
        }
        Self {
            row: (rect.y.max(0) as f64 / lh) as usize,
            col: (rect.x.max(0) as f64 / cw) as usize,
            rows: (rect.height as f64 / lh).ceil() as usize,
            cols: (rect.width as f64 / cw).ceil() as usize,
        }
    }
}

struct RowPainter<'a, P: ?Sized, R: ?Sized> {
    grid: &'a CellGrid,
    font: &'a Font,
    cache: &'a mut GlyphCache,
    env: &'a PaintEnv<'a>,
    painter: &'a mut P,
    raster: &'a mut R,
    defaults: DefaultColors,
    default_hl: Arc<Highlight>,
    paint_default_bg: bool,
    stats: PaintStats,
}

/// Paint the part of `win` covered by `rect` (window-local pixels).
pub fn paint_window<P, R>(
    win: &mut Window,
    shared: &mut GlyphCache,
    env: &PaintEnv<'_>,
    rect: PixelRect,
    painter: &mut P,
    raster: &mut R,
) -> PaintStats
where
    P: Painter + ?Sized,
    R: Rasterizer + ?Sized,
{
    let grid_id = win.grid();
    let (is_float, is_msg, shown) = (win.is_float(), win.is_msg(), win.is_shown());
    let surface = win.surface();
    let content = win.content();
    let guard = content.lock();
    let (font, cache) = win.font.split_mut(env.global, shared);
    let range = CellRange::from_pixels(rect, font);

    let mut rp = RowPainter {
        grid: &guard.grid,
        font,
        cache,
        env,
        painter,
        raster,
        defaults: env.ctx.default_colors(),
        default_hl: env.highlights.default_highlight(),
        paint_default_bg: is_float || is_msg,
        stats: PaintStats::default(),
    };

    for y in range.row..range.row + range.rows {
        if y >= rp.grid.rows() {
            continue;
        }
        rp.fill_background(y, range.col, range.cols);
        if env.ctx.flags.cached_drawing {
            rp.draw_text_cached(y, range.col, range.cols);
        } else {
            rp.draw_text_direct(y, range.col, range.cols);
        }
        rp.draw_decorations(y, range.col, range.cols);
        rp.stats.rows += 1;
    }

    if is_msg {
        rp.draw_msg_separator(surface.width);
    }
    if grid_id == PRIMARY_GRID && env.ctx.flags.draw_border {
        rp.draw_borders(range);
    }
    if env.ctx.flags.indent_guide && !is_msg && !is_float && shown {
        rp.draw_indent_guides(range.row, range.rows);
    }

    trace!(target: "render.paint", grid = grid_id, row = range.row, rows = range.rows, fills = rp.stats.fills, runs = rp.stats.text_runs, "paint_window");
    rp.stats
}

impl<P, R> RowPainter<'_, P, R>
where
    P: Painter + ?Sized,
    R: Rasterizer + ?Sized,
{
    fn cw(&self) -> f64 {
        self.font.char_width()
    }

    fn lh(&self) -> f64 {
        self.font.line_height()
    }

    fn fill_background(&mut self, y: usize, col: usize, cols: usize) {
        let end_col = (col + cols).min(self.grid.cols());
        let mut run: Option<(usize, usize, Arc<Highlight>)> = None;
        for x in col..end_col {
            let hl = match self.grid.get(y, x) {
                Some(cell) => Arc::clone(&cell.highlight),
                None => Arc::clone(&self.default_hl),
            };
            let same_bg = run
                .as_ref()
                .is_some_and(|(_, _, last)| last.bg(&self.defaults) == hl.bg(&self.defaults));
            if same_bg {
                if let Some((_, end, _)) = run.as_mut() {
                    *end = x;
                }
                continue;
            }
            if let Some((start, end, last)) = run.take() {
                self.fill_run(y, start, end, &last);
            }
            run = Some((x, x, hl));
        }
        if let Some((start, end, last)) = run {
            self.fill_run(y, start, end, &last);
        }
    }

    fn fill_run(&mut self, y: usize, start: usize, end: usize, hl: &Highlight) {
        let bg = hl.bg(&self.defaults);
        if !self.paint_default_bg && bg == self.defaults.background {
            return;
        }
        let (pattern, color) = fill_style(self.env.ctx, hl, bg);
        let rect = RectF::new(
            start as f64 * self.cw(),
            y as f64 * self.lh(),
            (end - start + 1) as f64 * self.cw(),
            self.lh(),
        );
        self.painter
            .fill_rect(rect, color.with_alpha(self.env.ctx.background_alpha()), pattern);
        self.stats.fills += 1;
    }

    /// Drawable cells of row `y`: normal-width cells grouped by highlight in
    /// first-seen order, and special-width cells on their own.
    fn collect_runs(&self, y: usize, col: usize, cols: usize) -> (Vec<(Arc<Highlight>, Vec<usize>)>, Vec<usize>) {
        let sig = self.grid.significant_len(y);
        let mut groups: Vec<(Arc<Highlight>, Vec<usize>)> = Vec::new();
        let mut index: AHashMap<Arc<Highlight>, usize> = AHashMap::new();
        let mut special = Vec::new();
        for x in col..col + cols {
            if x > sig {
                continue;
            }
            let Some(cell) = self.grid.get(y, x) else {
                continue;
            };
            if cell.text.is_empty() || cell.is_space() {
                continue;
            }
            if !cell.normal_width {
                special.push(x);
                continue;
            }
            match index.get(&cell.highlight) {
                Some(&i) => groups[i].1.push(x),
                None => {
                    index.insert(Arc::clone(&cell.highlight), groups.len());
                    groups.push((Arc::clone(&cell.highlight), vec![x]));
                }
            }
        }
        (groups, special)
    }

    /// Run text from `col`, with blanks for the columns between members.
    fn run_text(&self, y: usize, col: usize, members: &[usize]) -> (String, usize) {
        let mut text = String::new();
        let mut columns = 0;
        let mut x = col;
        for &m in members {
            while x < m {
                text.push(' ');
                columns += 1;
                x += 1;
            }
            if let Some(cell) = self.grid.get(y, m) {
                text.push_str(&cell.text);
            }
            columns += 1;
            x = m + 1;
        }
        (text, columns)
    }

    fn draw_text_cached(&mut self, y: usize, col: usize, cols: usize) {
        let (groups, special) = self.collect_runs(y, col, cols);
        let origin = PointF::new(col as f64 * self.cw(), y as f64 * self.lh());
        for (hl, members) in &groups {
            let (text, columns) = self.run_text(y, col, members);
            let width = columns as f64 * self.font.italic_width();
            self.blit(origin, &text, hl, width);
        }
        for x in special {
            let Some(cell) = self.grid.get(y, x) else {
                continue;
            };
            let width = self.font.advance(&cell.text).ceil();
            let at = PointF::new(x as f64 * self.cw(), y as f64 * self.lh());
            self.blit(at, &cell.text, &cell.highlight, width);
        }
    }

    fn blit(&mut self, at: PointF, text: &str, hl: &Highlight, width: f64) {
        if text.is_empty() {
            return;
        }
        let fg = hl.fg(&self.defaults);
        let key = GlyphKey {
            text: text.to_owned(),
            fg,
            bold: hl.bold(),
            italic: hl.italic(),
        };
        let request = RasterRequest {
            text,
            fg,
            bold: hl.bold(),
            italic: hl.italic(),
            width,
            height: self.lh(),
            scale: self.env.ctx.font.scale,
        };
        if let Some(image) = self.cache.get_or_rasterize(key, &mut *self.raster, request) {
            self.painter.draw_image(at, image);
            self.stats.text_runs += 1;
        }
    }

    fn draw_text_direct(&mut self, y: usize, col: usize, cols: usize) {
        let (groups, special) = self.collect_runs(y, col, cols);
        let baseline = y as f64 * self.lh() + self.font.ascent() + f64::from(self.font.line_space) / 2.0;
        for (hl, members) in &groups {
            let (text, _) = self.run_text(y, col, members);
            let at = PointF::new(col as f64 * self.cw(), baseline);
            self.painter
                .draw_text(at, &text, hl.fg(&self.defaults), hl.bold(), hl.italic());
            self.stats.text_runs += 1;
        }
        for x in special {
            let Some(cell) = self.grid.get(y, x) else {
                continue;
            };
            let hl = &cell.highlight;
            let at = PointF::new(x as f64 * self.cw(), baseline);
            self.painter
                .draw_text(at, &cell.text, hl.fg(&self.defaults), hl.bold(), hl.italic());
            self.stats.text_runs += 1;
        }
    }

    fn draw_decorations(&mut self, y: usize, col: usize, cols: usize) {
        let sig = self.grid.significant_len(y);
        let (cw, lh) = (self.cw(), self.lh());
        let ascent = self.font.ascent();
        let line_space = f64::from(self.font.line_space);
        for x in col..col + cols {
            if x > sig {
                break;
            }
            let Some(cell) = self.grid.get(y, x) else {
                continue;
            };
            let hl = &cell.highlight;
            if !hl.has_decoration() {
                continue;
            }
            let color = hl.special(&self.defaults);
            let start = x as f64 * cw;
            let end = (x + 1) as f64 * cw;
            let under_y = y as f64 * lh + ascent + line_space;
            if hl.flags.contains(HlFlags::STRIKETHROUGH) {
                let strike_y = (y as f64 - 1.0) * lh + lh / 2.0 + ascent + ascent / 2.0 + line_space;
                self.painter
                    .draw_line(PointF::new(start, strike_y), PointF::new(end, strike_y), color);
            }
            if hl.flags.contains(HlFlags::UNDERLINE) {
                self.painter
                    .draw_line(PointF::new(start, under_y), PointF::new(end, under_y), color);
            }
            if hl.flags.contains(HlFlags::UNDERCURL) {
                let path = undercurl_path(start, end, under_y, ascent, cw);
                self.painter.draw_path(&path, color);
            }
        }
    }

    fn draw_msg_separator(&mut self, width: i64) {
        let fg = self
            .env
            .highlights
            .group(MSG_SEPARATOR_GROUP)
            .map(|h| h.fg(&self.defaults))
            .unwrap_or(self.env.ctx.theme.foreground);
        self.painter.fill_rect(
            RectF::new(0.0, 0.0, width as f64, 1.0),
            fg.with_alpha(MSG_SEPARATOR_ALPHA),
            FillPattern::Solid,
        );
    }

    fn draw_borders(&mut self, range: CellRange) {
        let area_right = (range.col + range.cols) as i64;
        let area_bottom = (range.row + range.rows) as i64;
        for b in self.env.borders {
            // Child extent including its right/bottom separator cell.
            let left = b.pos.0;
            let top = b.pos.1;
            let right = b.pos.0 + b.cols as i64 + 1;
            let bottom = b.pos.1 + b.rows as i64 + 1;
            let hit = left < area_right && (range.col as i64) < right && top < area_bottom && (range.row as i64) < bottom;
            if hit {
                self.draw_border(b);
            }
        }
    }

    fn draw_border(&mut self, b: &BorderWindow) {
        let (gcw, glh) = (self.env.global.char_width(), self.env.global.line_height());
        let (cw, lh) = (b.char_width, b.line_height);
        let color = self.env.ctx.theme.window_separator;
        let x = (b.pos.0 as f64 * gcw).trunc();
        let y = (b.pos.1 as f64 * glh).trunc();
        let width = (b.cols as f64 * cw).trunc();
        let win_height = ((b.rows as f64 + 0.92) * lh).trunc();

        if y + lh + 1.0 < self.env.screen_height as f64 {
            self.painter.fill_rect(
                RectF::new((x + width + cw / 2.0).trunc(), y - (lh / 2.0).trunc(), 2.0, win_height),
                color,
                FillPattern::Solid,
            );
        }

        let bottom_edge = window_bottom(b.pos.1, glh, b.surface);
        let near_bottom = bottom_edge > self.env.bottom_window_pos - glh as i64
            && bottom_edge < self.env.bottom_window_pos + glh as i64;
        if near_bottom {
            return;
        }
        let y2 = y + b.rows as f64 * lh - 1.0 + (lh / 2.0).trunc();
        self.painter.fill_rect(
            RectF::new(
                (x - cw / 2.0).trunc(),
                y2,
                ((b.cols as f64 + 0.92) * cw).trunc(),
                2.0,
            ),
            color,
            FillPattern::Solid,
        );
    }

    fn draw_indent_guides(&mut self, row: usize, rows: usize) {
        let ts = self.env.ctx.tabstop;
        if ts == 0 {
            return;
        }
        let grid = self.grid;
        let total = grid.rows();
        let cols = grid.cols();
        let text = |r: usize, c: usize| grid.get(r, c).map(|cell: &Cell| cell.text.as_str());

        for y in row..row + rows {
            if y + 1 >= total {
                return;
            }
            let sig = grid.significant_len(y);
            let mut res = 0usize;
            for x in 0..sig {
                let mut skip_draw = false;
                if x + 1 >= cols {
                    break;
                }
                let (Some(nlnc), Some(nlc), Some(nc), Some(c)) =
                    (grid.get(y + 1, x + 1), grid.get(y + 1, x), grid.get(y, x + 1), grid.get(y, x))
                else {
                    continue;
                };
                if c.is_sign_column() {
                    res += 1;
                }
                if !c.is_space() && !c.is_sign_column() {
                    break;
                }
                let boundary = x > res && (x + 1 - res) % ts == 0;
                if !(boundary && c.is_space() && !nc.is_space() && nlc.is_space() && nlnc.is_space()) {
                    continue;
                }
                if sig >= cols {
                    break;
                }
                let cket = closing_bracket(text(y, sig - 1).unwrap_or(" "));

                for r in y..total {
                    if r + 1 == total {
                        break;
                    }
                    for z in y + 1..total {
                        let Some(t) = text(z, x + 1) else {
                            break;
                        };
                        if t == " " {
                            continue;
                        }
                        if t != cket {
                            break;
                        }
                        for v in (res..=x).rev() {
                            match text(z, v) {
                                None => break,
                                Some(" ") => skip_draw = true,
                                Some(_) => {
                                    skip_draw = false;
                                    break;
                                }
                            }
                        }
                        if skip_draw {
                            break;
                        }
                    }
                    if !skip_draw {
                        break;
                    }
                    if grid.head_space(y + 1) <= grid.head_space(y) {
                        break;
                    }
                    match text(r + 1, x + 1) {
                        Some(" ") => self.draw_indent_line(x + 1, r + 1),
                        _ => break,
                    }
                }
                break;
            }
        }
    }

    fn draw_indent_line(&mut self, x: usize, y: usize) {
        let rect = RectF::new(x as f64 * self.cw(), y as f64 * self.lh(), 1.0, self.lh());
        self.painter
            .fill_rect(rect, self.env.ctx.theme.indent_guide, FillPattern::Solid);
    }
}

/// Pattern and color for a background fill. Configured diff groups use
/// their pattern; sparse patterns get a more saturated color.
pub fn fill_style(ctx: &RenderContext, hl: &Highlight, bg: Rgba) -> (FillPattern, Rgba) {
    match ctx.diff.for_group(&hl.hl_name) {
        Some(p) if p.is_sparse() => (p, bg.colorful()),
        Some(p) => (p, bg),
        None => (FillPattern::Solid, bg),
    }
}

/// Sine path under one cell, sampled at every integer pixel.
pub fn undercurl_path(start: f64, end: f64, baseline: f64, ascent: f64, cell_width: f64) -> Vec<PointF> {
    let height = ascent / 3.0;
    let amplitude = ascent / 8.0;
    let mid = baseline + height / 2.0;
    let mut points = vec![PointF::new(start, mid)];
    if cell_width <= 0.0 {
        return points;
    }
    for i in (start as i64)..=(end as i64) {
        let x = i as f64;
        points.push(PointF::new(x, mid + amplitude * (2.0 * PI * x / cell_width).sin()));
    }
    points
}

/// Closing counterpart of an opening bracket or quote; `" "` otherwise.
pub fn closing_bracket(open: &str) -> &'static str {
    match open {
        "{" => "}",
        "[" => "]",
        "(" => ")",
        "<" => ">",
        "\"" => "\"",
        "'" => "'",
        "`" => "`",
        _ => " ",
    }
}

/// Bottom pixel row of a window placed at global `row`.
pub fn window_bottom(row: i64, global_line_height: f64, surface: PixelRect) -> i64 {
    (row as f64 * global_line_height) as i64 + surface.height - 1
}

/// Windows that get a separator drawn on the primary grid.
pub fn is_border_child(win: &Window) -> bool {
    win.grid() != PRIMARY_GRID && win.is_shown() && !win.is_float() && !win.is_msg()
}
