//! Paint pass through `Screen::paint`: borders, glyph eviction and metrics.

use std::sync::Arc;

use core_config::RenderContext;
use core_events::{GridCell, RecordingBackend, RedrawEvent};
use core_model::Rgba;
use core_render::{CountingRasterizer, Font, MonospaceLoader, MonospaceMetrics, PixelRect, RectF, RecordingPainter, Screen};
use pretty_assertions::assert_eq;

fn screen(ctx: RenderContext) -> Screen {
    let mut s = Screen::new(
        "main",
        Arc::new(ctx),
        Font::new("g", 14, 0, Arc::new(MonospaceMetrics::new(8.0, 16.0, 12.0))),
        Arc::new(RecordingBackend::new()),
        Arc::new(MonospaceLoader::default()),
    );
    s.update_size(640, 384);
    s
}

fn place(s: &mut Screen, grid: u64, cols: usize, rows: usize, row: i64, col: i64) {
    s.handle(RedrawEvent::GridResize { grid, cols, rows });
    s.handle(RedrawEvent::WinPos {
        grid,
        win: grid as i64,
        row,
        col,
    });
}

#[test]
fn borders_are_drawn_around_child_windows() {
    let mut ctx = RenderContext::default();
    ctx.flags.draw_border = true;
    let separator = ctx.theme.window_separator;
    let mut s = screen(ctx);
    place(&mut s, 1, 80, 24, 0, 0);
    place(&mut s, 2, 40, 10, 0, 0);
    place(&mut s, 3, 39, 10, 0, 41);
    place(&mut s, 4, 80, 12, 11, 0);
    assert_eq!(s.bottom_window_pos(), 176 + 192 - 1);

    s.handle(RedrawEvent::GridLine {
        grid: 1,
        row: 0,
        col_start: 0,
        cells: vec![GridCell::new("x")],
    });
    assert_eq!(s.window(1).unwrap().row_text(0).trim(), "");

    let mut painter = RecordingPainter::new();
    let mut raster = CountingRasterizer::new();
    s.paint(1, PixelRect::new(0, 0, 640, 384), &mut painter, &mut raster)
        .unwrap();
    let borders: Vec<RectF> = painter
        .fills()
        .filter(|(_, c)| **c == separator)
        .map(|(r, _)| *r)
        .collect();
    assert_eq!(
        borders,
        vec![
            RectF::new(324.0, -8.0, 2.0, 174.0),
            RectF::new(-4.0, 167.0, 327.0, 2.0),
            RectF::new(644.0, -8.0, 2.0, 174.0),
            RectF::new(324.0, 167.0, 319.0, 2.0),
            RectF::new(644.0, 168.0, 2.0, 206.0),
        ]
    );
}

#[test]
fn full_glyph_cache_evicts_and_releases() {
    let mut ctx = RenderContext::default();
    ctx.glyph_capacity = 2;
    let mut s = screen(ctx);
    s.handle(RedrawEvent::GridResize {
        grid: 2,
        cols: 10,
        rows: 3,
    });
    for (row, text) in ["a", "b", "c"].into_iter().enumerate() {
        s.handle(RedrawEvent::GridLine {
            grid: 2,
            row: row as i64,
            col_start: 0,
            cells: vec![GridCell::new(text)],
        });
    }
    let mut painter = RecordingPainter::new();
    let mut raster = CountingRasterizer::new();
    for req in s.update() {
        s.paint(req.grid, req.rect, &mut painter, &mut raster);
    }
    assert_eq!(raster.rasterized(), ["a", "b", "c"]);
    assert_eq!(raster.released().len(), 1);
    assert_eq!(raster.live(), 2);

    let m = s.metrics().snapshot();
    assert_eq!((m.paints, m.glyph_misses, m.glyph_evictions), (1, 3, 1));
    assert_eq!(m.rows_painted, 3);

    s.release_all(&mut raster);
    assert_eq!(raster.live(), 0);
}

#[test]
fn theme_reload_retires_cached_images() {
    let mut s = screen(RenderContext::default());
    s.handle(RedrawEvent::GridResize {
        grid: 2,
        cols: 10,
        rows: 1,
    });
    s.handle(RedrawEvent::GridLine {
        grid: 2,
        row: 0,
        col_start: 0,
        cells: vec![GridCell::new("w")],
    });
    let mut painter = RecordingPainter::new();
    let mut raster = CountingRasterizer::new();
    s.paint(2, PixelRect::new(0, 0, 80, 16), &mut painter, &mut raster);
    assert_eq!(raster.live(), 1);

    s.set_context(Arc::new(RenderContext::default()));
    assert!(s.glyph_cache().is_empty());
    let requests = s.update();
    assert_eq!(requests.len(), 1, "every window repaints after a reload");
    s.paint(2, requests[0].rect, &mut painter, &mut raster);
    assert_eq!(raster.released().len(), 1);
    assert_eq!(raster.rasterized(), ["w", "w"]);
}

#[test]
fn theme_reload_recolors_default_highlight_cells() {
    let mut s = screen(RenderContext::default());
    s.handle(RedrawEvent::GridResize {
        grid: 1,
        cols: 10,
        rows: 1,
    });
    s.handle(RedrawEvent::GridLine {
        grid: 1,
        row: 0,
        col_start: 0,
        cells: vec![GridCell::new("a").with_hl(0)],
    });
    let mut painter = RecordingPainter::new();
    let mut raster = CountingRasterizer::new();
    for req in s.update() {
        s.paint(req.grid, req.rect, &mut painter, &mut raster);
    }

    let mut ctx = RenderContext::default();
    ctx.theme.background = Rgba::from_u24(0x123456);
    s.set_context(Arc::new(ctx));
    {
        let win = s.window(1).unwrap();
        let content = win.lock();
        let cell = content.grid.get(0, 0).unwrap();
        assert_eq!(cell.highlight.bg(s.highlights().defaults()), Rgba::rgb(0x12, 0x34, 0x56));
    }

    painter.take();
    for req in s.update() {
        s.paint(req.grid, req.rect, &mut painter, &mut raster);
    }
    assert_eq!(painter.fills().count(), 0, "default background is never filled on grid 1");
}
