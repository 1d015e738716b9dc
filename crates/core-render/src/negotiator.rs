//! Pixel-continuity resizing of own-font neighbors.
//!
//! When a window `W` changes size along one axis, every own-font window `w`
//! touching it on that axis is resized so that `w`'s pixel extent plus `W`'s
//! stays constant. Adjacency is tested in global font units because window
//! positions are expressed in them; a coarser own font gets a one-cell
//! tolerance band instead of an exact match.
//!
//! The first contact on a side latches a baseline (`w`'s pixel size plus
//! `W`'s old size). Later resizes on that side subtract `W`'s new size from the
//! baseline. Changing `w` clears the latch on the opposite side.

use std::collections::BTreeMap;

use core_events::{GridId, PRIMARY_GRID};
use tracing::debug;

use crate::font::Font;
use crate::window::{Side, Window};

/// Per-grid resize the backend is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridResize {
    pub grid: GridId,
    pub cols: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Width,
    Height,
}

/// State of the resized window captured before neighbors are touched.
#[derive(Debug, Clone, Copy)]
struct Resized {
    grid: GridId,
    col: i64,
    row: i64,
    old_cols: usize,
    old_rows: usize,
    cols: usize,
    rows: usize,
    char_width: f64,
    line_height: f64,
}

/// Run after `resized` changed from `old_cols x old_rows`. Returns the
/// neighbor resizes to request, in grid order.
pub fn negotiate(
    windows: &mut BTreeMap<GridId, Window>,
    resized: GridId,
    old_cols: usize,
    old_rows: usize,
    global: &Font,
) -> Vec<GridResize> {
    let has_msg = windows.values().any(Window::is_msg);
    let needed = if has_msg { 4 } else { 3 };
    if windows.len() < needed || old_cols == 0 || old_rows == 0 {
        return Vec::new();
    }
    let Some(win) = windows.get(&resized) else {
        return Vec::new();
    };
    let font = win.font(global);
    let r = Resized {
        grid: resized,
        col: win.pos().0,
        row: win.pos().1,
        old_cols,
        old_rows,
        cols: win.cols(),
        rows: win.rows(),
        char_width: font.char_width(),
        line_height: font.line_height(),
    };
    let delta_cols = r.cols as i64 - r.old_cols as i64;
    let delta_rows = r.rows as i64 - r.old_rows as i64;
    let axis = match (delta_cols != 0, delta_rows != 0) {
        (true, false) => Axis::Width,
        (false, true) => Axis::Height,
        _ => return Vec::new(),
    };

    let (gcw, glh) = (global.char_width(), global.line_height());
    let mut out = Vec::new();
    for (&id, w) in windows.iter_mut() {
        if id == PRIMARY_GRID || id == r.grid || w.is_msg() {
            continue;
        }
        let Some(own) = w.font.own_font() else {
            continue;
        };
        let (cw, lh) = (own.char_width(), own.line_height());
        let (wcol, wrow) = w.pos();

        match axis {
            Axis::Width if w.pixel_width > 0.0 => {
                let old_extent = r.old_cols as f64 * r.char_width;
                let new_extent = r.cols as f64 * r.char_width;

                let right_of = wrow == r.row && wcol == r.col + r.old_cols as i64 + 1 + delta_cols;
                if w.local.get(Side::Right).partner == Some(r.grid) || right_of {
                    out.extend(adjust(w, Side::Right, &r, axis, old_extent, new_extent, cw));
                }

                let base = (wcol + 2 - delta_cols) as f64 * gcw;
                let touching = if gcw < cw {
                    let far = w.cols() as f64 * cw + base;
                    let near = (w.cols() as f64 - 1.0) * cw + base;
                    let x = r.col as f64 * gcw;
                    x <= far && x >= near
                } else {
                    r.col == (w.cols() as f64 * cw / gcw) as i64 + wcol + 2 - delta_cols
                };
                if w.local.get(Side::Left).partner == Some(r.grid) || (wrow == r.row && touching) {
                    out.extend(adjust(w, Side::Left, &r, axis, old_extent, new_extent, cw));
                }
            }
            Axis::Height if w.pixel_height > 0.0 => {
                let old_extent = r.old_rows as f64 * r.line_height;
                let new_extent = r.rows as f64 * r.line_height;

                let below = wcol == r.col && wrow == r.row + r.old_rows as i64 + 1 + delta_rows;
                if w.local.get(Side::Bottom).partner == Some(r.grid) || below {
                    out.extend(adjust(w, Side::Bottom, &r, axis, old_extent, new_extent, lh));
                }

                let base = (wrow + 2 - delta_rows) as f64 * glh;
                let touching = if glh < lh {
                    let far = w.rows() as f64 * lh + base;
                    let near = (w.rows() as f64 - 1.0) * lh + base;
                    let y = r.row as f64 * glh;
                    y <= far && y >= near
                } else {
                    r.row == (w.rows() as f64 * lh / glh) as i64 + wrow + 2 - delta_rows
                };
                if w.local.get(Side::Top).partner == Some(r.grid) || (wcol == r.col && touching) {
                    out.extend(adjust(w, Side::Top, &r, axis, old_extent, new_extent, lh));
                }
            }
            _ => {}
        }
    }
    out
}

/// Latch `side` if needed and derive `w`'s new cell count on `axis`.
fn adjust(
    w: &mut Window,
    side: Side,
    r: &Resized,
    axis: Axis,
    old_extent: f64,
    new_extent: f64,
    metric: f64,
) -> Option<GridResize> {
    if metric <= 0.0 {
        return None;
    }
    let current = match axis {
        Axis::Width => w.pixel_width,
        Axis::Height => w.pixel_height,
    };
    let slot = w.local.get_mut(side);
    slot.partner.get_or_insert(r.grid);
    if !slot.latched {
        slot.latched = true;
        slot.baseline = current + old_extent;
    }
    let count = ((slot.baseline - new_extent) / metric).trunc().max(0.0) as usize;
    let (cols, rows) = match axis {
        Axis::Width => (count, w.rows()),
        Axis::Height => (w.cols(), count),
    };
    let unchanged = match axis {
        Axis::Width => count == w.cols(),
        Axis::Height => count == w.rows(),
    };
    if unchanged {
        return None;
    }
    match axis {
        Axis::Width => w.pixel_width = count as f64 * metric,
        Axis::Height => w.pixel_height = count as f64 * metric,
    }
    w.local.get_mut(side.opposite()).latched = false;
    debug!(target: "grid.negotiate", grid = w.grid(), partner = r.grid, ?side, cols, rows, "neighbor_resize");
    Some(GridResize {
        grid: w.grid(),
        cols,
        rows,
    })
}
