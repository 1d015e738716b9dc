//! Cell canvas composited from a screen's shown windows.
//!
//! Windows are laid out in global cells (surface origin divided by the global
//! cell size) and stacked by z. Own-font windows are mapped cell for cell.

use core_events::PRIMARY_GRID;
use core_model::Rgba;
use core_render::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasCell {
    pub text: String,
    pub fg: Rgba,
    pub bg: Rgba,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    cols: usize,
    rows: usize,
    cells: Vec<CanvasCell>,
}

impl Canvas {
    pub fn new(cols: usize, rows: usize, fg: Rgba, bg: Rgba) -> Self {
        let blank = CanvasCell {
            text: " ".into(),
            fg,
            bg,
        };
        Self {
            cols,
            rows,
            cells: vec![blank; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CanvasCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    fn set(&mut self, row: i64, col: i64, cell: CanvasCell) {
        let (Ok(row), Ok(col)) = (usize::try_from(row), usize::try_from(col)) else {
            return;
        };
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = cell;
        }
    }

    pub fn row_text(&self, row: usize) -> String {
        (0..self.cols)
            .filter_map(|c| self.get(row, c))
            .map(|c| c.text.as_str())
            .collect()
    }

    /// Composite every shown window of `screen` onto a `cols x rows` canvas.
    pub fn compose(screen: &Screen, cols: usize, rows: usize) -> Self {
        let defaults = *screen.highlights().defaults();
        let mut canvas = Canvas::new(cols, rows, defaults.foreground, defaults.background);
        let global = screen.global_font();
        let (gcw, glh) = (global.char_width(), global.line_height());
        if gcw <= 0.0 || glh <= 0.0 {
            return canvas;
        }
        for win in screen.shown_windows() {
            let surface = win.surface();
            let origin_col = (surface.x as f64 / gcw) as i64;
            let origin_row = (surface.y as f64 / glh) as i64;
            let opaque = win.grid() != PRIMARY_GRID;
            let content = win.lock();
            for r in 0..content.grid.rows() {
                for c in 0..content.grid.cols() {
                    let cell = match content.grid.get(r, c) {
                        Some(cell) => CanvasCell {
                            text: if cell.text.is_empty() { " ".into() } else { cell.text.clone() },
                            fg: cell.highlight.fg(&defaults),
                            bg: cell.highlight.bg(&defaults),
                        },
                        None if opaque => CanvasCell {
                            text: " ".into(),
                            fg: defaults.foreground,
                            bg: defaults.background,
                        },
                        None => continue,
                    };
                    canvas.set(origin_row + r as i64, origin_col + c as i64, cell);
                }
            }
        }
        canvas
    }
}
