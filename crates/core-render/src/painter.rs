//! Drawing seams.
//!
//! The paint pass issues primitive commands through [`Painter`] and turns
//! glyph runs into images through [`Rasterizer`]. Toolkit backends implement
//! both; [`RecordingPainter`] and [`CountingRasterizer`] record everything for
//! the replay binary and tests. Commands preserve issue order.

use core_config::FillPattern;
use core_model::Rgba;

use crate::geometry::{PointF, RectF};

/// Handle to a rasterized glyph run. Owned by exactly one cache entry and
/// handed back to the rasterizer on eviction.
#[derive(Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub id: u64,
    /// Physical pixels (logical size times scale).
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterRequest<'a> {
    pub text: &'a str,
    pub fg: Rgba,
    pub bold: bool,
    pub italic: bool,
    /// Logical size of the image.
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

pub trait Rasterizer {
    fn rasterize(&mut self, req: &RasterRequest<'_>) -> RasterImage;
    fn release(&mut self, image: RasterImage);
}

pub trait Painter {
    fn fill_rect(&mut self, rect: RectF, color: Rgba, pattern: FillPattern);
    fn draw_image(&mut self, at: PointF, image: &RasterImage);
    fn draw_text(&mut self, at: PointF, text: &str, fg: Rgba, bold: bool, italic: bool);
    fn draw_line(&mut self, from: PointF, to: PointF, color: Rgba);
    fn draw_path(&mut self, points: &[PointF], color: Rgba);
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    Fill {
        rect: RectF,
        color: Rgba,
        pattern: FillPattern,
    },
    Image {
        at: PointF,
        image: u64,
    },
    Text {
        at: PointF,
        text: String,
        fg: Rgba,
        bold: bool,
        italic: bool,
    },
    Line {
        from: PointF,
        to: PointF,
        color: Rgba,
    },
    Path {
        points: Vec<PointF>,
        color: Rgba,
    },
}

#[derive(Debug, Default)]
pub struct RecordingPainter {
    cmds: Vec<PaintCommand>,
}

impl RecordingPainter {
    pub fn new() -> Self {
        Self { cmds: Vec::new() }
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.cmds
    }

    pub fn take(&mut self) -> Vec<PaintCommand> {
        std::mem::take(&mut self.cmds)
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn fills(&self) -> impl Iterator<Item = (&RectF, &Rgba)> {
        self.cmds.iter().filter_map(|c| match c {
            PaintCommand::Fill { rect, color, .. } => Some((rect, color)),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = (&PointF, u64)> {
        self.cmds.iter().filter_map(|c| match c {
            PaintCommand::Image { at, image } => Some((at, *image)),
            _ => None,
        })
    }
}

impl Painter for RecordingPainter {
    fn fill_rect(&mut self, rect: RectF, color: Rgba, pattern: FillPattern) {
        self.cmds.push(PaintCommand::Fill {
            rect,
            color,
            pattern,
        });
    }

    fn draw_image(&mut self, at: PointF, image: &RasterImage) {
        self.cmds.push(PaintCommand::Image { at, image: image.id });
    }

    fn draw_text(&mut self, at: PointF, text: &str, fg: Rgba, bold: bool, italic: bool) {
        if text.is_empty() {
            return;
        }
        self.cmds.push(PaintCommand::Text {
            at,
            text: text.to_owned(),
            fg,
            bold,
            italic,
        });
    }

    fn draw_line(&mut self, from: PointF, to: PointF, color: Rgba) {
        self.cmds.push(PaintCommand::Line { from, to, color });
    }

    fn draw_path(&mut self, points: &[PointF], color: Rgba) {
        self.cmds.push(PaintCommand::Path {
            points: points.to_vec(),
            color,
        });
    }
}

/// Headless rasterizer: hands out sequential image ids and remembers every
/// rasterized text and released id.
#[derive(Debug, Default)]
pub struct CountingRasterizer {
    next_id: u64,
    rasterized: Vec<String>,
    released: Vec<u64>,
}

impl CountingRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rasterized(&self) -> &[String] {
        &self.rasterized
    }

    pub fn released(&self) -> &[u64] {
        &self.released
    }

    /// Images handed out and not yet released.
    pub fn live(&self) -> usize {
        self.rasterized.len() - self.released.len()
    }
}

impl Rasterizer for CountingRasterizer {
    fn rasterize(&mut self, req: &RasterRequest<'_>) -> RasterImage {
        self.next_id += 1;
        self.rasterized.push(req.text.to_owned());
        RasterImage {
            id: self.next_id,
            width: (req.width * req.scale).ceil().max(0.0) as u32,
            height: (req.height * req.scale).ceil().max(0.0) as u32,
        }
    }

    fn release(&mut self, image: RasterImage) {
        self.released.push(image.id);
    }
}
