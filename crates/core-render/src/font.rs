//! Font capability and per-window font overrides.
//!
//! Metric computation is external: a [`FontMetrics`] answers advance width
//! and line height for text. [`MonospaceMetrics`] is the headless
//! implementation used by the replay binary and tests.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::glyph_cache::GlyphCache;

pub const DEFAULT_FONT_HEIGHT: u32 = 14;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FontError {
    #[error("empty font spec")]
    EmptySpec,
    #[error("invalid height `{part}` in font spec `{spec}`")]
    InvalidHeight { spec: String, part: String },
    #[error("font `{0}` unavailable")]
    Unavailable(String),
}

pub trait FontMetrics: Send + Sync + fmt::Debug {
    /// Advance of one normal-width cell.
    fn char_width(&self) -> f64;
    fn line_height(&self) -> f64;
    fn ascent(&self) -> f64;
    /// Advance of one italic cell; text run images are sized with it.
    fn italic_width(&self) -> f64;
    fn advance(&self, text: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    pub cell_width: f64,
    pub line_height: f64,
    pub ascent: f64,
}

impl MonospaceMetrics {
    pub fn new(cell_width: f64, line_height: f64, ascent: f64) -> Self {
        Self {
            cell_width,
            line_height,
            ascent,
        }
    }

    /// Approximate metrics for a point size, with `line_space` extra pixels
    /// between rows.
    pub fn for_size(size: u32, line_space: u32) -> Self {
        let size = f64::from(size.max(1));
        Self {
            cell_width: (size * 0.6).round().max(1.0),
            line_height: (size * 1.25).ceil() + f64::from(line_space),
            ascent: (size * 0.8).round(),
        }
    }
}

impl FontMetrics for MonospaceMetrics {
    fn char_width(&self) -> f64 {
        self.cell_width
    }

    fn line_height(&self) -> f64 {
        self.line_height
    }

    fn ascent(&self) -> f64 {
        self.ascent
    }

    fn italic_width(&self) -> f64 {
        self.cell_width
    }

    fn advance(&self, text: &str) -> f64 {
        core_text::display_width(text) as f64 * self.cell_width
    }
}

#[derive(Debug, Clone)]
pub struct Font {
    pub family: String,
    pub size: u32,
    pub line_space: u32,
    metrics: Arc<dyn FontMetrics>,
}

impl Font {
    pub fn new(family: impl Into<String>, size: u32, line_space: u32, metrics: Arc<dyn FontMetrics>) -> Self {
        Self {
            family: family.into(),
            size,
            line_space,
            metrics,
        }
    }

    /// Headless monospace font with approximated metrics.
    pub fn monospace(family: impl Into<String>, size: u32, line_space: u32) -> Self {
        Self::new(
            family,
            size,
            line_space,
            Arc::new(MonospaceMetrics::for_size(size, line_space)),
        )
    }

    pub fn metrics(&self) -> &dyn FontMetrics {
        self.metrics.as_ref()
    }

    pub fn char_width(&self) -> f64 {
        self.metrics.char_width()
    }

    pub fn line_height(&self) -> f64 {
        self.metrics.line_height()
    }

    pub fn ascent(&self) -> f64 {
        self.metrics.ascent()
    }

    pub fn italic_width(&self) -> f64 {
        self.metrics.italic_width()
    }

    pub fn advance(&self, text: &str) -> f64 {
        self.metrics.advance(text)
    }

    /// ASCII (and empty) text is always normal width; anything else must
    /// advance exactly one cell.
    pub fn is_normal_width(&self, text: &str) -> bool {
        core_text::is_ascii_narrow(text) || self.advance(text) == self.char_width()
    }
}

/// Resolves a family and height into a [`Font`].
pub trait FontLoader: Send + Sync {
    fn load(&self, family: &str, height: u32) -> Result<Font, FontError>;
}

/// Loader producing [`MonospaceMetrics`] fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceLoader {
    pub line_space: u32,
}

impl FontLoader for MonospaceLoader {
    fn load(&self, family: &str, height: u32) -> Result<Font, FontError> {
        if family.trim().is_empty() {
            return Err(FontError::Unavailable(family.to_owned()));
        }
        Ok(Font::monospace(family, height, self.line_space))
    }
}

/// `Family:h14` → `("Family", 14)`. Parts other than `h<N>` are ignored.
pub fn parse_font_spec(spec: &str) -> Result<(String, u32), FontError> {
    if spec.is_empty() {
        return Err(FontError::EmptySpec);
    }
    let mut parts = spec.split(':');
    let family = parts.next().unwrap_or_default().to_owned();
    let mut height = DEFAULT_FONT_HEIGHT;
    for part in parts {
        if let Some(h) = part.strip_prefix('h') {
            height = h.parse().map_err(|_| FontError::InvalidHeight {
                spec: spec.to_owned(),
                part: part.to_owned(),
            })?;
        }
    }
    Ok((family, height))
}

/// A window either inherits the screen font or owns a font plus the glyph
/// cache rasterized with it.
#[derive(Debug, Default)]
pub enum FontSource {
    #[default]
    Inherited,
    Owned { font: Font, cache: GlyphCache },
}

impl FontSource {
    pub fn effective<'a>(&'a self, global: &'a Font) -> &'a Font {
        match self {
            FontSource::Inherited => global,
            FontSource::Owned { font, .. } => font,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, FontSource::Owned { .. })
    }

    pub fn own_font(&self) -> Option<&Font> {
        match self {
            FontSource::Inherited => None,
            FontSource::Owned { font, .. } => Some(font),
        }
    }

    /// Effective font together with the cache its glyphs live in.
    pub fn split_mut<'a>(
        &'a mut self,
        global: &'a Font,
        shared: &'a mut GlyphCache,
    ) -> (&'a Font, &'a mut GlyphCache) {
        match self {
            FontSource::Inherited => (global, shared),
            FontSource::Owned { font, cache } => (font, cache),
        }
    }

    pub fn cache_mut(&mut self) -> Option<&mut GlyphCache> {
        match self {
            FontSource::Inherited => None,
            FontSource::Owned { cache, .. } => Some(cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_parsing() {
        assert_eq!(parse_font_spec("Fira Code:h18").unwrap(), ("Fira Code".into(), 18));
        assert_eq!(parse_font_spec("Mono").unwrap(), ("Mono".into(), 14));
        assert_eq!(parse_font_spec("Mono:b:h9").unwrap(), ("Mono".into(), 9));
        assert_eq!(parse_font_spec(""), Err(FontError::EmptySpec));
        assert!(matches!(
            parse_font_spec("Mono:hx"),
            Err(FontError::InvalidHeight { .. })
        ));
    }

    #[test]
    fn normal_width_classification() {
        let f = Font::new("t", 14, 0, Arc::new(MonospaceMetrics::new(8.0, 16.0, 12.0)));
        assert!(f.is_normal_width("a"));
        assert!(f.is_normal_width(""));
        assert!(f.is_normal_width("é"), "one-column non-ascii advances one cell");
        assert!(!f.is_normal_width("漢"));
        assert_eq!(f.advance("漢"), 16.0);
    }

    #[test]
    fn effective_font_falls_back_to_global() {
        let global = Font::monospace("g", 14, 0);
        let own = Font::monospace("o", 20, 0);
        let inherited = FontSource::Inherited;
        assert_eq!(inherited.effective(&global).family, "g");
        let owned = FontSource::Owned {
            font: own,
            cache: GlyphCache::new(4),
        };
        assert_eq!(owned.effective(&global).family, "o");
        assert!(owned.is_owned());
    }
}
