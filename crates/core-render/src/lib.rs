//! Grid compositor: windows, damage, the paint pass and glyph caching.
//!
//! Invariants:
//! - Every mutation of a window's cell grid or damage rectangle happens under
//!   that window's lock (`Window::lock`); paint takes the same lock.
//! - Damage only grows between paints. `Screen::update` converts it to pixel
//!   rectangles in the window's own font and resets it.
//! - A window with its own font rasterizes into its own `GlyphCache`; all
//!   other windows share the screen cache. Images leave a cache exactly once,
//!   through eviction, purge or retirement, and go back to the `Rasterizer`.
//! - Window positions are in global font units. Surface sizes use the
//!   window's effective font.
//!
//! Exposed components:
//! - `font`: the `FontMetrics` capability, `Font`, `FontSource` and the font
//!   spec parser.
//! - `glyph_cache`: bounded LRU of rasterized text runs.
//! - `damage`: per-window cell-space damage rectangle.
//! - `painter`: `Painter` and `Rasterizer` seams plus recording fakes.
//! - `window`: one grid surface and its neighbor slots.
//! - `negotiator`: pixel-continuity resizing of own-font neighbors.
//! - `paint`: background, text, decorations and overlays for one window.
//! - `screen`: event dispatch, repaint requests and input translation.
//! - `resize`: the UI resize round-trip with escalating timeouts.
//! - `metrics`: paint counters.

pub mod damage;
pub mod font;
pub mod geometry;
pub mod glyph_cache;
pub mod metrics;
pub mod negotiator;
pub mod paint;
pub mod painter;
pub mod resize;
pub mod screen;
pub mod window;

pub use damage::{Damage, DamageRect};
pub use font::{Font, FontError, FontLoader, FontMetrics, FontSource, MonospaceLoader, MonospaceMetrics};
pub use geometry::{PixelRect, PointF, RectF};
pub use glyph_cache::{CacheStats, GlyphCache, GlyphKey};
pub use metrics::{PaintMetrics, PaintMetricsSnapshot};
pub use negotiator::GridResize;
pub use paint::PaintStats;
pub use painter::{CountingRasterizer, PaintCommand, Painter, RasterImage, RasterRequest, Rasterizer, RecordingPainter};
pub use screen::{Cursor, EditorMode, RepaintRequest, Screen};
pub use window::{Side, Window};
