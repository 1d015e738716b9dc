//! Display-width helpers for cell text.
//!
//! The compositor asks two questions of a cell's text: how many columns does
//! it advance (`egc_width`, `display_width`), and can it be rendered as part
//! of a normal-width glyph run without measuring (`is_ascii_narrow`). Font
//! metrics build on these when no real shaper is available.

pub mod segment;
pub mod width;

pub use segment::{Cluster, clusters};
pub use width::{display_width, egc_width, is_ascii_narrow};
