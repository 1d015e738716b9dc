//! Grid content model: colors, highlights and per-window cell matrices.
//!
//! Invariants:
//! * A [`CellGrid`]'s matrix always has exactly `rows * cols` slots and one
//!   significant-length entry per row.
//! * A [`Cell`] owns an immutable snapshot of the highlight active when it was
//!   written (`Arc<Highlight>`); redefining highlight ids never mutates cells
//!   already in a grid.
//! * [`HighlightTable`] always resolves: unknown ids fall back to id 0, which
//!   carries the theme default colors.

pub mod color;
pub mod grid;
pub mod highlight;

pub use color::Rgba;
pub use grid::{Cell, CellGrid, CellSpan, LineWrite, ScrollRegion};
pub use highlight::{DefaultColors, HighlightTable, Highlight, HlFlags};
