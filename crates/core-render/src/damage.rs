//! Per-window damage rectangle.
//!
//! One rectangle in cell coordinates (right/bottom exclusive) that grows by
//! union on every mutation until a repaint request consumes it.
//!
//! Invariants:
//! * `mark` never shrinks the rectangle.
//! * After `take`, the tracker is empty (one-shot consumption).
//! * Zero-area marks are ignored.

/// Cell-coordinate rectangle, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DamageRect {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl DamageRect {
    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }

    pub fn union(self, other: DamageRect) -> DamageRect {
        DamageRect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        col >= self.left && col < self.right && row >= self.top && row < self.bottom
    }
}

#[derive(Debug, Default, Clone)]
pub struct Damage {
    rect: Option<DamageRect>,
}

impl Damage {
    pub fn new() -> Self {
        Self { rect: None }
    }

    /// Union `width x height` cells at `(x, y)` into the rectangle.
    pub fn mark(&mut self, x: usize, y: usize, width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        let r = DamageRect {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        };
        self.rect = Some(match self.rect {
            Some(cur) => cur.union(r),
            None => r,
        });
    }

    /// Replace the rectangle with the whole window.
    pub fn mark_all(&mut self, cols: usize, rows: usize) {
        self.rect = (cols > 0 && rows > 0).then_some(DamageRect {
            left: 0,
            top: 0,
            right: cols,
            bottom: rows,
        });
    }

    pub fn peek(&self) -> Option<DamageRect> {
        self.rect
    }

    /// Consume the accumulated rectangle.
    pub fn take(&mut self) -> Option<DamageRect> {
        self.rect.take()
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_none()
    }

    pub fn clear(&mut self) {
        self.rect = None;
    }
}
