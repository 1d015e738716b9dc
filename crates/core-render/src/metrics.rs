//! Paint pass counters.
//!
//! Relaxed atomics so a host thread can snapshot them while the UI thread
//! paints. Glyph counters are folded in from cache stats after each paint.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PaintMetrics {
    /// Paint calls executed (one per repaint request).
    pub paints: AtomicU64,
    /// Rows visited by paint calls.
    pub rows_painted: AtomicU64,
    /// Background fill rectangles issued.
    pub fills: AtomicU64,
    /// Text runs drawn (images or direct text).
    pub text_runs: AtomicU64,
    pub glyph_hits: AtomicU64,
    pub glyph_misses: AtomicU64,
    pub glyph_evictions: AtomicU64,
    /// Duration (ns) of the most recent paint.
    pub last_paint_ns: AtomicU64,
    /// Repaint requests produced by `Screen::update`.
    pub repaint_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintMetricsSnapshot {
    pub paints: u64,
    pub rows_painted: u64,
    pub fills: u64,
    pub text_runs: u64,
    pub glyph_hits: u64,
    pub glyph_misses: u64,
    pub glyph_evictions: u64,
    pub last_paint_ns: u64,
    pub repaint_requests: u64,
}

impl PaintMetrics {
    pub fn add(counter: &AtomicU64, n: u64) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn record_last_paint_ns(&self, ns: u64) {
        self.last_paint_ns.store(ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PaintMetricsSnapshot {
        PaintMetricsSnapshot {
            paints: self.paints.load(Ordering::Relaxed),
            rows_painted: self.rows_painted.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
            text_runs: self.text_runs.load(Ordering::Relaxed),
            glyph_hits: self.glyph_hits.load(Ordering::Relaxed),
            glyph_misses: self.glyph_misses.load(Ordering::Relaxed),
            glyph_evictions: self.glyph_evictions.load(Ordering::Relaxed),
            last_paint_ns: self.last_paint_ns.load(Ordering::Relaxed),
            repaint_requests: self.repaint_requests.load(Ordering::Relaxed),
        }
    }
}
