//! Bounded LRU cache of rasterized glyph runs.
//!
//! Keyed on (text, foreground, bold, italic). A miss rasterizes synchronously;
//! eviction and purge hand each image back to the rasterizer exactly once.

use std::num::NonZeroUsize;

use core_model::Rgba;
use lru::LruCache;
use tracing::{debug, trace};

use crate::painter::{RasterImage, RasterRequest, Rasterizer};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub text: String,
    pub fg: Rgba,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct GlyphCache {
    entries: LruCache<GlyphKey, RasterImage>,
    stats: CacheStats,
}

impl Default for GlyphCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl GlyphCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn contains(&self, key: &GlyphKey) -> bool {
        self.entries.contains(key)
    }

    /// Cached image for `key`, rasterizing `request` on a miss. A hit marks
    /// the entry most recently used.
    pub fn get_or_rasterize<R>(
        &mut self,
        key: GlyphKey,
        raster: &mut R,
        request: RasterRequest<'_>,
    ) -> Option<&RasterImage>
    where
        R: Rasterizer + ?Sized,
    {
        if self.entries.get(&key).is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            let image = raster.rasterize(&request);
            trace!(target: "render.glyph_cache", text = %key.text, image = image.id, "glyph_miss");
            if let Some((old_key, old)) = self.entries.push(key.clone(), image) {
                if old_key != key {
                    self.stats.evictions += 1;
                    trace!(target: "render.glyph_cache", text = %old_key.text, image = old.id, "glyph_evicted");
                    raster.release(old);
                }
            }
        }
        self.entries.peek(&key)
    }

    /// Remove every entry, returning the images for deferred release.
    pub fn drain(&mut self) -> Vec<RasterImage> {
        let mut out = Vec::with_capacity(self.entries.len());
        while let Some((_, image)) = self.entries.pop_lru() {
            out.push(image);
        }
        if !out.is_empty() {
            debug!(target: "render.glyph_cache", released = out.len(), "glyph_cache_drained");
        }
        out
    }

    /// Release every entry through `raster`.
    pub fn purge<R>(&mut self, raster: &mut R)
    where
        R: Rasterizer + ?Sized,
    {
        for image in self.drain() {
            raster.release(image);
        }
    }
}
