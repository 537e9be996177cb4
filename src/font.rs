//! Loaded fonts: per-font caches behind one mutex, and the caller-facing handle.
//!
//! A [`FontHandle`] is one reference to a font owned by a
//! [`FontRegistry`](crate::registry::FontRegistry). Cloning it takes another
//! reference; dropping it releases one. Shaping holds the font's mutex while
//! it fills the caches and the metrics slot. Drawing to a render target
//! happens after the mutex is released.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::FontError;
use crate::glyph_cache::GlyphCache;
use crate::raster::FontFace;
use crate::registry::{FontKey, RegistryShared};
use crate::shaper::{self, Fit, FontMetrics};
use crate::stats::FontStats;
use crate::string_cache::{RenderedString, StringCache};
use crate::target::{ClipRect, RenderTarget};

/// Mutable per-font state, only touched under [`FontInner::state`].
struct FontState {
    face: Box<dyn FontFace>,
    glyphs: GlyphCache,
    strings: StringCache,
    /// `None` until first computed.
    metrics: Option<FontMetrics>,
}

impl FontState {
    fn metrics(&mut self, size: u32) -> FontMetrics {
        let Self {
            face,
            glyphs,
            metrics,
            ..
        } = self;
        *metrics.get_or_insert_with(|| shaper::compute_metrics(face.as_mut(), glyphs, size))
    }

    fn render(
        &mut self,
        size: u32,
        text: &str,
        max_width: Option<i32>,
    ) -> Result<&RenderedString, FontError> {
        let Self {
            face,
            glyphs,
            strings,
            metrics,
        } = self;
        strings.get_or_render(text, max_width, || {
            shaper::render(face.as_mut(), glyphs, metrics, size, text, max_width)
        })
    }

    fn fit(&mut self, text: &str, max_width: Option<i32>) -> Fit {
        if let Some(hit) = self.strings.peek(text, max_width) {
            return Fit {
                glyphs: hit.glyph_count,
                width: hit.surface.width() as i32,
            };
        }
        let indices = shaper::glyph_indices(self.face.as_ref(), text);
        shaper::measure_and_clip(self.face.as_mut(), &mut self.glyphs, &indices, max_width)
    }
}

/// A loaded font shared by every handle to the same `(path, size, dpi)`.
pub(crate) struct FontInner {
    key: FontKey,
    state: Mutex<FontState>,
}

impl FontInner {
    pub(crate) fn new(key: FontKey, face: Box<dyn FontFace>, cache: &CacheConfig) -> Self {
        Self {
            key,
            state: Mutex::new(FontState {
                face,
                glyphs: GlyphCache::new(),
                strings: StringCache::with_limits(cache.max_entries, cache.truncate_count()),
                metrics: None,
            }),
        }
    }

    pub(crate) fn stats(&self, refcount: usize) -> FontStats {
        let state = self.state.lock();
        FontStats {
            path: self.key.path.clone(),
            size: self.key.size,
            dpi: self.key.dpi,
            refcount,
            max_height: state.metrics.map(|m| m.max_height),
            baseline: state.metrics.map(|m| m.baseline),
            glyph_entries: state.glyphs.len(),
            glyph_bytes: state.glyphs.bitmap_bytes(),
            string_entries: state.strings.len(),
            string_bytes: state.strings.footprint(),
            evictions: state.strings.evictions(),
        }
    }
}

/// Counted reference to a registry-owned font.
pub struct FontHandle {
    font: Arc<FontInner>,
    registry: Arc<RegistryShared>,
}

impl FontHandle {
    /// Wrap a reference the registry has already counted.
    pub(crate) fn new(font: Arc<FontInner>, registry: Arc<RegistryShared>) -> Self {
        Self { font, registry }
    }

    pub fn path(&self) -> &Path {
        &self.font.key.path
    }

    pub fn size(&self) -> u32 {
        self.font.key.size
    }

    pub fn dpi(&self) -> u32 {
        self.font.key.dpi
    }

    /// Whether both handles refer to the same loaded font.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.font, &other.font)
    }

    /// Live references to this font held through its registry.
    pub fn refcount(&self) -> usize {
        self.registry.refcount(&self.font.key)
    }

    /// Width in pixels of `text` rendered without a width limit.
    ///
    /// Renders through the string cache, so a later unbounded render of the
    /// same text is a cache hit.
    pub fn measure(&self, text: &str) -> Result<i32, FontError> {
        let mut state = self.font.state.lock();
        let rendered = state.render(self.size(), text, None)?;
        Ok(rendered.surface.width() as i32)
    }

    /// How many leading glyphs of `text` fit in `max_width`, and their width.
    ///
    /// Consults the string cache without touching its recency order and
    /// never inserts into it. `None` fits the whole text.
    pub fn fit(&self, text: &str, max_width: Option<i32>) -> Fit {
        self.font.state.lock().fit(text, max_width)
    }

    /// Number of leading glyphs of `text` that fit in `max_width` pixels.
    pub fn bounded_measure(&self, text: &str, max_width: i32) -> usize {
        self.fit(text, Some(max_width)).glyphs
    }

    /// Height of every composited string surface of this font.
    pub fn max_height(&self) -> i32 {
        let size = self.size();
        self.font.state.lock().metrics(size).max_height
    }

    /// Distance from a surface's top edge to the baseline.
    pub fn baseline(&self) -> i32 {
        let size = self.size();
        self.font.state.lock().metrics(size).baseline
    }

    /// Draw `text` with its top-left corner at `(x, y)` and return the number
    /// of glyphs drawn.
    ///
    /// `max_width` and `max_height` are absolute right and bottom edges in
    /// target coordinates. A right edge at or left of `x`, or a bottom edge at
    /// or above `y`, draws nothing and returns 0. Rows below `max_height` are
    /// clipped from the composited surface.
    pub fn render(
        &self,
        target: &mut dyn RenderTarget,
        x: i32,
        y: i32,
        text: &str,
        max_width: Option<i32>,
        max_height: Option<i32>,
    ) -> Result<usize, FontError> {
        let budget = match max_width {
            Some(right) => match right.saturating_sub(x) {
                budget if budget <= 0 => return Ok(0),
                budget => Some(budget),
            },
            None => None,
        };

        let (surface, glyph_count) = {
            let mut state = self.font.state.lock();
            let rendered = state.render(self.size(), text, budget)?;
            (Arc::clone(&rendered.surface), rendered.glyph_count)
        };

        let mut bottom = y.saturating_add(surface.height() as i32);
        if let Some(limit) = max_height {
            if limit < bottom {
                bottom = limit;
                if bottom <= y {
                    return Ok(0);
                }
            }
        }

        let clip = ClipRect {
            left: x,
            top: y,
            right: x.saturating_add(surface.width() as i32),
            bottom,
        };
        target.draw_coverage(&surface, x, y, clip);
        Ok(glyph_count)
    }

    /// Consume the handle, dropping one reference.
    pub fn release(self) {
        drop(self);
    }
}

impl Clone for FontHandle {
    fn clone(&self) -> Self {
        self.registry.retain(&self.font.key);
        Self {
            font: Arc::clone(&self.font),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl Drop for FontHandle {
    fn drop(&mut self) {
        self.registry.release(&self.font.key);
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("path", &self.font.key.path)
            .field("size", &self.font.key.size)
            .field("dpi", &self.font.key.dpi)
            .finish()
    }
}
