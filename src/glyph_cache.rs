//! Per-font cache of rasterized glyphs keyed by glyph index.
//!
//! Entries are created lazily on first request and never evicted: the set is
//! bounded by the glyphs a font is actually asked to draw. Failed rasterizations
//! are not cached, so the next request retries.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::FontError;
use crate::raster::{FontFace, GlyphIndex, RasterGlyph};

/// Rasterized glyphs of one face.
#[derive(Debug, Default)]
pub struct GlyphCache {
    entries: HashMap<GlyphIndex, RasterGlyph>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached glyph for `glyph`, rasterizing it through `face` on a miss.
    pub fn get_or_rasterize(
        &mut self,
        face: &mut dyn FontFace,
        glyph: GlyphIndex,
    ) -> Result<&RasterGlyph, FontError> {
        match self.entries.entry(glyph) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => {
                let rendered = face.rasterize(glyph)?;
                Ok(slot.insert(rendered))
            }
        }
    }

    /// Cached glyph without triggering rasterization.
    pub fn peek(&self, glyph: GlyphIndex) -> Option<&RasterGlyph> {
        self.entries.get(&glyph)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes of bitmap data held across all entries.
    pub fn bitmap_bytes(&self) -> usize {
        self.entries.values().map(|g| g.data.len()).sum()
    }
}
