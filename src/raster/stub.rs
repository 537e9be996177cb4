//! Deterministic in-memory rasterizer for unit tests.
//!
//! Every glyph index maps to the same box unless overridden: advance 10,
//! an 8×12 fully covered bitmap with left bearing 1 and top bearing 10
//! (so extents span -2..10). Code points map to glyph indices one-to-one.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{FontFace, GlyphExtents, GlyphIndex, PixelFormat, RasterBackend, RasterGlyph};
use crate::error::FontError;

pub(crate) const ADVANCE: i32 = 10;
pub(crate) const TOP: i32 = 10;
pub(crate) const HEIGHT: usize = 12;
pub(crate) const WIDTH: usize = 8;

/// Call counters shared between a backend and every face it opens.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub opens: AtomicUsize,
    pub rasterizes: AtomicUsize,
    pub probes: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn rasterizes(&self) -> usize {
        self.rasterizes.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

/// Per-glyph behavior overrides.
#[derive(Debug, Default, Clone)]
pub(crate) struct StubGlyphs {
    pub advances: HashMap<GlyphIndex, i32>,
    pub kerning: HashMap<(GlyphIndex, GlyphIndex), i32>,
    pub failing: HashSet<GlyphIndex>,
    pub color: HashSet<GlyphIndex>,
    /// When set, only these glyphs rasterize at all.
    pub only: Option<HashSet<GlyphIndex>>,
}

impl StubGlyphs {
    pub fn with_advance(mut self, ch: char, advance: i32) -> Self {
        self.advances.insert(ch as GlyphIndex, advance);
        self
    }

    pub fn with_kerning(mut self, left: char, right: char, delta: i32) -> Self {
        self.kerning.insert((left as GlyphIndex, right as GlyphIndex), delta);
        self
    }

    pub fn failing(mut self, ch: char) -> Self {
        self.failing.insert(ch as GlyphIndex);
        self
    }

    pub fn color(mut self, ch: char) -> Self {
        self.color.insert(ch as GlyphIndex);
        self
    }

    pub fn only(mut self, chars: &str) -> Self {
        self.only = Some(chars.chars().map(|c| c as GlyphIndex).collect());
        self
    }

    fn fails(&self, glyph: GlyphIndex) -> bool {
        self.failing.contains(&glyph) || self.only.as_ref().is_some_and(|set| !set.contains(&glyph))
    }
}

/// Backend handing out [`StubFace`]s.
pub(crate) struct StubBackend {
    pub counters: Arc<Counters>,
    glyphs: StubGlyphs,
    /// Paths that fail to open.
    missing: Mutex<HashSet<String>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::with_glyphs(StubGlyphs::default())
    }

    pub fn with_glyphs(glyphs: StubGlyphs) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            glyphs,
            missing: Mutex::new(HashSet::new()),
        }
    }

    pub fn mark_missing(&self, path: &str) {
        self.missing.lock().insert(path.to_owned());
    }
}

impl RasterBackend for StubBackend {
    fn open_face(&self, path: &Path, size: u32, dpi: u32) -> Result<Box<dyn FontFace>, FontError> {
        if self.missing.lock().contains(&*path.to_string_lossy()) {
            return Err(FontError::FaceOpenFailed {
                path: path.to_path_buf(),
                reason: "no such file".to_owned(),
            });
        }
        if size == 0 || dpi == 0 {
            return Err(FontError::SizeSetFailed { size, dpi });
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubFace {
            counters: Arc::clone(&self.counters),
            glyphs: self.glyphs.clone(),
        }))
    }
}

pub(crate) struct StubFace {
    counters: Arc<Counters>,
    glyphs: StubGlyphs,
}

impl StubFace {
    pub fn new(glyphs: StubGlyphs) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            glyphs,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

impl FontFace for StubFace {
    fn char_index(&self, code_point: u32) -> GlyphIndex {
        GlyphIndex::try_from(code_point).unwrap_or(0)
    }

    fn rasterize(&mut self, glyph: GlyphIndex) -> Result<RasterGlyph, FontError> {
        self.counters.rasterizes.fetch_add(1, Ordering::SeqCst);
        if self.glyphs.fails(glyph) {
            return Err(FontError::GlyphLoadFailed { glyph });
        }
        let format = if self.glyphs.color.contains(&glyph) {
            PixelFormat::Rgba8
        } else {
            PixelFormat::Alpha8
        };
        let pitch = WIDTH * format.bytes_per_pixel();
        Ok(RasterGlyph {
            width: WIDTH,
            height: HEIGHT,
            pitch,
            left: 1,
            top: TOP,
            advance: self.glyphs.advances.get(&glyph).copied().unwrap_or(ADVANCE),
            format,
            data: vec![0xff; pitch * HEIGHT],
        })
    }

    fn probe_extents(&mut self, glyph: GlyphIndex) -> Result<GlyphExtents, FontError> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        if self.glyphs.fails(glyph) {
            return Err(FontError::GlyphLoadFailed { glyph });
        }
        Ok(GlyphExtents {
            y_min: TOP - HEIGHT as i32,
            y_max: TOP,
        })
    }

    fn has_kerning(&self) -> bool {
        !self.glyphs.kerning.is_empty()
    }

    fn kerning(&mut self, left: GlyphIndex, right: GlyphIndex) -> i32 {
        self.glyphs.kerning.get(&(left, right)).copied().unwrap_or(0)
    }
}
