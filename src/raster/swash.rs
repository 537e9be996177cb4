//! `swash`-backed rasterizer with kerning read through `rustybuzz::ttf_parser`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rustybuzz::ttf_parser;
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;
use swash::{CacheKey, FontRef};

use super::{FontFace, GlyphIndex, PixelFormat, RasterBackend, RasterGlyph};
use crate::error::FontError;

/// Face loader backed by `swash`.
///
/// Holds no global state; every opened face owns its bytes and scale context.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwashBackend;

impl SwashBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RasterBackend for SwashBackend {
    fn open_face(&self, path: &Path, size: u32, dpi: u32) -> Result<Box<dyn FontFace>, FontError> {
        Ok(Box::new(SwashFace::open(path, size, dpi)?))
    }
}

/// Pixels per em for a size given in quarter points at `dpi`.
///
/// Returns `None` when the result cannot be used as a scale.
pub fn pixels_per_em(size: u32, dpi: u32) -> Option<f32> {
    let ppem = size as f32 * dpi as f32 / 288.0;
    (ppem.is_finite() && ppem > 0.0).then_some(ppem)
}

/// Validate font bytes and extract swash metadata.
fn validate_font(data: &[u8]) -> Option<(u32, CacheKey)> {
    let fr = FontRef::from_index(data, 0)?;
    Some((fr.offset, fr.key))
}

/// An opened face: raw bytes plus swash identifiers for transient `FontRef` creation.
struct SwashFace {
    bytes: Arc<Vec<u8>>,
    /// Byte offset to the font table directory (from `FontRef::from_index`).
    offset: u32,
    cache_key: CacheKey,
    ppem: f32,
    units_per_em: u16,
    has_kerning: bool,
    /// Pixel kerning of every pair looked up so far.
    kern_pairs: HashMap<(GlyphIndex, GlyphIndex), i32>,
    scale_context: ScaleContext,
}

impl SwashFace {
    fn open(path: &Path, size: u32, dpi: u32) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|e| FontError::FaceOpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let (offset, cache_key) = validate_font(&bytes).ok_or_else(|| FontError::FaceOpenFailed {
            path: path.to_path_buf(),
            reason: "unrecognized font data".to_owned(),
        })?;
        let ppem = pixels_per_em(size, dpi).ok_or(FontError::SizeSetFailed { size, dpi })?;

        let parsed = ttf_parser::Face::parse(&bytes, 0).ok();
        let units_per_em = parsed.as_ref().map_or(0, ttf_parser::Face::units_per_em);
        let has_kerning = parsed
            .as_ref()
            .and_then(|face| face.tables().kern.as_ref().map(|kern| kern.subtables))
            .is_some_and(|subtables| subtables.into_iter().any(|s| s.horizontal && !s.variable));

        log::debug!(
            "swash: opened {} at {ppem:.2} ppem (kerning: {has_kerning})",
            path.display()
        );

        Ok(Self {
            bytes: Arc::new(bytes),
            offset,
            cache_key,
            ppem,
            units_per_em,
            has_kerning,
            kern_pairs: HashMap::new(),
            scale_context: ScaleContext::new(),
        })
    }

    /// Look a pair up in the `kern` table, scaled and floored to pixels.
    fn lookup_kerning(&self, left: GlyphIndex, right: GlyphIndex) -> i32 {
        let Ok(face) = ttf_parser::Face::parse(&self.bytes, 0) else {
            return 0;
        };
        let Some(kern) = face.tables().kern.as_ref() else {
            return 0;
        };
        let units = kern
            .subtables
            .into_iter()
            .filter(|s| s.horizontal && !s.variable)
            .find_map(|s| {
                s.glyphs_kerning(ttf_parser::GlyphId(left), ttf_parser::GlyphId(right))
            })
            .unwrap_or(0);
        (f32::from(units) * self.ppem / f32::from(self.units_per_em)).floor() as i32
    }
}

/// Create a transient swash `FontRef` over stored bytes.
fn font_ref(bytes: &[u8], offset: u32, key: CacheKey) -> FontRef<'_> {
    FontRef {
        data: bytes,
        offset,
        key,
    }
}

impl FontFace for SwashFace {
    fn char_index(&self, code_point: u32) -> GlyphIndex {
        font_ref(&self.bytes, self.offset, self.cache_key)
            .charmap()
            .map(code_point)
    }

    fn rasterize(&mut self, glyph: GlyphIndex) -> Result<RasterGlyph, FontError> {
        // Borrow fields individually so the scale context can be taken mutably.
        let fr = font_ref(&self.bytes, self.offset, self.cache_key);
        let advance = fr
            .glyph_metrics(&[])
            .scale(self.ppem)
            .advance_width(glyph)
            .round() as i32;

        let mut scaler = self
            .scale_context
            .builder(fr)
            .size(self.ppem)
            .hint(true)
            .build();
        let image = Render::new(&[
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
        ])
        .format(Format::Alpha)
        .render(&mut scaler, glyph)
        .ok_or(FontError::GlyphLoadFailed { glyph })?;

        let format = match image.content {
            Content::Mask => PixelFormat::Alpha8,
            Content::SubpixelMask => PixelFormat::SubpixelMask,
            Content::Color => PixelFormat::Rgba8,
        };
        let width = image.placement.width as usize;

        Ok(RasterGlyph {
            width,
            height: image.placement.height as usize,
            pitch: width * format.bytes_per_pixel(),
            left: image.placement.left,
            top: image.placement.top,
            advance,
            format,
            data: image.data,
        })
    }

    fn has_kerning(&self) -> bool {
        self.has_kerning
    }

    fn kerning(&mut self, left: GlyphIndex, right: GlyphIndex) -> i32 {
        if !self.has_kerning || self.units_per_em == 0 {
            return 0;
        }
        if let Some(&px) = self.kern_pairs.get(&(left, right)) {
            return px;
        }
        let px = self.lookup_kerning(left, right);
        self.kern_pairs.insert((left, right), px);
        px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_per_em_from_quarter_points() {
        // 48 quarter points = 12pt; at 96 dpi that is 16px.
        assert_eq!(pixels_per_em(48, 96), Some(16.0));
        assert_eq!(pixels_per_em(288, 72), Some(72.0));
    }

    #[test]
    fn zero_size_or_dpi_is_rejected() {
        assert_eq!(pixels_per_em(0, 96), None);
        assert_eq!(pixels_per_em(48, 0), None);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let err = SwashBackend::new()
            .open_face(Path::new("/nonexistent/font.ttf"), 48, 96)
            .err()
            .expect("open must fail");
        assert!(matches!(err, FontError::FaceOpenFailed { .. }));
    }

    #[test]
    fn kerning_pairs_are_memoized() {
        let path = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        let Ok(mut face) = SwashFace::open(path, 192, 96) else {
            return;
        };
        if !face.has_kerning() {
            return;
        }
        let (a, v) = (face.char_index('A' as u32), face.char_index('V' as u32));

        let first = face.kerning(a, v);
        assert_eq!(face.kerning(a, v), first);
        assert_eq!(face.kern_pairs.get(&(a, v)), Some(&first));
        assert_eq!(face.kern_pairs.len(), 1);

        face.kerning(v, a);
        assert_eq!(face.kern_pairs.len(), 2);
    }

    #[test]
    fn garbage_bytes_fail_to_open() {
        let path = std::env::temp_dir().join(format!("ori_text_garbage_{}.ttf", std::process::id()));
        std::fs::write(&path, b"definitely not a font").unwrap();
        let result = SwashBackend::new().open_face(&path, 48, 96);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(FontError::FaceOpenFailed { .. })));
    }
}
