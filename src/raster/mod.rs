//! Rasterizer collaborator interface.
//!
//! The caches never parse font files or scan-convert outlines themselves.
//! A [`RasterBackend`] is the process-wide library handle that opens faces;
//! each opened [`FontFace`] maps code points to glyph indices, renders one
//! glyph at a time, and answers kerning queries. [`swash`] is the production
//! implementation.

pub mod swash;
#[cfg(test)]
pub(crate) mod stub;

use std::path::Path;

use crate::error::FontError;

pub use self::swash::SwashBackend;

/// Rasterizer-internal identifier of a glyph within one face. `0` is `.notdef`.
pub type GlyphIndex = u16;

/// Pixel layout of a rendered glyph bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte of coverage per pixel. The only format the compositor accepts.
    Alpha8,
    /// Per-channel (RGB) coverage, four bytes per pixel.
    SubpixelMask,
    /// Premultiplied color, four bytes per pixel (emoji and color fonts).
    Rgba8,
}

impl PixelFormat {
    /// Bytes used by one pixel in this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha8 => 1,
            Self::SubpixelMask | Self::Rgba8 => 4,
        }
    }
}

/// Vertical extents of a glyph box in pixels, y growing upwards from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphExtents {
    pub y_min: i32,
    pub y_max: i32,
}

impl GlyphExtents {
    /// Smallest extents covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// One rendered glyph: bitmap plus placement and advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterGlyph {
    /// Bitmap width in pixels.
    pub width: usize,
    /// Bitmap height in pixels (rows).
    pub height: usize,
    /// Bytes per bitmap row.
    pub pitch: usize,
    /// X bearing: offset from the pen position to the bitmap's left edge.
    pub left: i32,
    /// Y bearing: distance from the baseline up to the bitmap's top row.
    pub top: i32,
    /// Horizontal advance in whole pixels.
    pub advance: i32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RasterGlyph {
    /// Vertical bounding box of the bitmap relative to the baseline.
    pub fn extents(&self) -> GlyphExtents {
        GlyphExtents {
            y_min: self.top - self.height as i32,
            y_max: self.top,
        }
    }

    /// Bitmap row `y`, `width × bytes_per_pixel` bytes long.
    ///
    /// Returns `None` past the last row or if the buffer is shorter than
    /// `pitch` implies.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.pitch;
        let len = self.width * self.format.bytes_per_pixel();
        self.data.get(start..start + len)
    }
}

/// An opened face at a fixed pixel size and DPI.
///
/// Faces live inside a font's mutex, so they only need to be `Send`.
pub trait FontFace: Send {
    /// Glyph index for a Unicode code point; `0` when the face has no glyph.
    fn char_index(&self, code_point: u32) -> GlyphIndex;

    /// Render one glyph to a coverage bitmap.
    fn rasterize(&mut self, glyph: GlyphIndex) -> Result<RasterGlyph, FontError>;

    /// Vertical extents of a glyph without caching it.
    ///
    /// Used by metrics computation for glyphs that are not in the glyph cache.
    /// The default renders the glyph and discards the bitmap.
    fn probe_extents(&mut self, glyph: GlyphIndex) -> Result<GlyphExtents, FontError> {
        self.rasterize(glyph).map(|g| g.extents())
    }

    /// Whether the face carries pair kerning data.
    fn has_kerning(&self) -> bool;

    /// Horizontal adjustment in whole pixels between two adjacent glyphs.
    ///
    /// Takes `&mut self` so a face may memoize pairs it has looked up.
    fn kerning(&mut self, left: GlyphIndex, right: GlyphIndex) -> i32;
}

/// The shared rasterizer library: opens faces from files.
pub trait RasterBackend: Send + Sync {
    /// Open the face stored at `path` at `size` (quarter points) and `dpi`.
    fn open_face(&self, path: &Path, size: u32, dpi: u32) -> Result<Box<dyn FontFace>, FontError>;
}
