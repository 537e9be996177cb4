//! Error kinds for font loading, glyph rasterization, and string rendering.

use std::fmt;
use std::path::PathBuf;

use crate::raster::{GlyphIndex, PixelFormat};

/// Errors produced by the font registry, caches, and shaper.
///
/// Per-glyph kinds (`GlyphLoadFailed`, `UnsupportedPixelFormat`) are logged
/// and skipped while shaping; the others reach the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    /// The shared rasterizer library could not be initialized.
    RasterizerInitFailed(String),
    /// The font file could not be read or is not a usable face.
    FaceOpenFailed { path: PathBuf, reason: String },
    /// The face rejected the requested size/DPI combination.
    SizeSetFailed { size: u32, dpi: u32 },
    /// A glyph could not be loaded or rendered.
    GlyphLoadFailed { glyph: GlyphIndex },
    /// A glyph rendered in a pixel format other than 8-bit coverage.
    UnsupportedPixelFormat { glyph: GlyphIndex, format: PixelFormat },
    /// Font metrics could not be established, so nothing can be composited.
    MetricsUnavailable,
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RasterizerInitFailed(reason) => {
                write!(f, "failed to initialize rasterizer: {reason}")
            }
            Self::FaceOpenFailed { path, reason } => {
                write!(f, "failed to load face {}: {reason}", path.display())
            }
            Self::SizeSetFailed { size, dpi } => {
                write!(f, "failed to set face size to {size}, dpi {dpi}")
            }
            Self::GlyphLoadFailed { glyph } => write!(f, "failed to load glyph idx {glyph}"),
            Self::UnsupportedPixelFormat { glyph, format } => {
                write!(f, "unsupported pixel format {format:?} for glyph idx {glyph}")
            }
            Self::MetricsUnavailable => write!(f, "font metrics unavailable"),
        }
    }
}

impl std::error::Error for FontError {}
