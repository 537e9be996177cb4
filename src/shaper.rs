//! Text shaping: byte decoding, width clipping with kerning, glyph
//! compositing, and font-wide height/baseline metrics.
//!
//! Shaping is a single left-to-right pass per phase. There is no complex
//! script shaping: one code point yields one glyph.

use std::sync::Arc;

use crate::error::FontError;
use crate::glyph_cache::GlyphCache;
use crate::raster::{FontFace, GlyphExtents, GlyphIndex, PixelFormat, RasterGlyph};
use crate::string_cache::RenderedString;
use crate::surface::Surface;

/// Result of fitting glyphs into a width budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    /// Leading glyphs that fit.
    pub glyphs: usize,
    /// Total advance of those glyphs in pixels, kerning included.
    pub width: i32,
}

/// Font-wide vertical metrics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    /// Height of every composited string surface.
    pub max_height: i32,
    /// Distance from the surface top to the baseline.
    pub baseline: i32,
}

/// Decode text into code points.
///
/// A byte below `0x80` is a code point on its own. Any other byte starts a
/// three-byte sequence folded into 16 bits. Two- and four-byte UTF-8
/// sequences are not recognized.
pub fn decode(text: &[u8]) -> Vec<u32> {
    let mut code_points = Vec::with_capacity(text.len());
    let mut bytes = text.iter().copied();
    while let Some(lead) = bytes.next() {
        if lead < 0x80 {
            code_points.push(u32::from(lead));
            continue;
        }
        let (second, third) = (bytes.next(), bytes.next());
        code_points.push(fold_three_bytes(
            lead,
            second.unwrap_or(0),
            third.unwrap_or(0),
        ));
        if third.is_none() {
            break;
        }
    }
    code_points
}

fn fold_three_bytes(b0: u8, b1: u8, b2: u8) -> u32 {
    let folded = (u32::from(b0 & 0x1f) << 12) | (u32::from(b1 & 0x3f) << 6) | u32::from(b2 & 0x3f);
    u32::from(folded as u16)
}

/// Glyph indices for `text` in `face`.
pub fn glyph_indices(face: &dyn FontFace, text: &str) -> Vec<GlyphIndex> {
    decode(text.as_bytes())
        .into_iter()
        .map(|cp| face.char_index(cp))
        .collect()
}

/// Kerning between two adjacent glyphs, zero unless both are real glyphs.
fn pair_kerning(face: &mut dyn FontFace, prev: GlyphIndex, glyph: GlyphIndex) -> i32 {
    if prev != 0 && glyph != 0 && face.has_kerning() {
        face.kerning(prev, glyph)
    } else {
        0
    }
}

/// Count the leading glyphs whose cumulative advance stays within `max_width`.
///
/// Glyphs that fail to rasterize are logged, contribute no advance, and still
/// count as consumed. `None` never clips.
pub fn measure_and_clip(
    face: &mut dyn FontFace,
    glyphs: &mut GlyphCache,
    indices: &[GlyphIndex],
    max_width: Option<i32>,
) -> Fit {
    let mut fit = Fit { glyphs: 0, width: 0 };
    let mut prev = 0;

    for &glyph in indices {
        match glyphs.get_or_rasterize(face, glyph) {
            Ok(entry) => {
                let diff = entry.advance + pair_kerning(face, prev, glyph);
                if max_width.is_some_and(|max| fit.width + diff > max) {
                    break;
                }
                fit.width += diff;
            }
            Err(e) => log::warn!("shaper: {e}"),
        }
        prev = glyph;
        fit.glyphs += 1;
    }
    fit
}

/// Composite glyphs left to right into a `width × metrics.max_height` surface.
///
/// Each bitmap is placed at the pen position plus its bearings, with its top
/// bearing measured up from the baseline. Pixels falling outside the surface
/// are dropped. Glyphs that fail to rasterize, or come back in a format other
/// than 8-bit coverage, leave a gap.
pub fn composite(
    face: &mut dyn FontFace,
    glyphs: &mut GlyphCache,
    indices: &[GlyphIndex],
    width: i32,
    metrics: FontMetrics,
) -> Surface {
    let mut surface = Surface::new(width.max(0) as usize, metrics.max_height.max(0) as usize);
    let mut pen_x = 0;
    let mut prev = 0;

    for &glyph in indices {
        pen_x += pair_kerning(face, prev, glyph);
        prev = glyph;

        let entry = match glyphs.get_or_rasterize(face, glyph) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("shaper: {e}");
                continue;
            }
        };
        if let Err(e) = blit_glyph(&mut surface, entry, glyph, pen_x, metrics.baseline) {
            log::warn!("shaper: {e}");
        }
        pen_x += entry.advance;
    }
    surface
}

/// Copy one glyph's rows into `surface`.
fn blit_glyph(
    surface: &mut Surface,
    entry: &RasterGlyph,
    glyph: GlyphIndex,
    pen_x: i32,
    baseline: i32,
) -> Result<(), FontError> {
    if entry.format != PixelFormat::Alpha8 {
        return Err(FontError::UnsupportedPixelFormat {
            glyph,
            format: entry.format,
        });
    }

    let dest_x = pen_x + entry.left;
    let dest_y = baseline - entry.top;
    let surface_w = surface.width() as i32;

    // Horizontal overlap between the glyph row and the surface.
    let src_start = (-dest_x).max(0);
    let src_end = (entry.width as i32).min(surface_w - dest_x);
    if src_start >= src_end {
        return Ok(());
    }

    for y in 0..entry.height {
        let row_y = dest_y + y as i32;
        if row_y < 0 {
            continue;
        }
        let (Some(src), Some(dst)) = (entry.row(y), surface.row_mut(row_y as usize)) else {
            continue;
        };
        let src = &src[src_start as usize..src_end as usize];
        let dst_start = (dest_x + src_start) as usize;
        dst[dst_start..dst_start + src.len()].copy_from_slice(src);
    }
    Ok(())
}

/// Height and baseline covering the printable ASCII range.
///
/// Uses cached glyph boxes where present and probes the face otherwise,
/// without filling the glyph cache. When nothing in the range can be measured
/// the box is empty. Both values are then padded by `size / 4`, which the
/// bundled theme artwork expects.
pub fn compute_metrics(face: &mut dyn FontFace, glyphs: &GlyphCache, size: u32) -> FontMetrics {
    let mut bounds: Option<GlyphExtents> = None;

    for ch in '!'..='~' {
        let glyph = face.char_index(u32::from(ch));
        let extents = match glyphs.peek(glyph) {
            Some(entry) => entry.extents(),
            None => match face.probe_extents(glyph) {
                Ok(extents) => extents,
                Err(_) => continue,
            },
        };
        bounds = Some(bounds.map_or(extents, |b| b.union(extents)));
    }

    let GlyphExtents { y_min, y_max } = bounds.unwrap_or(GlyphExtents { y_min: 0, y_max: 0 });
    let padding = (size / 4) as i32;
    FontMetrics {
        max_height: y_max - y_min + padding,
        baseline: y_max + padding,
    }
}

/// Shape and composite `text` under `max_width`.
///
/// `metrics` is the font's cached metrics slot, filled on first use.
/// Fails with [`FontError::MetricsUnavailable`] when the font has no usable
/// height.
pub fn render(
    face: &mut dyn FontFace,
    glyphs: &mut GlyphCache,
    metrics: &mut Option<FontMetrics>,
    size: u32,
    text: &str,
    max_width: Option<i32>,
) -> Result<RenderedString, FontError> {
    let indices = glyph_indices(face, text);
    let fit = measure_and_clip(face, glyphs, &indices, max_width);

    let metrics = *metrics.get_or_insert_with(|| compute_metrics(face, glyphs, size));
    if metrics.max_height <= 0 {
        return Err(FontError::MetricsUnavailable);
    }

    let surface = composite(face, glyphs, &indices[..fit.glyphs], fit.width, metrics);
    Ok(RenderedString {
        surface: Arc::new(surface),
        glyph_count: fit.glyphs,
    })
}
