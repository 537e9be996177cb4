//! Rendering-backend interface and an in-memory coverage canvas.

use crate::surface::Surface;

/// Axis-aligned rectangle in target pixels, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ClipRect {
    pub fn width(self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Consumer of composited string surfaces.
pub trait RenderTarget {
    /// Draw `surface` with its top-left corner at `(x, y)`, touching only
    /// pixels inside `clip`.
    ///
    /// Called with no font or registry lock held: an implementation may
    /// measure, acquire, or drop font handles.
    fn draw_coverage(&mut self, surface: &Surface, x: i32, y: i32, clip: ClipRect);
}

/// Grayscale framebuffer that keeps the maximum coverage drawn at each pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Rows `0..rows` that contain any coverage.
    pub fn inked_rows(&self) -> usize {
        self.data
            .chunks(self.width.max(1))
            .rposition(|row| row.iter().any(|&p| p != 0))
            .map_or(0, |last| last + 1)
    }

    /// Binary PGM (`P5`) encoding of the canvas.
    pub fn to_pgm(&self) -> Vec<u8> {
        let mut out = format!("P5\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.data);
        out
    }
}

impl RenderTarget for Canvas {
    fn draw_coverage(&mut self, surface: &Surface, x: i32, y: i32, clip: ClipRect) {
        let left = clip.left.max(x).max(0);
        let top = clip.top.max(y).max(0);
        let right = clip
            .right
            .min(x.saturating_add(surface.width() as i32))
            .min(self.width as i32);
        let bottom = clip
            .bottom
            .min(y.saturating_add(surface.height() as i32))
            .min(self.height as i32);

        for py in top..bottom {
            for px in left..right {
                let Some(src) = surface.pixel((px - x) as usize, (py - y) as usize) else {
                    continue;
                };
                let dst = &mut self.data[py as usize * self.width + px as usize];
                *dst = (*dst).max(src);
            }
        }
    }
}
