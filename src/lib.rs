//! Cached text rendering for bitmap surfaces.
//!
//! A [`FontRegistry`] shares loaded fonts by `(path, size, dpi)`. Each font
//! keeps a glyph cache, an LRU cache of composited strings, and its vertical
//! metrics behind one mutex. Strings are shaped left to right with pair
//! kerning, composited into 8-bit coverage [`Surface`]s, and drawn into any
//! [`RenderTarget`].

pub mod config;
pub mod error;
pub mod font;
pub mod glyph_cache;
pub mod logging;
pub mod raster;
pub mod registry;
pub mod shaper;
pub mod stats;
pub mod string_cache;
pub mod surface;
pub mod target;

pub use config::{CacheConfig, Config, ConfigError};
pub use error::FontError;
pub use font::FontHandle;
pub use raster::{FontFace, GlyphExtents, GlyphIndex, PixelFormat, RasterBackend, RasterGlyph};
pub use registry::{FontKey, FontRegistry};
pub use shaper::{Fit, FontMetrics};
pub use stats::{FontStats, RegistryStats};
pub use string_cache::{MAX_ENTRIES, TRUNCATE_COUNT};
pub use surface::Surface;
pub use target::{Canvas, ClipRect, RenderTarget};
