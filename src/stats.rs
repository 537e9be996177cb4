//! Cache diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Snapshot of one loaded font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontStats {
    pub path: PathBuf,
    pub size: u32,
    pub dpi: u32,
    pub refcount: usize,
    /// `None` until the font's metrics have been computed.
    pub max_height: Option<i32>,
    pub baseline: Option<i32>,
    pub glyph_entries: usize,
    /// Bytes of cached glyph bitmaps.
    pub glyph_bytes: usize,
    pub string_entries: usize,
    /// Approximate bytes held by the string cache.
    pub string_bytes: usize,
    /// String cache eviction batches.
    pub evictions: u64,
}

/// Snapshot of a whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub fonts: Vec<FontStats>,
}

impl RegistryStats {
    /// Approximate bytes held by all string caches.
    pub fn total_string_bytes(&self) -> usize {
        self.fonts.iter().map(|f| f.string_bytes).sum()
    }

    /// Bytes of all cached glyph bitmaps.
    pub fn total_glyph_bytes(&self) -> usize {
        self.fonts.iter().map(|f| f.glyph_bytes).sum()
    }
}

fn opt(value: Option<i32>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

impl fmt::Display for FontStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} size={} dpi={} refs={}",
            self.path.display(),
            self.size,
            self.dpi,
            self.refcount
        )?;
        writeln!(
            f,
            "  max_height={} baseline={}",
            opt(self.max_height),
            opt(self.baseline)
        )?;
        writeln!(
            f,
            "  glyphs: {} entries, {} bytes",
            self.glyph_entries, self.glyph_bytes
        )?;
        write!(
            f,
            "  strings: {} entries, {} bytes, {} evictions",
            self.string_entries, self.string_bytes, self.evictions
        )
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for font in &self.fonts {
            writeln!(f, "{font}")?;
        }
        write!(
            f,
            "{} fonts, {} string bytes, {} glyph bytes",
            self.fonts.len(),
            self.total_string_bytes(),
            self.total_glyph_bytes()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{FontStats, RegistryStats};

    fn font(path: &str, string_bytes: usize) -> FontStats {
        FontStats {
            path: PathBuf::from(path),
            size: 48,
            dpi: 96,
            refcount: 1,
            max_height: None,
            baseline: None,
            glyph_entries: 2,
            glyph_bytes: 100,
            string_entries: 1,
            string_bytes,
            evictions: 0,
        }
    }

    #[test]
    fn totals_sum_over_fonts() {
        let stats = RegistryStats {
            fonts: vec![font("a.ttf", 10), font("b.ttf", 32)],
        };
        assert_eq!(stats.total_string_bytes(), 42);
        assert_eq!(stats.total_glyph_bytes(), 200);
    }

    #[test]
    fn display_lists_each_font_and_total() {
        let stats = RegistryStats {
            fonts: vec![font("a.ttf", 10)],
        };
        let text = stats.to_string();
        assert!(text.starts_with("a.ttf size=48 dpi=96 refs=1\n"));
        assert!(text.contains("max_height=- baseline=-"));
        assert!(text.ends_with("1 fonts, 10 string bytes, 100 glyph bytes"));
    }

    #[test]
    fn empty_registry_display() {
        assert_eq!(
            RegistryStats::default().to_string(),
            "0 fonts, 0 string bytes, 0 glyph bytes"
        );
    }
}
