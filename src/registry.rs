//! Process-wide font registry.
//!
//! Fonts are shared by `(path, size, dpi)`: acquiring the same triple twice
//! returns handles to one loaded font and bumps its reference count. The
//! rasterizer backend is created lazily by the first acquire and kept for the
//! registry's lifetime. A font's face and caches go away when its last handle
//! is released.
//!
//! Locking: the registry mutex is always taken before any font mutex, never
//! the reverse. Handle release takes only the registry mutex.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::FontError;
use crate::font::{FontHandle, FontInner};
use crate::raster::{RasterBackend, SwashBackend};
use crate::stats::{FontStats, RegistryStats};

/// Creates the rasterizer backend on first use.
pub type BackendInit = dyn Fn() -> Result<Arc<dyn RasterBackend>, FontError> + Send + Sync;

/// Identity of a loaded font.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub path: PathBuf,
    /// Quarter points.
    pub size: u32,
    pub dpi: u32,
}

impl FontKey {
    pub fn new(path: &Path, size: u32, dpi: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            size,
            dpi,
        }
    }
}

impl fmt::Display for FontKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}dpi", self.path.display(), self.size, self.dpi)
    }
}

struct FontSlot {
    font: Arc<FontInner>,
    refcount: usize,
}

#[derive(Default)]
struct RegistryState {
    backend: Option<Arc<dyn RasterBackend>>,
    fonts: HashMap<FontKey, FontSlot>,
}

/// State shared by a registry and every handle it issued.
pub(crate) struct RegistryShared {
    state: Mutex<RegistryState>,
    init: Box<BackendInit>,
    cache: CacheConfig,
}

impl RegistryShared {
    /// Count one more reference to a font that already has a live handle.
    pub(crate) fn retain(&self, key: &FontKey) {
        if let Some(slot) = self.state.lock().fonts.get_mut(key) {
            slot.refcount += 1;
        }
    }

    /// Drop one reference; the last one removes the font from the registry.
    pub(crate) fn release(&self, key: &FontKey) {
        let mut state = self.state.lock();
        let Some(slot) = state.fonts.get_mut(key) else {
            return;
        };
        slot.refcount = slot.refcount.saturating_sub(1);
        if slot.refcount > 0 {
            return;
        }
        state.fonts.remove(key);
        log::debug!("font registry: closed {key}, {} fonts open", state.fonts.len());
    }

    pub(crate) fn refcount(&self, key: &FontKey) -> usize {
        self.state.lock().fonts.get(key).map_or(0, |slot| slot.refcount)
    }
}

/// Shared, reference-counted font store.
///
/// Cheap to clone; clones share one set of fonts.
#[derive(Clone)]
pub struct FontRegistry {
    shared: Arc<RegistryShared>,
}

impl FontRegistry {
    /// Registry with default cache limits whose backend comes from `init`.
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RasterBackend>, FontError> + Send + Sync + 'static,
    {
        Self::with_config(&CacheConfig::default(), init)
    }

    /// Registry whose fonts use the given string cache limits.
    pub fn with_config<F>(cache: &CacheConfig, init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RasterBackend>, FontError> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(RegistryShared {
                state: Mutex::new(RegistryState::default()),
                init: Box::new(init),
                cache: cache.clone(),
            }),
        }
    }

    /// Registry backed by the swash rasterizer.
    pub fn swash(cache: &CacheConfig) -> Self {
        Self::with_config(cache, || {
            Ok(Arc::new(SwashBackend::new()) as Arc<dyn RasterBackend>)
        })
    }

    /// Handle to the font at `path`, loading it on first request.
    ///
    /// `size` is in quarter points. On failure nothing is registered, and a
    /// backend that failed to initialize is retried on the next call.
    pub fn acquire(
        &self,
        path: impl AsRef<Path>,
        size: u32,
        dpi: u32,
    ) -> Result<FontHandle, FontError> {
        let key = FontKey::new(path.as_ref(), size, dpi);
        let mut state = self.shared.state.lock();

        if let Some(slot) = state.fonts.get_mut(&key) {
            slot.refcount += 1;
            return Ok(FontHandle::new(
                Arc::clone(&slot.font),
                Arc::clone(&self.shared),
            ));
        }

        let backend = match &state.backend {
            Some(backend) => Arc::clone(backend),
            None => {
                let backend = (self.shared.init)()
                    .inspect_err(|e| log::error!("font registry: {e}"))?;
                state.backend = Some(Arc::clone(&backend));
                backend
            }
        };

        let face = backend
            .open_face(&key.path, size, dpi)
            .inspect_err(|e| log::error!("font registry: {e}"))?;
        let font = Arc::new(FontInner::new(key.clone(), face, &self.shared.cache));
        log::debug!("font registry: opened {key}");
        state.fonts.insert(
            key,
            FontSlot {
                font: Arc::clone(&font),
                refcount: 1,
            },
        );
        Ok(FontHandle::new(font, Arc::clone(&self.shared)))
    }

    /// Number of distinct fonts currently loaded.
    pub fn len(&self) -> usize {
        self.shared.state.lock().fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().fonts.is_empty()
    }

    /// Snapshot of every loaded font's caches, sorted by path, size, then dpi.
    pub fn stats(&self) -> RegistryStats {
        let state = self.shared.state.lock();
        let mut fonts: Vec<FontStats> = state
            .fonts
            .values()
            .map(|slot| slot.font.stats(slot.refcount))
            .collect();
        fonts.sort_by(|a, b| (&a.path, a.size, a.dpi).cmp(&(&b.path, b.size, b.dpi)));
        RegistryStats { fonts }
    }
}

impl fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontRegistry")
            .field("fonts", &self.len())
            .finish()
    }
}
