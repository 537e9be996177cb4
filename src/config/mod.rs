//! Configuration structures and validation.

mod io;

pub use io::{config_dir, config_path};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::string_cache::{MAX_ENTRIES, TRUNCATE_COUNT};

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub font: FontConfig,
    pub log: LogConfig,
}

/// String cache limits applied to every font a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Live entries that trigger a batch eviction.
    pub max_entries: usize,
    /// Least-recently-used entries dropped per batch. When unset, the
    /// default 150-in-400 ratio is scaled to `max_entries`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate_count: Option<usize>,
}

/// Font the `oritext` binary renders with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub path: PathBuf,
    /// Quarter points.
    pub size: u32,
    pub dpi: u32,
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRIES,
            truncate_count: None,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            size: 48,
            dpi: 96,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}

impl CacheConfig {
    /// Batch size the string cache uses.
    pub fn truncate_count(&self) -> usize {
        self.truncate_count.unwrap_or_else(|| {
            (self.max_entries.saturating_mul(TRUNCATE_COUNT) / MAX_ENTRIES).max(1)
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be at least 1".to_owned(),
            ));
        }
        if self.truncate_count == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.truncate_count must be at least 1".to_owned(),
            ));
        }
        if self.truncate_count() > self.max_entries {
            return Err(ConfigError::Invalid(format!(
                "cache.truncate_count ({}) exceeds cache.max_entries ({})",
                self.truncate_count(),
                self.max_entries
            )));
        }
        Ok(())
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.level.trim())
            .map_err(|_| ConfigError::Invalid(format!("unknown log.level {:?}", self.level)))
    }
}

impl Config {
    /// Check every section for values the crate cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.log.level_filter()?;
        if self.font.size == 0 || self.font.dpi == 0 {
            return Err(ConfigError::Invalid(
                "font.size and font.dpi must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Errors from reading or validating a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    Io { path: PathBuf, reason: String },
    /// The file is not valid TOML for [`Config`].
    Parse { path: PathBuf, reason: String },
    /// A value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "failed to read {}: {reason}", path.display()),
            Self::Parse { path, reason } => {
                write!(f, "parse error in {}: {reason}", path.display())
            }
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
