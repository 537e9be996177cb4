//! Configuration file I/O: path resolution and loading.

use std::path::{Path, PathBuf};

use super::{Config, ConfigError};

/// Returns the configuration directory for `oritext`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("oritext");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("oritext");
    }
    PathBuf::from(".").join("oritext")
}

/// Returns the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl Config {
    /// Loads config from the default path. Returns defaults if the file
    /// doesn't exist, can't be parsed, or holds invalid values.
    pub fn load() -> Self {
        let path = config_path();
        match Self::load_from(&path) {
            Ok(cfg) => {
                log::info!("config: loaded from {}", path.display());
                cfg
            }
            Err(ConfigError::Io { .. }) if !path.exists() => Self::default(),
            Err(e) => {
                log::warn!("config: {e}");
                Self::default()
            }
        }
    }

    /// Loads and validates config from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let cfg = Self::parse(&data).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        Ok(cfg)
    }

    /// Parses and validates config text. Parse errors carry an empty path.
    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(data).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The config as pretty-printed TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
