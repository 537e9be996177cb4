//! File logger for the `log` facade.
//!
//! Appends one `LEVEL target: message` line per record to a debug log next to
//! the executable. Write failures are ignored.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

/// Default log file location: `oritext_debug.log` beside the executable.
pub fn log_path() -> PathBuf {
    std::env::current_exe()
        .unwrap_or_default()
        .parent()
        .unwrap_or(Path::new("."))
        .join("oritext_debug.log")
}

/// Logger appending to a single file.
pub struct FileLogger {
    path: PathBuf,
    level: LevelFilter,
    file: Mutex<Option<File>>,
}

impl FileLogger {
    pub fn new(path: PathBuf, level: LevelFilter) -> Self {
        Self {
            path,
            level,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Install as the global logger with `level` as the max level.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn format(record: &Record<'_>) -> String {
        format!("{} {}: {}\n", record.level(), record.target(), record.args())
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        let mut file = self.file.lock();
        if file.is_none() {
            *file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .ok();
        }
        if let Some(f) = file.as_mut() {
            let _ = f.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Some(f) = self.file.lock().as_mut() {
            let _ = f.flush();
        }
    }
}
