//! File-based logger
//!
//! Useful when stderr is shared with an interactive console.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

use super::traits::Logger;

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Parse a level name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "trace" | "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Level from `TOOLMUX_LOG_LEVEL`, or `default` when unset or unrecognised
    pub fn from_env(default: LogLevel) -> Self {
        std::env::var("TOOLMUX_LOG_LEVEL")
            .ok()
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(default)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<5}", self.as_str())
    }
}

/// Logger that appends timestamped lines to a file
pub struct FileLogger {
    path: PathBuf,
    file: Mutex<File>,
    min_level: LogLevel,
}

impl FileLogger {
    /// Open (or create) `path` for appending
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            min_level: LogLevel::from_env(LogLevel::Debug),
        })
    }

    /// Default log location: `<tmp>/toolmux.log`
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("toolmux.log")
    }

    /// Set the minimum level that is written
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| {
                let secs = d.as_secs();
                let millis = d.subsec_millis();
                let hours = (secs % 86400) / 3600;
                let mins = (secs % 3600) / 60;
                let secs = secs % 60;
                format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
            })
            .unwrap_or_else(|_| "??:??:??.???".to_string());

        let mut file = self.file.lock();
        let _ = writeln!(file, "[{}] [{}] {}", timestamp, level, message);
        let _ = file.flush();
    }
}

impl std::fmt::Debug for FileLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogger")
            .field("path", &self.path)
            .field("min_level", &self.min_level)
            .finish()
    }
}

impl Logger for FileLogger {
    fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_levels() {
        assert!(LogLevel::Info > LogLevel::Debug);
        assert!(LogLevel::Warn > LogLevel::Info);
        assert!(LogLevel::Error > LogLevel::Warn);
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_file_logger_writes_above_min_level() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("toolmux.log");
        let logger = FileLogger::open(&path).unwrap().with_min_level(LogLevel::Info);

        logger.debug("hidden");
        logger.info("registry ready");
        logger.error("provider failed");

        let content = std::fs::read_to_string(logger.path()).unwrap();
        assert!(!content.contains("hidden"));
        assert!(content.contains("[INFO ] registry ready"));
        assert!(content.contains("[ERROR] provider failed"));
    }
}
