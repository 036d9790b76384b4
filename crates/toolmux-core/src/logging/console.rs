//! Console logger implementation

use super::file_logger::LogLevel;
use super::traits::Logger;

/// A logger that writes to stderr
///
/// Everything goes to stderr so the console front end owns stdout.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// Create a new console logger with default prefix, level from `TOOLMUX_LOG_LEVEL`
    pub fn new() -> Self {
        Self {
            prefix: "[toolmux]".to_string(),
            min_level: LogLevel::from_env(LogLevel::Info),
        }
    }

    /// Create a console logger with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Set the minimum level that is printed
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if level >= self.min_level {
            eprintln!("{} {}: {}", self.prefix, level.as_str(), message);
        }
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logger_creation() {
        let logger = ConsoleLogger::new();
        assert_eq!(logger.prefix, "[toolmux]");

        let custom = ConsoleLogger::with_prefix("[relay]").with_min_level(LogLevel::Error);
        assert_eq!(custom.prefix, "[relay]");
        assert_eq!(custom.min_level, LogLevel::Error);
    }

    #[test]
    fn test_console_logger_logs() {
        // Only verifies the logger doesn't panic
        let logger = ConsoleLogger::new().with_min_level(LogLevel::Debug);
        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");
    }
}
