//! Logger trait definition

use std::sync::Arc;

/// Logger abstraction shared by every component
///
/// Implementations:
/// - `NoOpLogger`: Silent logger for testing
/// - `ConsoleLogger`: Logs to stderr
/// - `FileLogger`: Appends to a log file
/// - `MemoryLogger`: Captures lines for assertions
pub trait Logger: Send + Sync {
    /// Log a debug message
    fn debug(&self, message: &str);

    /// Log an info message
    fn info(&self, message: &str);

    /// Log a warning message
    fn warn(&self, message: &str);

    /// Log an error message
    fn error(&self, message: &str);
}

/// Type alias for an Arc-wrapped logger
pub type SharedLogger = Arc<dyn Logger>;

/// Extension trait for logging with format arguments
pub trait LoggerExt: Logger {
    /// Log a debug message with format arguments
    fn debug_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.debug(&args.to_string());
    }

    /// Log an info message with format arguments
    fn info_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.info(&args.to_string());
    }

    /// Log a warning message with format arguments
    fn warn_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.warn(&args.to_string());
    }

    /// Log an error message with format arguments
    fn error_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.error(&args.to_string());
    }
}

impl<T: Logger + ?Sized> LoggerExt for T {}

/// Convenience macros for logging
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;

    #[test]
    fn test_macros_and_fmt_helpers() {
        let memory = Arc::new(MemoryLogger::new());
        let logger: SharedLogger = memory.clone();

        crate::log_info!(logger, "[Test] {} providers", 2);
        crate::log_error!(logger, "[Test] failed: {}", "boom");
        logger.warn_fmt(format_args!("[Test] slow {}", "tool"));

        assert!(memory.contains("[Test] 2 providers"));
        assert!(memory.contains("[Test] failed: boom"));
        assert!(memory.contains("[Test] slow tool"));
    }
}
