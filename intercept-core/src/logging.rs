use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::InterceptError;

/// Logging configuration for embedders of the interceptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Whether to enable JSON formatted logs
    pub json_format: bool,

    /// Whether to include thread names in logs
    pub include_thread_names: bool,

    /// Whether to include file and line number information
    pub include_file_info: bool,

    /// Whether to enable colored output (only for non-JSON format)
    pub enable_colors: bool,

    /// Log file path (optional, if None logs only to stdout)
    pub log_file: Option<String>,

    /// Module-specific log levels
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_levels = HashMap::new();
        module_levels.insert("intercept_core".to_string(), "info".to_string());
        module_levels.insert("tokio".to_string(), "warn".to_string());

        Self {
            level: "info".to_string(),
            json_format: false,
            include_thread_names: true,
            include_file_info: false,
            enable_colors: true,
            log_file: None,
            module_levels,
        }
    }
}

/// Initialize logging based on the provided configuration.
///
/// When a log file is configured the returned guard must be kept alive for
/// buffered lines to be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, InterceptError> {
    if !levels::is_valid_level(&config.level) {
        return Err(InterceptError::Logging(format!("Invalid log level: {}", config.level)));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| InterceptError::Logging(format!("Invalid log directive: {}", e)))?,
        );
    }

    let stdout_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_thread_names(config.include_thread_names)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_names(config.include_thread_names)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .with_ansi(config.enable_colors)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let appender = create_file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    // Try to initialize logging, ignore if already initialized
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    match result {
        Ok(_) => tracing::info!("Logging initialized with config level: {}", config.level),
        Err(_) => tracing::debug!("Logging already initialized, skipping"),
    }

    Ok(guard)
}

/// Create a daily-rotated file appender
fn create_file_appender(
    log_file: &str,
) -> Result<tracing_appender::rolling::RollingFileAppender, InterceptError> {
    use std::path::Path;
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let log_path = Path::new(log_file);
    let directory = log_path
        .parent()
        .ok_or_else(|| InterceptError::Logging("Invalid log file path".to_string()))?;
    let filename = log_path
        .file_name()
        .ok_or_else(|| InterceptError::Logging("Invalid log file name".to_string()))?
        .to_string_lossy();

    std::fs::create_dir_all(directory)
        .map_err(|e| InterceptError::Logging(format!("Failed to create log directory: {}", e)))?;

    Ok(RollingFileAppender::new(Rotation::DAILY, directory, filename.as_ref()))
}

/// Log level utilities
pub mod levels {
    /// Check if a log level string is valid
    pub fn is_valid_level(level: &str) -> bool {
        matches!(
            level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        )
    }
}

/// Structured log line for an interception decision or release
#[macro_export]
macro_rules! log_intercept_event {
    ($level:ident, $transaction_id:expr, $direction:expr, $event:expr $(, $field:ident = $value:expr)*) => {
        tracing::$level!(
            transaction_id = %$transaction_id,
            direction = %$direction,
            event = $event,
            $($field = $value,)*
            "Intercept event"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(init_logging(&config), Err(InterceptError::Logging(_))));
    }

    #[test]
    fn test_invalid_module_directive_rejected() {
        let mut config = LoggingConfig::default();
        config.module_levels.insert("intercept_core".to_string(), "loud".to_string());
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_file_logging_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("logs").join("interceptor.log");
        let config = LoggingConfig {
            log_file: Some(log_path.to_string_lossy().to_string()),
            enable_colors: false,
            ..Default::default()
        };

        let guard = init_logging(&config).unwrap();
        assert!(guard.is_some());
        assert!(dir.path().join("logs").is_dir());

        // A second init is tolerated
        assert!(init_logging(&LoggingConfig::default()).is_ok());
    }
}
