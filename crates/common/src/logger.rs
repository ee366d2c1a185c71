use crate::error::ReciperankError;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "reciperank.log";

/// Log to stderr and append to `<log_dir>/reciperank.log`.
///
/// stdout is left to retrieval summaries and metric reports.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), ReciperankError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        ReciperankError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            ReciperankError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(level_filter(log_level));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_ansi(false)
        .with_filter(level_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ReciperankError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!("Logging to {}", log_file_path.display());
    Ok(())
}

/// stderr-only logging for commands that write no files
pub fn setup_console_logging(log_level: &str) -> Result<(), ReciperankError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(level_filter(log_level))
        .try_init()
        .map_err(|e| ReciperankError::config(format!("Failed to initialize logging: {}", e)))
}

/// `RUST_LOG` wins over the configured level
fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_log_level(log_level).as_str()))
}

/// Parse string to tracing Level
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level);
            Level::INFO
        }
    }
}
