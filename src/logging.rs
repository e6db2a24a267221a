//! Logging setup.
//!
//! Two outputs:
//! - stdout, with ANSI colours
//! - `<log_dir>/shotrelay.<date>.log`, rotated daily, five files kept
//!
//! `RUST_LOG` overrides the configured level when set.

use std::path::Path;
use std::str::FromStr;

use tracing::{Level, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{RelayError, RelayResult};

const LOG_FILE_PREFIX: &str = "shotrelay";
const MAX_LOG_FILES: usize = 5;

/// Keeps the non-blocking file writer alive. Dropping it flushes the file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber.
pub fn init_logging(log_dir: &Path, level: &str) -> RelayResult<LoggingGuard> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| RelayError::io_at("create log directory", log_dir, e))?;

    let file_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| RelayError::external("tracing-appender", e))?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    let (env_filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_filter(level)), false),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| RelayError::external("tracing-subscriber", e))?;

    if !from_env && parse_level(level).is_none() {
        warn!(log_level = level, "Unknown log level, using INFO");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter directive for a configured level name. Accepts the usual
/// upper-case names, including `WARNING` and `CRITICAL`. Anything else
/// falls back to `info`.
pub fn default_filter(level: &str) -> String {
    parse_level(level)
        .unwrap_or(Level::INFO)
        .as_str()
        .to_ascii_lowercase()
}

fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        "critical" | "fatal" => Some(Level::ERROR),
        // numeric levels are accepted by `Level::from_str` but are not level names
        name if name.chars().all(|c| c.is_ascii_alphabetic()) => Level::from_str(name).ok(),
        _ => None,
    }
}

/// Default log directory.
pub fn default_log_dir() -> &'static str {
    "logs"
}
