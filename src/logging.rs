//! Logging (tracing) setup.
//!
//! Events go to stderr and are appended to a per-day file
//! `<log_dir>/<YYYY-MM-DD>.log`. `RUST_LOG` overrides the level picked from
//! `--debug`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Log directory used when `--log` is not given.
pub const DEFAULT_LOG_DIR: &str = "~/qbot/logs";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that can occur while setting up logging.
#[derive(Debug)]
pub enum LoggingError {
    /// The log directory or file could not be created.
    Io { path: PathBuf, source: std::io::Error },
    /// A global subscriber was already installed.
    AlreadyInitialized(String),
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Could not open log file {}: {}", path.display(), source)
            }
            Self::AlreadyInitialized(msg) => write!(f, "Logging already initialized: {}", msg),
        }
    }
}

impl std::error::Error for LoggingError {}

/// Path of today's log file inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{}.log", date))
}

/// Install the global subscriber. Returns the log file path.
pub fn init(log_dir: &Path, debug: bool) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(log_dir).map_err(|e| LoggingError::Io {
        path: log_dir.to_path_buf(),
        source: e,
    })?;
    let log_path = log_file_path(log_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| LoggingError::Io {
            path: log_path.clone(),
            source: e,
        })?;

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_timer(timer)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(log_path)
}
