//! Logging bootstrap.
//!
//! Installs a global `tracing` subscriber that writes to a daily-rolling
//! file and, optionally, to stderr. `RUST_LOG` overrides the configured
//! level. Keep the returned [`LoggingGuard`] alive for the life of the
//! process or buffered lines are lost.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILE_PREFIX: &str = "flurfunk.log";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log filter '{0}'")]
    Filter(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    /// Filter directive, e.g. `info` or `flurfunk=debug`.
    pub level: String,
    /// Base name of the rolling log files.
    pub file_prefix: String,
    /// Also write human-readable output to stderr.
    pub stderr: bool,
}

impl LoggingConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            level: "info".to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            stderr: false,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_stderr(mut self, enabled: bool) -> Self {
        self.stderr = enabled;
        self
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|_| LoggingError::Filter(self.level.clone())),
        }
    }
}

/// Flushes buffered log lines when dropped.
#[must_use = "logging stops when the guard is dropped"]
pub struct LoggingGuard {
    _file: WorkerGuard,
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(&config.directory).map_err(|source| LoggingError::CreateDir {
        path: config.directory.clone(),
        source,
    })?;

    let filter = config.filter()?;

    let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_timer(LocalTime::rfc_3339())
        .with_target(true);

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(LocalTime::rfc_3339())
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        directory = %config.directory.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _file: file_guard })
}
