//! Configuration file support.
//!
//! Settings live in an INI file at `<config_dir>/flurfunk/config.ini`:
//!
//! ```ini
//! [store]
//! url = http://localhost:3000/api
//! timeout_secs = 10
//!
//! [query]
//! debounce_ms = 500
//! radius_buffer_factor = 0.6
//! min_radius_km = 1
//! km_per_degree = 111
//! max_radius_km = 50
//! truncate_radius = true
//!
//! [logging]
//! level = info
//! directory = ~/.cache/flurfunk/logs
//! ```
//!
//! A missing file or missing keys fall back to defaults. [`ConfigFile`]
//! converts into the runtime configs used by the library.

mod file;
mod keys;

pub use file::{
    config_file_path, default_log_dir, ConfigFile, LoggingSettings, QuerySettings, StoreSettings,
};
pub use keys::ConfigKey;

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}
