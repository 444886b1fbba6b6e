//! INI-backed configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use super::{ConfigError, ConfigKey};
use crate::logging::LoggingConfig;
use crate::scheduler::SchedulerConfig;
use crate::store::{HttpStoreConfig, WireLimits, DEFAULT_MAX_RADIUS_KM, DEFAULT_STORE_URL};
use crate::viewport::{
    RadiusConfig, DEFAULT_KM_PER_DEGREE, DEFAULT_MIN_RADIUS_KM, DEFAULT_RADIUS_BUFFER_FACTOR,
};

const APP_DIR: &str = "flurfunk";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Path of the user configuration file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

/// Default directory for log files.
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("logs")
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// `[query]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub debounce_ms: u64,
    pub radius_buffer_factor: f64,
    pub min_radius_km: f64,
    pub km_per_degree: f64,
    pub max_radius_km: f64,
    pub truncate_radius: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            radius_buffer_factor: DEFAULT_RADIUS_BUFFER_FACTOR,
            min_radius_km: DEFAULT_MIN_RADIUS_KM,
            km_per_degree: DEFAULT_KM_PER_DEGREE,
            max_radius_km: DEFAULT_MAX_RADIUS_KM,
            truncate_radius: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: default_log_dir(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub store: StoreSettings,
    pub query: QuerySettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`]. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path()?)
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            let (section, name) = key.section_and_name();
            if let Some(value) = ini.section(Some(section)).and_then(|s| s.get(name)) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Write to [`config_file_path`], creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path()?)
    }

    /// Write to `path`, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let (section, name) = key.section_and_name();
            ini.with_section(Some(section)).set(name, key.get(self));
        }
        ini
    }

    pub fn radius_config(&self) -> RadiusConfig {
        RadiusConfig {
            km_per_degree: self.query.km_per_degree,
            buffer_factor: self.query.radius_buffer_factor,
            min_radius_km: self.query.min_radius_km,
        }
    }

    pub fn wire_limits(&self) -> WireLimits {
        WireLimits {
            max_radius_km: self.query.max_radius_km,
            truncate_radius: self.query.truncate_radius,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_debounce(Duration::from_millis(self.query.debounce_ms))
            .with_radius(self.radius_config())
            .with_wire_limits(self.wire_limits())
    }

    pub fn http_store_config(&self) -> HttpStoreConfig {
        HttpStoreConfig::new(self.store.url.clone())
            .with_timeout(Duration::from_secs(self.store.timeout_secs))
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::new(self.logging.directory.clone()).with_level(self.logging.level.clone())
    }
}
