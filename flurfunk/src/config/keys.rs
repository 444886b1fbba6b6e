//! Addressable configuration keys (`section.key`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    StoreUrl,
    StoreTimeoutSecs,
    QueryDebounceMs,
    QueryRadiusBufferFactor,
    QueryMinRadiusKm,
    QueryKmPerDegree,
    QueryMaxRadiusKm,
    QueryTruncateRadius,
    LoggingLevel,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 10] = [
    ConfigKey::StoreUrl,
    ConfigKey::StoreTimeoutSecs,
    ConfigKey::QueryDebounceMs,
    ConfigKey::QueryRadiusBufferFactor,
    ConfigKey::QueryMinRadiusKm,
    ConfigKey::QueryKmPerDegree,
    ConfigKey::QueryMaxRadiusKm,
    ConfigKey::QueryTruncateRadius,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ConfigKey {
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// INI section and key name.
    pub fn section_and_name(&self) -> (&'static str, &'static str) {
        match self {
            ConfigKey::StoreUrl => ("store", "url"),
            ConfigKey::StoreTimeoutSecs => ("store", "timeout_secs"),
            ConfigKey::QueryDebounceMs => ("query", "debounce_ms"),
            ConfigKey::QueryRadiusBufferFactor => ("query", "radius_buffer_factor"),
            ConfigKey::QueryMinRadiusKm => ("query", "min_radius_km"),
            ConfigKey::QueryKmPerDegree => ("query", "km_per_degree"),
            ConfigKey::QueryMaxRadiusKm => ("query", "max_radius_km"),
            ConfigKey::QueryTruncateRadius => ("query", "truncate_radius"),
            ConfigKey::LoggingLevel => ("logging", "level"),
            ConfigKey::LoggingDirectory => ("logging", "directory"),
        }
    }

    /// Current value rendered as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::StoreUrl => config.store.url.clone(),
            ConfigKey::StoreTimeoutSecs => config.store.timeout_secs.to_string(),
            ConfigKey::QueryDebounceMs => config.query.debounce_ms.to_string(),
            ConfigKey::QueryRadiusBufferFactor => config.query.radius_buffer_factor.to_string(),
            ConfigKey::QueryMinRadiusKm => config.query.min_radius_km.to_string(),
            ConfigKey::QueryKmPerDegree => config.query.km_per_degree.to_string(),
            ConfigKey::QueryMaxRadiusKm => config.query.max_radius_km.to_string(),
            ConfigKey::QueryTruncateRadius => config.query.truncate_radius.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
        }
    }

    /// Parse `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::StoreUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(self.invalid(value, "must start with http:// or https://"));
                }
                config.store.url = value.trim_end_matches('/').to_string();
            }
            ConfigKey::StoreTimeoutSecs => {
                config.store.timeout_secs = self.parse_positive_u64(value)?;
            }
            ConfigKey::QueryDebounceMs => {
                config.query.debounce_ms = value
                    .parse()
                    .map_err(|_| self.invalid(value, "expected milliseconds"))?;
            }
            ConfigKey::QueryRadiusBufferFactor => {
                config.query.radius_buffer_factor = self.parse_positive_f64(value)?;
            }
            ConfigKey::QueryMinRadiusKm => {
                config.query.min_radius_km = self.parse_positive_f64(value)?;
            }
            ConfigKey::QueryKmPerDegree => {
                config.query.km_per_degree = self.parse_positive_f64(value)?;
            }
            ConfigKey::QueryMaxRadiusKm => {
                config.query.max_radius_km = self.parse_positive_f64(value)?;
            }
            ConfigKey::QueryTruncateRadius => {
                config.query.truncate_radius = match value.to_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => true,
                    "false" | "no" | "0" | "off" => false,
                    _ => return Err(self.invalid(value, "expected true or false")),
                };
            }
            ConfigKey::LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, "expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
            ConfigKey::LoggingDirectory => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.logging.directory = expand_home(value);
            }
        }
        Ok(())
    }

    fn parse_positive_f64(&self, value: &str) -> Result<f64, ConfigError> {
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => Err(self.invalid(value, "expected a positive number")),
        }
    }

    fn parse_positive_u64(&self, value: &str) -> Result<u64, ConfigError> {
        match value.parse::<u64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(self.invalid(value, "expected a positive integer")),
        }
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (section, name) = self.section_and_name();
        write!(f, "{}.{}", section, name)
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.to_string() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!("store.url".parse::<ConfigKey>().unwrap(), ConfigKey::StoreUrl);
        assert_eq!(
            "Query.Debounce_MS".parse::<ConfigKey>().unwrap(),
            ConfigKey::QueryDebounceMs
        );
        assert!(matches!(
            "query.colour".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_every_key_round_trips_through_display() {
        for key in ConfigKey::all() {
            assert_eq!(key.to_string().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::QueryRadiusBufferFactor
            .set(&mut config, "0.8")
            .unwrap();
        ConfigKey::QueryTruncateRadius.set(&mut config, "off").unwrap();
        ConfigKey::StoreUrl
            .set(&mut config, "https://notes.example/api/")
            .unwrap();

        assert_eq!(ConfigKey::QueryRadiusBufferFactor.get(&config), "0.8");
        assert_eq!(ConfigKey::QueryTruncateRadius.get(&config), "false");
        assert_eq!(ConfigKey::StoreUrl.get(&config), "https://notes.example/api");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::QueryMinRadiusKm.set(&mut config, "-1").is_err());
        assert!(ConfigKey::QueryMaxRadiusKm.set(&mut config, "NaN").is_err());
        assert!(ConfigKey::StoreTimeoutSecs.set(&mut config, "0").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, "loud").is_err());
        assert!(ConfigKey::StoreUrl.set(&mut config, "ftp://x").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
