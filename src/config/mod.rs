//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Team sets per provider page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages a provider scans before reporting truncation
    #[serde(default = "default_max_scan_pages")]
    pub max_scan_pages: usize,

    /// Team sets whose path sets are memoized per game type
    #[serde(default = "default_filter_cache_capacity")]
    pub filter_cache_capacity: usize,

    /// Results returned when no limit is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_page_size() -> usize {
    50
}

fn default_max_scan_pages() -> usize {
    200
}

fn default_filter_cache_capacity() -> usize {
    10_000
}

fn default_limit() -> usize {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_scan_pages: default_max_scan_pages(),
            filter_cache_capacity: default_filter_cache_capacity(),
            default_limit: default_limit(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub search: SearchConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            search: SearchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "Search page size must be greater than 0".to_string(),
            ));
        }

        if self.search.max_scan_pages == 0 {
            return Err(ConfigError::ValidationError(
                "Max scan pages must be greater than 0".to_string(),
            ));
        }

        if self.search.filter_cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Filter cache capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.search.page_size, 50);
        assert_eq!(config.search.max_scan_pages, 200);
        assert_eq!(config.search.filter_cache_capacity, 10_000);
        assert_eq!(config.search.default_limit, 20);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_page_size() {
        let mut config = AppConfig::default();
        config.search.page_size = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_cache_capacity() {
        let mut config = AppConfig::default();
        config.search.filter_cache_capacity = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = \"/srv/sets\"\n\n[search]\npage_size = 10").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/sets"));
        assert_eq!(config.search.page_size, 10);
        assert_eq!(config.search.max_scan_pages, 200);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.search.default_limit, parsed.search.default_limit);
    }
}
