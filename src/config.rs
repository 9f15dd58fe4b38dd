//! Configuration loading
//!
//! Settings come from a TOML file (`--config`, else `config.toml` in the
//! platform config directory). Every field has a default, so a missing file or
//! a partial one is fine. The API key can also come from `WELLFEED_API_KEY`.

use chrono::Duration;
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::youtube::YOUTUBE_BASE_URL;

/// Environment variable overriding `api_key`
pub const API_KEY_ENV: &str = "WELLFEED_API_KEY";

/// Upper bound for any configured duration (100 years)
const MAX_HOURS: u64 = 24 * 365 * 100;
const MAX_SECS: u64 = MAX_HOURS * 3600;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A duration setting is larger than the supported maximum
    #[error("Config value {field} = {value} is out of range (maximum {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// A pre-vetted channel queried before general search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrustedSource {
    /// Provider channel id
    pub id: String,
    /// Display name
    pub label: String,
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the content provider API
    pub api_base_url: String,
    /// Provider API key
    pub api_key: Option<String>,
    /// How long a cached page stays valid
    pub cache_ttl_hours: u64,
    /// How long live fetches stay suspended after quota exhaustion
    pub quota_block_hours: u64,
    /// Minimum gap between manual refreshes
    pub refresh_cooldown_secs: u64,
    /// Page size when the caller does not pass one
    pub page_size: usize,
    /// Cap on items returned from cached history
    pub fallback_page_size: usize,
    /// Bulk fetches stop once this many pages' worth of items are gathered
    pub early_termination_multiplier: f64,
    /// Spend an extra `videos` call per search on view counts (popularity)
    pub fetch_view_counts: bool,
    /// Sources in priority order
    pub trusted_sources: Vec<TrustedSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: YOUTUBE_BASE_URL.to_string(),
            api_key: None,
            cache_ttl_hours: 12,
            quota_block_hours: 24,
            refresh_cooldown_secs: 300,
            page_size: 24,
            fallback_page_size: 24,
            early_termination_multiplier: 3.0,
            fetch_view_counts: true,
            trusted_sources: Vec::new(),
        }
    }
}

impl Config {
    /// Loads config from `path`, or from the default location when `None`
    ///
    /// A missing file yields the defaults. `WELLFEED_API_KEY` wins over the file.
    /// Durations beyond 100 years are rejected.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = Some(key);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks that every duration setting is within range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("cache_ttl_hours", self.cache_ttl_hours, MAX_HOURS),
            ("quota_block_hours", self.quota_block_hours, MAX_HOURS),
            ("refresh_cooldown_secs", self.refresh_cooldown_secs, MAX_SECS),
        ];
        for (field, value, max) in limits {
            if value > max {
                return Err(ConfigError::OutOfRange { field, value, max });
            }
        }
        Ok(())
    }

    /// `config.toml` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wellfeed").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses TOML text, filling gaps with defaults
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    // Accessors clamp to the same maximum `validate` enforces.

    pub fn cache_ttl(&self) -> Duration {
        Duration::hours(self.cache_ttl_hours.min(MAX_HOURS) as i64)
    }

    pub fn quota_block(&self) -> Duration {
        Duration::hours(self.quota_block_hours.min(MAX_HOURS) as i64)
    }

    pub fn refresh_cooldown(&self) -> Duration {
        Duration::seconds(self.refresh_cooldown_secs.min(MAX_SECS) as i64)
    }

    /// Ids of the configured trusted sources, in priority order
    pub fn trusted_source_ids(&self) -> Vec<String> {
        self.trusted_sources.iter().map(|s| s.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 24);
        assert_eq!(config.quota_block(), Duration::hours(24));
        assert_eq!(config.refresh_cooldown(), Duration::minutes(5));
        assert!((config.early_termination_multiplier - 3.0).abs() < f64::EPSILON);
        assert!(config.trusted_sources.is_empty());
        assert!(config.fetch_view_counts);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            cache_ttl_hours = 2
            early_termination_multiplier = 1.5
            fetch_view_counts = false

            [[trusted_sources]]
            id = "UC_one"
            label = "One"
            "#,
        )
        .expect("Config should parse");

        assert_eq!(config.cache_ttl(), Duration::hours(2));
        assert!((config.early_termination_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.trusted_source_ids(), vec!["UC_one".to_string()]);
        assert!(!config.fetch_view_counts);
        assert_eq!(config.page_size, 24);
        assert_eq!(config.api_base_url, YOUTUBE_BASE_URL);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config::from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_huge_durations_are_rejected_on_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "quota_block_hours = 9000000000000000").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange { field: "quota_block_hours", .. }
        ));
        assert!(err.to_string().contains("quota_block_hours"));
    }

    #[test]
    fn test_duration_accessors_clamp_instead_of_panicking() {
        let config = Config {
            cache_ttl_hours: u64::MAX,
            quota_block_hours: 9_223_372_036_854_775_807,
            refresh_cooldown_secs: u64::MAX,
            ..Config::default()
        };

        assert!(config.validate().is_err());
        assert_eq!(config.cache_ttl(), Duration::hours(MAX_HOURS as i64));
        assert_eq!(config.quota_block(), Duration::hours(MAX_HOURS as i64));
        assert_eq!(config.refresh_cooldown(), Duration::seconds(MAX_SECS as i64));
    }

    #[test]
    fn test_maximum_durations_are_accepted() {
        let config = Config {
            cache_ttl_hours: MAX_HOURS,
            refresh_cooldown_secs: MAX_SECS,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "page_size = \"lots\"").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
