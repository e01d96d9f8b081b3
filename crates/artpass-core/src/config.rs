//! Configuration management for Artpass.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location;
//! environment variables override individual values after the file is read.

use crate::error::{ArtpassError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Event ids featured by the `hot` listing unless configured otherwise
pub const DEFAULT_HOT_EVENT_IDS: [&str; 6] = [
    "d891f670-6735-4473-8f5d-8cc897a6e81d",
    "d88f6441-5402-41dd-8fae-8cf0ebe082e7",
    "c1031340-af36-436c-8e38-32256170aca1",
    "e382529e-3dcd-4a0e-b579-5073a5cb7b0f",
    "f0c98953-ffda-4991-ba2d-b45af7837f89",
    "e7fbb4b8-d3d2-46b7-a331-c6c8c5550ceb",
];

/// Main configuration structure for Artpass.
///
/// ## Example Configuration File (artpass.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
///
/// [data]
/// events_path = "/srv/artpass/events.json"
/// userdata_path = "/srv/artpass/userdata.json"
///
/// [api]
/// base_url = "https://events.example.org"
/// max_limit = 500
/// hot_event_ids = ["d891f670-6735-4473-8f5d-8cc897a6e81d"]
///
/// [performance]
/// parallel_threshold = 10000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Locations of the data files
    pub data: DataConfig,

    /// Result sizes and presentation
    pub api: ApiConfig,

    /// Performance tuning
    pub performance: PerformanceConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Data file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Events source document
    pub events_path: PathBuf,

    /// User annotation document
    pub userdata_path: PathBuf,

    /// Directory holding cached event images
    pub images_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        let output = PathBuf::from("output");
        DataConfig {
            events_path: output.join("events.json"),
            userdata_path: output.join("userdata.json"),
            images_dir: output.join("images"),
        }
    }
}

/// Result size limits and presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL prefixed to image links
    pub base_url: String,

    /// Ceiling applied to every requested amount or limit
    pub max_limit: usize,

    /// Amount for random sampling when none is requested
    pub default_random_amount: usize,

    /// Amount for recent events when none is requested
    pub default_recent_amount: usize,

    /// Page size for filtering (0 = unlimited)
    pub default_filter_limit: usize,

    /// Whether random sampling returns one event per venue by default
    pub distinct_venue: bool,

    /// Curated featured events, in display order
    pub hot_event_ids: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000".to_string(),
            max_limit: 500,
            default_random_amount: 5,
            default_recent_amount: 5,
            default_filter_limit: 0,
            distinct_venue: true,
            hot_event_ids: DEFAULT_HOT_EVENT_IDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ApiConfig {
    /// Resolve a requested amount: `default` when absent, rejected when not
    /// positive, capped at `max_limit` otherwise.
    pub fn clamp_amount(&self, requested: Option<i64>, default: usize) -> Result<usize> {
        match requested {
            None => Ok(default),
            Some(amount) if amount <= 0 => Err(ArtpassError::invalid_argument(
                "amount must be > 0",
            )),
            Some(amount) => Ok(usize::try_from(amount)
                .unwrap_or(usize::MAX)
                .min(self.max_limit)),
        }
    }

    /// Resolve a requested page size: `None` (unlimited) when absent or 0,
    /// rejected when negative, capped at `max_limit` otherwise.
    pub fn effective_limit(&self, requested: Option<i64>) -> Result<Option<usize>> {
        let requested = requested.or(match self.default_filter_limit {
            0 => None,
            limit => Some(i64::try_from(limit).unwrap_or(i64::MAX)),
        });
        match requested {
            None | Some(0) => Ok(None),
            Some(limit) if limit < 0 => Err(ArtpassError::invalid_argument(
                "limit must be >= 1",
            )),
            Some(limit) => Ok(Some(
                usize::try_from(limit)
                    .unwrap_or(usize::MAX)
                    .min(self.max_limit),
            )),
        }
    }
}

/// Performance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Candidate count above which window filtering runs in parallel
    pub parallel_threshold: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            parallel_threshold: crate::store::DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| ArtpassError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| ArtpassError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "artpass").ok_or_else(|| ArtpassError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("artpass.toml"))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Integer variables that fail to parse leave the current value in place.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("EVENTS_JSON_PATH") {
            self.data.events_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("USERDATA_JSON_PATH") {
            self.data.userdata_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("IMAGES_DIR_PATH") {
            self.data.images_dir = PathBuf::from(path);
        }
        if let Some(url) = lookup("API_BASE_URL") {
            self.api.base_url = url;
        }

        let integers: [(&str, &mut usize); 4] = [
            ("MAX_LIMIT", &mut self.api.max_limit),
            ("DEFAULT_RANDOM_AMOUNT", &mut self.api.default_random_amount),
            ("DEFAULT_RECENT_AMOUNT", &mut self.api.default_recent_amount),
            ("DEFAULT_FILTER_LIMIT", &mut self.api.default_filter_limit),
        ];
        for (name, slot) in integers {
            if let Some(raw) = lookup(name) {
                match raw.trim().parse() {
                    Ok(value) => *slot = value,
                    Err(_) => warn!(variable = name, value = %raw, "Ignoring non-integer override"),
                }
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.max_limit, 500);
        assert_eq!(config.api.default_random_amount, 5);
        assert_eq!(config.api.hot_event_ids.len(), 6);
        assert_eq!(config.data.events_path, PathBuf::from("output").join("events.json"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.api.max_limit = 50;
        config.api.hot_event_ids = vec!["e1".to_string()];

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.api.max_limit, 50);
        assert_eq!(loaded.api.hot_event_ids, vec!["e1".to_string()]);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api.max_limit, 500); // Default value
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[api]\nmax_limit = 20\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api.max_limit, 20);
        assert_eq!(config.api.default_recent_amount, 5);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[api\nmax_limit = ").unwrap();

        let result = Config::load_from(&config_path);
        assert!(matches!(result, Err(ArtpassError::ConfigError { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("EVENTS_JSON_PATH", "/srv/events.json"),
            ("API_BASE_URL", "https://events.example.org"),
            ("MAX_LIMIT", "42"),
            ("DEFAULT_RECENT_AMOUNT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.data.events_path, PathBuf::from("/srv/events.json"));
        assert_eq!(config.api.base_url, "https://events.example.org");
        assert_eq!(config.api.max_limit, 42);
        assert_eq!(config.api.default_recent_amount, 5);
    }

    #[test]
    fn test_clamp_amount() {
        let api = ApiConfig {
            max_limit: 10,
            ..ApiConfig::default()
        };
        assert_eq!(api.clamp_amount(None, 5).unwrap(), 5);
        assert_eq!(api.clamp_amount(Some(3), 5).unwrap(), 3);
        assert_eq!(api.clamp_amount(Some(1_000), 5).unwrap(), 10);
        assert!(api.clamp_amount(Some(0), 5).unwrap_err().is_invalid_argument());
        assert!(api.clamp_amount(Some(-2), 5).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_effective_limit() {
        let mut api = ApiConfig {
            max_limit: 10,
            ..ApiConfig::default()
        };
        assert_eq!(api.effective_limit(None).unwrap(), None);
        assert_eq!(api.effective_limit(Some(0)).unwrap(), None);
        assert_eq!(api.effective_limit(Some(4)).unwrap(), Some(4));
        assert_eq!(api.effective_limit(Some(99)).unwrap(), Some(10));
        assert!(api.effective_limit(Some(-1)).unwrap_err().is_invalid_argument());

        api.default_filter_limit = 3;
        assert_eq!(api.effective_limit(None).unwrap(), Some(3));
        assert_eq!(api.effective_limit(Some(0)).unwrap(), None);
    }
}
