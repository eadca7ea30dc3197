//! Application configuration.
//!
//! Configuration is stored in `.gridcache/config.yaml` and includes:
//! - Grid paging and filter debounce settings
//! - Result set store limits

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::GridSettings;
use crate::error::{GridError, Result};
use crate::fetch::DEFAULT_PAGE_SIZE;
use crate::store::MAX_DISTINCT_COLUMN_VALUES;

pub const CONFIG_DIR: &str = ".gridcache";

/// Keys accepted by `config get` and `config set`.
pub const CONFIG_KEYS: &[&str] = &[
    "grid.page_size",
    "grid.filter_debounce_ms",
    "store.max_distinct_values",
];

/// Longest accepted filter debounce, in milliseconds.
const MAX_FILTER_DEBOUNCE_MS: u64 = 60_000;

/// Returns the configuration root, honouring `GRIDCACHE_ROOT`.
pub fn gridcache_root() -> PathBuf {
    match env::var("GRIDCACHE_ROOT") {
        Ok(root) if !root.is_empty() => PathBuf::from(root),
        _ => PathBuf::from(CONFIG_DIR),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Rows per page (default: 50)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause in typing before a filter refresh, in milliseconds (default: 500)
    #[serde(default = "default_filter_debounce_ms")]
    pub filter_debounce_ms: u64,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_filter_debounce_ms() -> u64 {
    500
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            filter_debounce_ms: default_filter_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Columns with more distinct values get no dropdown (default: 50)
    #[serde(default = "default_max_distinct_values")]
    pub max_distinct_values: usize,
}

fn default_max_distinct_values() -> usize {
    MAX_DISTINCT_COLUMN_VALUES
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_distinct_values: default_max_distinct_values(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        gridcache_root().join("config.yaml")
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            GridError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GridError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content).map_err(|e| {
            GridError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.page_size == 0 {
            return Err(GridError::Config(
                "grid.page_size must be greater than zero".to_string(),
            ));
        }
        if self.grid.filter_debounce_ms > MAX_FILTER_DEBOUNCE_MS {
            return Err(GridError::Config(format!(
                "grid.filter_debounce_ms must be at most {MAX_FILTER_DEBOUNCE_MS}"
            )));
        }
        if self.store.max_distinct_values == 0 {
            return Err(GridError::Config(
                "store.max_distinct_values must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "grid.page_size" => Ok(self.grid.page_size.to_string()),
            "grid.filter_debounce_ms" => Ok(self.grid.filter_debounce_ms.to_string()),
            "store.max_distinct_values" => Ok(self.store.max_distinct_values.to_string()),
            _ => Err(unknown_key(key)),
        }
    }

    /// Set a value by key. The config is left unchanged if the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "grid.page_size" => updated.grid.page_size = parse_number(key, value)?,
            "grid.filter_debounce_ms" => {
                updated.grid.filter_debounce_ms = parse_number(key, value)?
            }
            "store.max_distinct_values" => {
                updated.store.max_distinct_values = parse_number(key, value)?
            }
            _ => return Err(unknown_key(key)),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Page size, overridden by `GRIDCACHE_PAGE_SIZE` when it holds a positive number.
    pub fn page_size(&self) -> usize {
        if let Ok(value) = env::var("GRIDCACHE_PAGE_SIZE")
            && !value.is_empty()
        {
            match value.parse::<usize>() {
                Ok(size) if size > 0 => return size,
                _ => tracing::warn!(
                    "ignoring invalid GRIDCACHE_PAGE_SIZE '{}', using {}",
                    value,
                    self.grid.page_size
                ),
            }
        }
        self.grid.page_size
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.grid.filter_debounce_ms)
    }

    pub fn grid_settings(&self) -> GridSettings {
        GridSettings {
            page_size: self.page_size(),
            filter_debounce: self.filter_debounce(),
        }
    }
}

fn unknown_key(key: &str) -> GridError {
    GridError::Config(format!(
        "unknown config key '{}', expected one of: {}",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GridError::Config(format!("{key} expects a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_guards::EnvGuard;
    use serial_test::serial;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.grid.page_size, 50);
        assert_eq!(config.grid.filter_debounce_ms, 500);
        assert_eq!(config.store.max_distinct_values, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_yaml_uses_defaults() {
        let yaml = r#"
grid:
  page_size: 25
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.grid.page_size, 25);
        assert_eq!(config.grid.filter_debounce_ms, 500);
        assert_eq!(config.store.max_distinct_values, 50);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = Config::default();
        config.set("grid.filter_debounce_ms", "250").unwrap();
        config.set("store.max_distinct_values", "10").unwrap();

        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        let parsed: Config = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_get_and_set() {
        let mut config = Config::default();
        config.set("grid.page_size", "100").unwrap();
        assert_eq!(config.get("grid.page_size").unwrap(), "100");
        assert!(config.get("grid.unknown").is_err());
        assert!(config.set("grid.unknown", "1").is_err());
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("grid.page_size", "0").is_err());
        assert!(config.set("grid.page_size", "many").is_err());
        assert!(config.set("grid.filter_debounce_ms", "600000").is_err());
        assert!(config.set("store.max_distinct_values", "-1").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_save_and_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let _root = unsafe { EnvGuard::set("GRIDCACHE_ROOT", tmp.path()) };

        assert_eq!(Config::load().unwrap(), Config::default());

        let mut config = Config::default();
        config.set("grid.page_size", "20").unwrap();
        config.save().unwrap();

        assert!(tmp.path().join("config.yaml").exists());
        assert_eq!(Config::load().unwrap().grid.page_size, 20);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let _root = unsafe { EnvGuard::set("GRIDCACHE_ROOT", tmp.path()) };
        fs::write(tmp.path().join("config.yaml"), "grid:\n  page_size: 0\n").unwrap();

        let err = Config::load().unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }

    #[test]
    #[serial]
    fn test_page_size_env_override() {
        let config = Config::default();

        let _size = unsafe { EnvGuard::set("GRIDCACHE_PAGE_SIZE", "7") };
        assert_eq!(config.page_size(), 7);
        assert_eq!(config.grid_settings().page_size, 7);

        let _size = unsafe { EnvGuard::set("GRIDCACHE_PAGE_SIZE", "zero") };
        assert_eq!(config.page_size(), 50);
    }

    #[test]
    #[serial]
    fn test_root_default() {
        let _root = unsafe { EnvGuard::remove("GRIDCACHE_ROOT") };
        assert_eq!(gridcache_root(), PathBuf::from(".gridcache"));
        assert_eq!(
            Config::config_path(),
            PathBuf::from(".gridcache/config.yaml")
        );
    }
}
