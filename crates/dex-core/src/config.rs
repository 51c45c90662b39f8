//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/dex/config.toml)
//! 3. Environment variables (DEX_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::DEFAULT_QUOTA;

/// Environment variable prefix
const ENV_PREFIX: &str = "DEX";

/// Default number of entries per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory for data storage (SQLite db)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Entries per page when browsing
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Size limit for each stored payload, in bytes
    #[serde(default = "default_storage_quota")]
    pub storage_quota: usize,

    /// Where exports are written (current directory when unset)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Log to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            storage_quota: DEFAULT_QUOTA,
            export_dir: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DEX_DATA_DIR, DEX_PAGE_SIZE, ...)
    /// 2. Config file (~/.config/dex/config.toml or DEX_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path` when given, otherwise from the default location
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Read only what the file at `path` says
    ///
    /// No environment overrides are applied and no directories are created,
    /// so the result can be edited and saved back without picking up
    /// session settings. A missing file reads as the defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Numeric values that don't parse are ignored.
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("PAGE_SIZE") {
            if let Ok(size) = val.trim().parse() {
                self.page_size = size;
            }
        }

        if let Some(val) = env_var("STORAGE_QUOTA") {
            if let Ok(quota) = val.trim().parse() {
                self.storage_quota = quota;
            }
        }

        // Empty string clears optional paths
        if let Some(val) = env_var("EXPORT_DIR") {
            self.export_dir = non_empty_path(val);
        }

        if let Some(val) = env_var("LOG_FILE") {
            self.log_file = non_empty_path(val);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.storage_quota == 0 {
            bail!("storage_quota must be at least 1 byte");
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set a field by its config-file name
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "page_size" => {
                self.page_size = value
                    .parse()
                    .with_context(|| format!("Invalid page_size: {}", value))?
            }
            "storage_quota" => {
                self.storage_quota = value
                    .parse()
                    .with_context(|| format!("Invalid storage_quota: {}", value))?
            }
            "export_dir" => self.export_dir = non_empty_path(value.to_string()),
            "log_file" => self.log_file = non_empty_path(value.to_string()),
            _ => bail!(
                "Unknown config key: {}. Valid keys: data_dir, page_size, storage_quota, export_dir, log_file",
                key
            ),
        }
        self.validate()
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DEX_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dex")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("dex.db")
    }

    /// Directory exports are written to
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn non_empty_path(val: String) -> Option<PathBuf> {
    if val.is_empty() {
        None
    } else {
        Some(PathBuf::from(val))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dex")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_storage_quota() -> usize {
    DEFAULT_QUOTA
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "DEX_DATA_DIR",
        "DEX_PAGE_SIZE",
        "DEX_STORAGE_QUOTA",
        "DEX_EXPORT_DIR",
        "DEX_LOG_FILE",
        "DEX_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.storage_quota, 5 * 1024 * 1024);
        assert!(config.export_dir.is_none());
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("dex"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.sqlite_path().ends_with("dex.db"));
        assert_eq!(config.export_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("DEX_DATA_DIR", "/tmp/dex-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/dex-test"));
    }

    #[test]
    fn test_load_file_ignores_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/srv/dex\"\npage_size = 30\n").unwrap();

        env::set_var("DEX_DATA_DIR", temp_dir.path().join("session"));
        env::set_var("DEX_PAGE_SIZE", "99");

        let mut config = Config::load_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/dex"));
        assert_eq!(config.page_size, 30);

        config.set_value("export_dir", "/srv/exports").unwrap();
        config.save_to_path(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("/srv/dex"));
        assert!(saved.contains("page_size = 30"));
        assert!(!saved.contains("session"));
        assert!(!saved.contains("99"));

        // The effective config still honours the environment
        let effective = Config::load_from_path(&path);
        assert_eq!(effective.unwrap().page_size, 99);
    }

    #[test]
    fn test_load_file_missing_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_override_numbers() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("DEX_PAGE_SIZE", "50");
        env::set_var("DEX_STORAGE_QUOTA", "1024");
        config.apply_env_overrides();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.storage_quota, 1024);

        // Unparseable values are ignored
        env::set_var("DEX_PAGE_SIZE", "lots");
        config.apply_env_overrides();
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_env_override_optional_paths() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("DEX_EXPORT_DIR", "/tmp/exports");
        env::set_var("DEX_LOG_FILE", "/tmp/dex.log");
        config.apply_env_overrides();
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/dex.log")));

        // Empty string clears it
        env::set_var("DEX_EXPORT_DIR", "");
        config.apply_env_overrides();
        assert!(config.export_dir.is_none());
    }

    #[test]
    fn test_config_file_path_override() {
        let _guard = EnvGuard::new(ENV_VARS);

        assert!(Config::config_file_path().ends_with("dex/config.toml"));

        env::set_var("DEX_CONFIG", "/etc/dex.toml");
        assert_eq!(Config::config_file_path(), PathBuf::from("/etc/dex.toml"));
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/dex"),
            page_size: 10,
            storage_quota: 4096,
            export_dir: Some(PathBuf::from("/exports")),
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("page_size"));
        assert!(toml_str.contains("export_dir"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            page_size = 5
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.page_size, 5);
        assert_eq!(config.storage_quota, DEFAULT_QUOTA);
    }

    #[test]
    fn test_load_rejects_zero_page_size() {
        let _guard = EnvGuard::new(ENV_VARS);
        assert!(Config::load_from_str("page_size = 0").is_err());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("DEX_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();

        // Should return defaults when file doesn't exist
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let mut config = Config::default();
        config.data_dir = temp_dir.path().join("data");
        config.set_value("page_size", "7").unwrap();
        config.set_value("export_dir", "/tmp/out").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_set_value_errors() {
        let mut config = Config::default();
        assert!(config.set_value("page_size", "abc").is_err());
        assert!(config.set_value("page_size", "0").is_err());
        assert!(config.set_value("sync_url", "x").is_err());

        config.set_value("log_file", "").unwrap();
        assert!(config.log_file.is_none());
    }
}
