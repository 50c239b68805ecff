use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::{OfflinePaths, DEFAULT_OFFLINE_PATHS};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub offline: OfflineConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Client-side timeout for every network call
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

fn default_base_url() -> String {
  "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfflineConfig {
  /// Resource-path prefixes that are cached on read and queued on write
  #[serde(default = "default_offline_paths")]
  pub paths: Vec<String>,
}

impl Default for OfflineConfig {
  fn default() -> Self {
    Self {
      paths: default_offline_paths(),
    }
  }
}

fn default_offline_paths() -> Vec<String> {
  DEFAULT_OFFLINE_PATHS.iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Database file (default: $XDG_DATA_HOME/fitsync/offline.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs here instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fitsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fitsync/config.yaml
  ///
  /// Without any file the defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fitsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fitsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to null, which means "all defaults"
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn offline_paths(&self) -> OfflinePaths {
    OfflinePaths::new(self.offline.paths.iter().map(String::as_str))
  }

  /// Bearer token for the backend, from FITSYNC_API_TOKEN.
  pub fn api_token() -> Option<String> {
    std::env::var("FITSYNC_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, "http://localhost:5000");
    assert_eq!(config.api.timeout(), Duration::from_secs(30));
    assert_eq!(config.logging.level, "info");
    assert!(config.storage.path.is_none());
    assert_eq!(config.offline_paths(), OfflinePaths::default());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: https://fit.example.com
  timeout_secs: 5
offline:
  paths:
    - /api/workouts
    - /api/templates/
storage:
  path: /tmp/fitsync/offline.db
logging:
  level: debug
  file: /tmp/fitsync/fitsync.log
"#;
    let config = Config::parse(yaml).unwrap();

    assert_eq!(config.api.base_url, "https://fit.example.com");
    assert_eq!(config.api.timeout(), Duration::from_secs(5));
    assert_eq!(
      config.storage.path.as_deref(),
      Some(Path::new("/tmp/fitsync/offline.db"))
    );
    assert_eq!(config.logging.level, "debug");

    let paths = config.offline_paths();
    assert!(paths.is_enabled("/api/templates/3"));
    assert!(!paths.is_enabled("/api/meals"));
  }

  #[test]
  fn test_partial_section_keeps_field_defaults() {
    let config = Config::parse("api:\n  timeout_secs: 10\n").unwrap();
    assert_eq!(config.api.base_url, "http://localhost:5000");
    assert_eq!(config.api.timeout_secs, 10);
  }

  #[test]
  fn test_invalid_yaml() {
    assert!(Config::parse("api: 42").is_err());
  }

  #[test]
  fn test_missing_explicit_file() {
    let result = Config::load(Some(Path::new("/nonexistent/fitsync.yaml")));
    assert!(result.is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fitsync.yaml");
    std::fs::write(&path, "logging:\n  level: warn\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "warn");
  }
}
