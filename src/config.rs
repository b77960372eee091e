use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::QueryOptions;
use crate::retry::RetryPolicy;

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "NOTIQ_API_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub query: QueryConfig,
  #[serde(default)]
  pub mutation: MutationConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Prefix for every endpoint, e.g. "https://example.com/api"
  #[serde(default = "default_base_url")]
  pub base_url: String,
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

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
  /// Seconds before cached data is refetched on the next read
  #[serde(default = "default_stale_time_secs")]
  pub stale_time_secs: u64,
  #[serde(default = "default_query_retry")]
  pub retry: u32,
  /// Delay before the first retry; doubles for each further attempt
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time_secs(),
      retry: default_query_retry(),
      retry_delay_ms: default_retry_delay_ms(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MutationConfig {
  /// Retries for transient failures only
  #[serde(default = "default_mutation_retry")]
  pub retry: u32,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
}

impl Default for MutationConfig {
  fn default() -> Self {
    Self {
      retry: default_mutation_retry(),
      retry_delay_ms: default_retry_delay_ms(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// When false every read goes to the network
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { enabled: true }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for the TUI log file (defaults to the data dir)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_stale_time_secs() -> u64 {
  5 * 60
}

fn default_query_retry() -> u32 {
  2
}

fn default_mutation_retry() -> u32 {
  1
}

fn default_retry_delay_ms() -> u64 {
  1000
}

fn default_true() -> bool {
  true
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./notiq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/notiq/config.yaml
  ///
  /// With no file found, built-in defaults are used.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    config.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("notiq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("notiq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file deserializes to unit, not to an empty mapping.
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Replace the base URL with a non-empty override value.
  pub fn apply_base_url_override(&mut self, value: Option<String>) {
    if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
      self.api.base_url = url.trim().to_string();
    }
  }

  /// Check the base URL and normalize away any trailing slash.
  pub fn validate(&mut self) -> Result<()> {
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid API base URL '{}': {}", self.api.base_url, e))?;
    let trimmed = self.api.base_url.trim_end_matches('/').to_string();
    self.api.base_url = trimmed;
    Ok(())
  }

  pub fn query_options(&self) -> QueryOptions {
    // chrono durations are bounded by i64 milliseconds
    let stale_secs = self.query.stale_time_secs.min(i64::MAX as u64 / 1000) as i64;
    QueryOptions {
      stale_time: chrono::Duration::seconds(stale_secs),
      retry: RetryPolicy::new(
        self.query.retry,
        Duration::from_millis(self.query.retry_delay_ms),
      ),
    }
  }

  pub fn mutation_retry(&self) -> RetryPolicy {
    RetryPolicy::new(
      self.mutation.retry,
      Duration::from_millis(self.mutation.retry_delay_ms),
    )
  }

  /// Directory for log files.
  pub fn log_dir(&self) -> Option<PathBuf> {
    self.log.dir.clone().or_else(|| {
      dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
        .map(|d| d.join("notiq"))
    })
  }
}
