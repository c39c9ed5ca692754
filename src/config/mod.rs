//! Configuration management for feedstash
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Content platform API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry configuration for API calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Credential pool configuration
    #[serde(default)]
    pub pool: PoolConfig,

    /// Sync pipeline configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Note materialization configuration
    #[serde(default)]
    pub notes: NotesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // First, expand environment variables in the YAML string
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix FEEDSTASH_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(path) = std::env::var("FEEDSTASH_DATABASE_PATH") {
            config.database.path = path;
        }
        if let Ok(url) = std::env::var("FEEDSTASH_API_BASE_URL") {
            config.api.base_url = url;
        }
        if let Ok(dir) = std::env::var("FEEDSTASH_NOTES_DIR") {
            config.notes.dir = dir;
        }
        if let Ok(minutes) = std::env::var("FEEDSTASH_SYNC_INTERVAL_MINUTES") {
            config.sync.interval_minutes = minutes
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid sync interval".to_string()))?;
        }
        if let Ok(level) = std::env::var("FEEDSTASH_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Check the values that have no safe fallback
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::MissingRequired("api.base_url".to_string()));
        }
        if self.api.page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "api.page_size must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.sync.interval_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "sync.interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.sync.retention_days == 0 {
            return Err(ConfigError::InvalidValue(
                "sync.retention_days must be at least 1".to_string(),
            ));
        }
        if self.scheduler.tick_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "scheduler.tick_secs must be at least 1".to_string(),
            ));
        }
        if self.pool.blacklist_cooldown_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "pool.blacklist_cooldown_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "data/feedstash.db".to_string()
}

/// Content platform API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the platform API
    #[serde(default)]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Articles requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Pause between page fetches in seconds, to stay under the
    /// platform's rate limit
    #[serde(default = "default_page_delay")]
    pub page_delay_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_api_timeout(),
            page_size: default_page_size(),
            page_delay_secs: default_page_delay(),
        }
    }
}

fn default_api_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    20
}

fn default_page_delay() -> u64 {
    2
}

/// Retry configuration for external API calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Whether to add jitter to backoff
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5000 // 10x base
}

/// Credential pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// Cool-down after the platform throttles a credential, in hours
    #[serde(default = "default_blacklist_cooldown")]
    pub blacklist_cooldown_hours: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            blacklist_cooldown_hours: default_blacklist_cooldown(),
        }
    }
}

fn default_blacklist_cooldown() -> u32 {
    24
}

/// Sync pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Scheduled run interval in minutes
    #[serde(default = "default_sync_interval")]
    pub interval_minutes: u32,

    /// Feeds not refreshed within this many hours are due
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_hours: u32,

    /// Only articles published within this many days are persisted
    #[serde(default = "default_freshness_window")]
    pub freshness_window_days: u32,

    /// Articles older than this many days are deleted by cleanup
    #[serde(default = "default_retention")]
    pub retention_days: u32,

    /// Upper bound on articles fetched per feed per run
    #[serde(default = "default_max_articles")]
    pub max_articles_per_feed: u32,

    /// Whether the materialize phase runs
    #[serde(default = "default_materialize")]
    pub materialize: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_sync_interval(),
            stale_threshold_hours: default_stale_threshold(),
            freshness_window_days: default_freshness_window(),
            retention_days: default_retention(),
            max_articles_per_feed: default_max_articles(),
            materialize: default_materialize(),
        }
    }
}

fn default_sync_interval() -> u32 {
    60
}

fn default_stale_threshold() -> u32 {
    1
}

fn default_freshness_window() -> u32 {
    5
}

fn default_retention() -> u32 {
    30
}

fn default_max_articles() -> u32 {
    60
}

fn default_materialize() -> bool {
    true
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Tick granularity in seconds
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

fn default_tick_secs() -> u64 {
    60
}

/// Note materialization configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotesConfig {
    /// Directory the notes are written into
    #[serde(default = "default_notes_dir")]
    pub dir: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            dir: default_notes_dir(),
        }
    }
}

fn default_notes_dir() -> String {
    "notes".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format ("text" or "json")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
