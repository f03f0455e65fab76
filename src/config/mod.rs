//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden by
//! `COURSEGATE_*` environment variables. Missing values fall back to defaults,
//! so an absent or empty file yields a working SQLite setup.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Where pictures and exercise files are served from
    #[serde(default)]
    pub media: MediaConfig,
    /// Grading and access rules
    #[serde(default)]
    pub progression: ProgressionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/coursegate.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    #[serde(default = "default_capacity")]
    pub capacity: u64,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_capacity() -> u64 {
    1_000
}

fn default_ttl() -> u64 {
    600
}

/// Media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Public origin that media paths are resolved against
    #[serde(default = "default_media_base_url")]
    pub base_url: String,
    /// URL prefix of the media directory
    #[serde(default = "default_media_prefix")]
    pub prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: default_media_base_url(),
            prefix: default_media_prefix(),
        }
    }
}

fn default_media_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_media_prefix() -> String {
    "/media/".to_string()
}

/// Progression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Minimal score (percent) that counts a test as passed
    #[serde(default = "default_pass_percent")]
    pub test_pass_percent: u8,
    /// Length of the access window granted by a tariff payment, in days
    #[serde(default = "default_access_days")]
    pub access_days: i64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            test_pass_percent: default_pass_percent(),
            access_days: default_access_days(),
        }
    }
}

fn default_pass_percent() -> u8 {
    80
}

fn default_access_days() -> i64 {
    30
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or blank file yields the defaults. Invalid YAML is reported
    /// with its line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides.
    ///
    /// Recognised variables:
    /// - COURSEGATE_SERVER_HOST, COURSEGATE_SERVER_PORT, COURSEGATE_SERVER_CORS_ORIGIN
    /// - COURSEGATE_DATABASE_DRIVER, COURSEGATE_DATABASE_URL
    /// - COURSEGATE_CACHE_TTL_SECONDS
    /// - COURSEGATE_MEDIA_BASE_URL
    /// - COURSEGATE_TEST_PASS_PERCENT, COURSEGATE_ACCESS_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("COURSEGATE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("COURSEGATE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("COURSEGATE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("COURSEGATE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("COURSEGATE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("COURSEGATE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(base_url) = std::env::var("COURSEGATE_MEDIA_BASE_URL") {
            self.media.base_url = base_url;
        }

        if let Ok(percent) = std::env::var("COURSEGATE_TEST_PASS_PERCENT") {
            if let Ok(percent) = percent.parse::<u8>() {
                self.progression.test_pass_percent = percent;
            }
        }
        if let Ok(days) = std::env::var("COURSEGATE_ACCESS_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.progression.access_days = days;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.progression.test_pass_percent > 100 {
            return Err(ConfigError::ValidationError(format!(
                "progression.test_pass_percent must be within 0..=100, got {}",
                self.progression.test_pass_percent
            )));
        }
        if self.progression.access_days <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "progression.access_days must be positive, got {}",
                self.progression.access_days
            )));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

/// Serializes tests that touch process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
