//! Configuration loading and validation.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::parse_duration;

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

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "*".to_string()
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

/// Which matches count towards stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Only matches starting strictly after this instant are eligible
    #[serde(default = "default_cutoff")]
    pub cutoff: DateTime<Utc>,

    /// The single competitive mode that is eligible
    #[serde(default = "default_eligible_mode")]
    pub eligible_mode: i32,
}

fn default_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 27, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn default_eligible_mode() -> i32 {
    1
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            eligible_mode: default_eligible_mode(),
        }
    }
}

/// Cache store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Mongodb,
    Jsonl,
    Memory,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Mongodb => write!(f, "mongodb"),
            CacheBackend::Jsonl => write!(f, "jsonl"),
            CacheBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: CacheBackend,

    /// MongoDB connection string; `MONGO_URL` takes precedence
    #[serde(default = "default_mongo_url")]
    pub mongo_url: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Root directory of the JSONL backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Lifetime of a cached record (e.g. "10m")
    #[serde(default = "default_ttl")]
    pub ttl: String,

    /// Deadline shared by all upserts of one batch (e.g. "30s")
    #[serde(default = "default_write_deadline")]
    pub write_deadline: String,

    /// Store connect + ping timeout at startup
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,

    /// Write the cache after responding instead of before
    #[serde(default)]
    pub background: bool,
}

fn default_backend() -> CacheBackend {
    CacheBackend::Mongodb
}

fn default_mongo_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "gnl_league".to_string()
}

fn default_collection() -> String {
    "playerstats_cache".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_ttl() -> String {
    "10m".to_string()
}

fn default_write_deadline() -> String {
    "30s".to_string()
}

fn default_connect_timeout() -> String {
    "10s".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            mongo_url: default_mongo_url(),
            database: default_database(),
            collection: default_collection(),
            data_dir: default_data_dir(),
            ttl: default_ttl(),
            write_deadline: default_write_deadline(),
            connect_timeout: default_connect_timeout(),
            background: false,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Result<Duration, ConfigError> {
        positive_duration("cache.ttl", &self.ttl)
    }

    pub fn write_deadline(&self) -> Result<Duration, ConfigError> {
        positive_duration("cache.write_deadline", &self.write_deadline)
    }

    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        positive_duration("cache.connect_timeout", &self.connect_timeout)
    }
}

fn positive_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    match parse_duration(value) {
        Some(d) if !d.is_zero() => Ok(d),
        Some(_) => Err(ConfigError::ValidationError(format!(
            "{} must be greater than 0",
            field
        ))),
        None => Err(ConfigError::ValidationError(format!(
            "{} is not a valid duration: {:?}",
            field, value
        ))),
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults; then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };

        if let Ok(url) = std::env::var("MONGO_URL") {
            if !url.is_empty() {
                config.cache.mongo_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        self.cache.ttl()?;
        self.cache.write_deadline()?;
        self.cache.connect_timeout()?;

        if self.cache.backend == CacheBackend::Mongodb && self.cache.mongo_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "cache.mongo_url is required for the mongodb backend".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.stats.eligible_mode, 1);
        assert_eq!(
            config.stats.cutoff,
            Utc.with_ymd_and_hms(2025, 11, 27, 0, 0, 0).unwrap()
        );
        assert_eq!(config.cache.backend, CacheBackend::Mongodb);
        assert_eq!(config.cache.database, "gnl_league");
        assert_eq!(config.cache.collection, "playerstats_cache");
        assert!(!config.cache.background);
    }

    #[test]
    fn test_cache_durations() {
        let cache = CacheConfig::default();

        assert_eq!(cache.ttl().unwrap(), Duration::from_secs(600));
        assert_eq!(cache.write_deadline().unwrap(), Duration::from_secs(30));
        assert_eq!(cache.connect_timeout().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_ttl() {
        let mut config = AppConfig::default();
        config.cache.ttl = "soon".to_string();
        assert!(config.validate().is_err());

        config.cache.ttl = "0s".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [stats]
            cutoff = "2026-01-01T00:00:00Z"

            [cache]
            backend = "memory"
            ttl = "1h"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(
            config.stats.cutoff,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(config.stats.eligible_mode, 1);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl().unwrap(), Duration::from_secs(3600));
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = toml::from_str::<AppConfig>("[cache]\nbackend = \"redis\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 8081\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8081);
    }

    /// Serialises tests that read or write process environment variables.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_applies_mongo_url_override() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::env::var("MONGO_URL").ok();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nmongo_url = \"mongodb://from-file:27017\"\n").unwrap();

        std::env::set_var("MONGO_URL", "mongodb://db.internal:27017");
        let overridden = AppConfig::load(&path);
        let defaulted = AppConfig::load(&dir.path().join("missing.toml"));

        // an empty value leaves the file's url in place
        std::env::set_var("MONGO_URL", "");
        let unset = AppConfig::load(&path);

        match previous {
            Some(url) => std::env::set_var("MONGO_URL", url),
            None => std::env::remove_var("MONGO_URL"),
        }

        assert_eq!(overridden.unwrap().cache.mongo_url, "mongodb://db.internal:27017");
        assert_eq!(defaulted.unwrap().cache.mongo_url, "mongodb://db.internal:27017");
        assert_eq!(unset.unwrap().cache.mongo_url, "mongodb://from-file:27017");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.stats, parsed.stats);
        assert_eq!(config.cache.ttl, parsed.cache.ttl);
    }
}
