//! Upload configuration: defaults, TOML file, `GPHOTOS_*` environment overrides

use crate::api::{RetryPolicy, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound the service enforces on items per batch-create call
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: String, message: String },
}

impl ConfigError {
    fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Only read by the OAuth collaborator
    #[serde(default = "default_auth_host")]
    pub auth_host: String,
    /// Only read by the OAuth collaborator
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// How a folder name is compared with existing remote album titles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlbumMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

impl AlbumMatch {
    pub fn matches(&self, remote_title: &str, name: &str) -> bool {
        match self {
            AlbumMatch::Exact => remote_title == name,
            AlbumMatch::CaseInsensitive => remote_title.to_lowercase() == name.to_lowercase(),
        }
    }
}

impl std::str::FromStr for AlbumMatch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(AlbumMatch::Exact),
            "case-insensitive" | "case_insensitive" | "insensitive" => Ok(AlbumMatch::CaseInsensitive),
            other => Err(ConfigError::invalid("album_match", format!("unknown mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Attempts per request, first try included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_album_concurrency")]
    pub album_concurrency: usize,
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    #[serde(default)]
    pub album_match: AlbumMatch,
    /// Only consider albums this app created when looking for an existing one
    #[serde(default = "default_app_created_only")]
    pub app_created_only: bool,
    /// Upload files sitting directly in the root directory as loose items
    #[serde(default)]
    pub upload_root_files: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_host: default_auth_host(),
            auth_port: default_auth_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            batch_size: default_batch_size(),
            album_concurrency: default_album_concurrency(),
            upload_concurrency: default_upload_concurrency(),
            album_match: AlbumMatch::default(),
            app_created_only: default_app_created_only(),
            upload_root_files: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl UploadConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `GPHOTOS_*` variables from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply `GPHOTOS_*` variables from an arbitrary lookup
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GPHOTOS_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(host) = lookup("GPHOTOS_AUTH_HOST") {
            self.api.auth_host = host;
        }
        if let Some(port) = lookup("GPHOTOS_AUTH_PORT") {
            self.api.auth_port = parse_var("GPHOTOS_AUTH_PORT", &port)?;
        }
        if let Some(retries) = lookup("GPHOTOS_MAX_RETRIES") {
            self.upload.max_retries = parse_var("GPHOTOS_MAX_RETRIES", &retries)?;
        }
        if let Some(delay) = lookup("GPHOTOS_RETRY_DELAY") {
            self.upload.retry_delay_secs = parse_var("GPHOTOS_RETRY_DELAY", &delay)?;
        }
        if let Some(level) = lookup("GPHOTOS_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.api.base_url)?;

        if self.upload.max_retries == 0 {
            return Err(ConfigError::invalid("max_retries", "must be at least 1"));
        }
        if self.upload.batch_size == 0 || self.upload.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::invalid(
                "batch_size",
                format!("must be between 1 and {}", MAX_BATCH_SIZE),
            ));
        }
        if self.upload.album_concurrency == 0 {
            return Err(ConfigError::invalid("album_concurrency", "must be at least 1"));
        }
        if self.upload.upload_concurrency == 0 {
            return Err(ConfigError::invalid("upload_concurrency", "must be at least 1"));
        }
        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::invalid(
                "log level",
                format!("unknown level '{}'", self.logging.level),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.upload.max_retries,
            Duration::from_secs(self.upload.retry_delay_secs),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(name, format!("cannot parse '{}'", value)))
}

// Default value functions
fn default_base_url() -> String { DEFAULT_API_BASE_URL.to_string() }
fn default_auth_host() -> String { "localhost".to_string() }
fn default_auth_port() -> u16 { 8080 }
fn default_timeout_secs() -> u64 { 120 }

fn default_max_retries() -> u32 { 3 }
fn default_retry_delay_secs() -> u64 { 5 }
fn default_batch_size() -> usize { MAX_BATCH_SIZE }
fn default_album_concurrency() -> usize { 2 }
fn default_upload_concurrency() -> usize { 4 }
fn default_app_created_only() -> bool { true }

fn default_log_level() -> String { "info".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.api.base_url, "https://photoslibrary.googleapis.com/v1");
        assert_eq!(config.api.auth_port, 8080);
        assert_eq!(config.upload.max_retries, 3);
        assert_eq!(config.upload.retry_delay_secs, 5);
        assert_eq!(config.upload.batch_size, 50);
        assert_eq!(config.upload.album_match, AlbumMatch::Exact);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml() {
        let config = UploadConfig::from_toml(
            r#"
            [upload]
            max_retries = 5
            album_match = "case-insensitive"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.upload.max_retries, 5);
        assert_eq!(config.upload.retry_delay_secs, 5);
        assert_eq!(config.upload.album_match, AlbumMatch::CaseInsensitive);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("gphotos.toml");

        let mut config = UploadConfig::default();
        config.upload.upload_root_files = true;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(UploadConfig::load(&path).unwrap(), config);
        assert!(matches!(
            UploadConfig::load(temp_dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GPHOTOS_API_BASE_URL", "http://localhost:9000/v1"),
            ("GPHOTOS_AUTH_PORT", "9090"),
            ("GPHOTOS_MAX_RETRIES", "7"),
            ("GPHOTOS_RETRY_DELAY", "0"),
            ("GPHOTOS_LOG_LEVEL", "DEBUG"),
        ]
        .into_iter()
        .collect();

        let mut config = UploadConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:9000/v1");
        assert_eq!(config.api.auth_port, 9090);
        assert_eq!(config.upload.max_retries, 7);
        assert_eq!(config.upload.retry_delay_secs, 0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_parse_error() {
        let mut config = UploadConfig::default();
        let result = config.apply_vars(|name| {
            (name == "GPHOTOS_MAX_RETRIES").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validation() {
        let mut config = UploadConfig::default();
        config.upload.batch_size = 51;
        assert!(config.validate().is_err());

        let mut config = UploadConfig::default();
        config.upload.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = UploadConfig::default();
        config.api.base_url = "::not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let mut config = UploadConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_album_match() {
        assert!(AlbumMatch::Exact.matches("Events", "Events"));
        assert!(!AlbumMatch::Exact.matches("events", "Events"));
        assert!(AlbumMatch::CaseInsensitive.matches("events", "Events"));
        assert_eq!("case-insensitive".parse::<AlbumMatch>().unwrap(), AlbumMatch::CaseInsensitive);
        assert!("fuzzy".parse::<AlbumMatch>().is_err());
    }
}
