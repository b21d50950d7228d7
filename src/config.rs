//! Configuration management for the weather archive service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::ArchiveError;
use crate::forms::DateRules;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the weather archive service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Geocoding and archive API configuration
    pub archive: ArchiveApiConfig,
    /// Response cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Form validation limits
    pub forms: FormsConfig,
    /// Statistics and anomaly detection settings
    pub analysis: AnalysisConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// PEM certificate; TLS is served when both paths are set
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,
    /// PEM private key
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
    /// Upper bound for handling a single request, upstream calls included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
}

/// Open-Meteo geocoding and archive API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveApiConfig {
    /// Geocoding search endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Historical archive endpoint
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    /// Geocoding request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub geocoding_timeout_seconds: u32,
    /// Archive request timeout in seconds
    #[serde(default = "default_archive_timeout")]
    pub archive_timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff interval in seconds, doubled on each retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// User agent sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of cached upstream responses in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached responses
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits applied by the date-range form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsConfig {
    /// Earliest start date accepted
    #[serde(default = "default_historical_floor")]
    pub historical_floor: NaiveDate,
    /// Maximum location label length in characters
    #[serde(default = "default_max_label_length")]
    pub max_label_length: usize,
}

/// Anomaly detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Absolute z-score above which a value is flagged
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_request_timeout() -> u32 {
    60
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1/archive".to_string()
}

fn default_geocoding_timeout() -> u32 {
    15
}

fn default_archive_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    0.5
}

fn default_user_agent() -> String {
    format!("weather-archive/{}", crate::VERSION)
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_cache_max_entries() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_historical_floor() -> NaiveDate {
    DateRules::default().historical_floor
}

fn default_max_label_length() -> usize {
    DateRules::default().max_label_length
}

fn default_z_threshold() -> f64 {
    crate::analysis::DEFAULT_Z_THRESHOLD
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            tls_cert_path: None,
            tls_key_path: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ArchiveApiConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            archive_url: default_archive_url(),
            geocoding_timeout_seconds: default_geocoding_timeout(),
            archive_timeout_seconds: default_archive_timeout(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            historical_floor: default_historical_floor(),
            max_label_length: default_max_label_length(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            z_threshold: default_z_threshold(),
        }
    }
}

impl ArchiveApiConfig {
    #[must_use]
    pub fn geocoding_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoding_timeout_seconds.into())
    }

    #[must_use]
    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_seconds.into())
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl FormsConfig {
    #[must_use]
    pub fn date_rules(&self) -> DateRules {
        DateRules {
            historical_floor: self.historical_floor,
            max_label_length: self.max_label_length,
        }
    }
}

impl ArchiveConfig {
    /// Load configuration from `config_path` (or the default location) and
    /// environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. WEATHER_ARCHIVE_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("WEATHER_ARCHIVE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ArchiveConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weather-archive").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.archive.geocoding_url.is_empty() {
            self.archive.geocoding_url = default_geocoding_url();
        }
        if self.archive.archive_url.is_empty() {
            self.archive.archive_url = default_archive_url();
        }
        if self.archive.geocoding_timeout_seconds == 0 {
            self.archive.geocoding_timeout_seconds = default_geocoding_timeout();
        }
        if self.archive.archive_timeout_seconds == 0 {
            self.archive.archive_timeout_seconds = default_archive_timeout();
        }
        if self.archive.user_agent.is_empty() {
            self.archive.user_agent = default_user_agent();
        }
        if self.cache.max_entries == 0 {
            self.cache.max_entries = default_cache_max_entries();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.forms.max_label_length == 0 {
            self.forms.max_label_length = default_max_label_length();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_tls_paths()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.archive.geocoding_timeout_seconds > 300 || self.archive.archive_timeout_seconds > 300 {
            return Err(ArchiveError::config("Archive API timeout cannot exceed 300 seconds").into());
        }

        if self.archive.max_retries > 10 {
            return Err(ArchiveError::config("Archive API max retries cannot exceed 10").into());
        }

        if !(0.0..=10.0).contains(&self.archive.backoff_factor) {
            return Err(
                ArchiveError::config("Backoff factor must be between 0 and 10 seconds").into(),
            );
        }

        if self.cache.ttl_seconds > 86_400 {
            return Err(ArchiveError::config("Cache TTL cannot exceed 86400 seconds (1 day)").into());
        }

        if self.server.request_timeout_seconds > 600 {
            return Err(ArchiveError::config("Request timeout cannot exceed 600 seconds").into());
        }

        if !(self.analysis.z_threshold > 0.0 && self.analysis.z_threshold.is_finite()) {
            return Err(ArchiveError::config("Anomaly z-threshold must be a positive number").into());
        }

        if self.forms.max_label_length > 1000 {
            return Err(
                ArchiveError::config("Location label length cannot exceed 1000 characters").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ArchiveError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ArchiveError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for url in [&self.archive.geocoding_url, &self.archive.archive_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ArchiveError::config(format!(
                    "Archive API URL must be a valid HTTP or HTTPS URL, got: {url}"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// TLS needs both a certificate and a key
    fn validate_tls_paths(&self) -> Result<()> {
        match (&self.server.tls_cert_path, &self.server.tls_key_path) {
            (Some(_), None) | (None, Some(_)) => Err(ArchiveError::config(
                "TLS requires both tls_cert_path and tls_key_path",
            )
            .into()),
            _ => Ok(()),
        }
    }
}
