//! Configuration loading and resolution
//!
//! Every field has a built-in default, so a missing config file is not fatal.
//!
//! # Config file priority
//!
//! 1. Explicit path passed by the caller
//! 2. `COLLINK_CONFIG` environment variable
//! 3. `<platform config dir>/collink/config.toml`
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "COLLINK_CONFIG";

/// Application name used in user agents and the config directory
pub const APP_NAME: &str = "collink";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub endpoints: EndpointsConfig,
    pub harvest: HarvestConfig,
    pub matching: MatchingConfig,
    pub verify: VerifyConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Outbound HTTP client settings shared by every service client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total request timeout
    pub request_timeout_ms: u64,
    /// TCP connect timeout
    pub connect_timeout_ms: u64,
    /// Contact string appended to the user agent, e.g. a username or email
    pub client_identity: Option<String>,
    /// Retries for transient failures (0 disables retrying)
    pub max_retries: u32,
    /// First backoff delay, doubled after each failed attempt
    pub retry_initial_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            client_identity: None,
            max_retries: 0,
            retry_initial_backoff_ms: 500,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_initial_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_initial_backoff_ms)
    }
}

/// Base URLs of the external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Occurrence and species API (GBIF v1)
    pub occurrence_base: String,
    /// Person matching API (Bionomia)
    pub person_base: String,
    /// SPARQL endpoint of the identity knowledge base (Wikidata)
    pub sparql_endpoint: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            occurrence_base: "https://api.gbif.org/v1".to_string(),
            person_base: "https://api.bionomia.net".to_string(),
            sparql_endpoint: "https://query.wikidata.org/sparql".to_string(),
        }
    }
}

/// Occurrence harvesting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Records requested per page
    pub page_size: u32,
    /// Safety bound on pages fetched by one harvest
    pub max_pages: u32,
    /// `basisOfRecord` filter sent with every search
    pub basis_of_record: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: 300,
            max_pages: 1000,
            basis_of_record: "PRESERVED_SPECIMEN".to_string(),
        }
    }
}

/// Fuzzy matching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum score for a candidate to count as a match
    pub cutoff_score: f64,
    /// Lookups in flight at once
    pub concurrency: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            cutoff_score: 50.0,
            concurrency: 1,
        }
    }
}

/// Strict verification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Minimum spacing between strict search requests
    pub request_interval_ms: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            request_interval_ms: 1000,
        }
    }
}

impl VerifyConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values that would make a run meaningless or unbounded
    pub fn validate(&self) -> Result<()> {
        if self.harvest.page_size == 0 {
            return Err(Error::Config("harvest.page_size must be at least 1".to_string()));
        }
        if self.harvest.max_pages == 0 {
            return Err(Error::Config("harvest.max_pages must be at least 1".to_string()));
        }
        if self.matching.concurrency == 0 {
            return Err(Error::Config("matching.concurrency must be at least 1".to_string()));
        }
        if !self.matching.cutoff_score.is_finite() {
            return Err(Error::Config(format!(
                "matching.cutoff_score must be finite, got {}",
                self.matching.cutoff_score
            )));
        }
        Ok(())
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join("config.toml"))
}

/// Resolve which config file to read, if any
///
/// Explicit and environment paths are returned as-is (they must exist when
/// loaded); the platform default is only returned when the file exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Load configuration following the priority order above
///
/// A requested file (explicit or from the environment) that cannot be read is
/// an error. With no file at all, built-in defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            TomlConfig::from_file(&path)
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Build the user agent sent by every HTTP client
///
/// Format: `collink/{version}` or `collink/{version} ({identity})`
pub fn user_agent(client_identity: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    match client_identity.map(str::trim).filter(|s| !s.is_empty()) {
        Some(identity) => format!("{}/{} ({})", APP_NAME, version, identity),
        None => {
            debug!("No client identity configured, sending bare user agent");
            format!("{}/{}", APP_NAME, version)
        }
    }
}
