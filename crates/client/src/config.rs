//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TOTE_API_BASE_URL` - REST backend base URL (default: <https://dummyjson.com>)
//! - `TOTE_DATA_DIR` - Directory for on-device storage (default: `.tote`)
//! - `TOTE_REFRESH_EXPIRES_IN_MINS` - Lifetime requested for refreshed tokens (default: 30)
//! - `TOTE_HTTP_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `TOTE_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://dummyjson.com";
const DEFAULT_DATA_DIR: &str = ".tote";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shopping client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is joined onto
    pub api_base_url: Url,
    /// Directory holding the cart, favorites and fallback secret files
    pub data_dir: PathBuf,
    /// `expiresInMins` sent with every token refresh
    pub refresh_expires_in_mins: u32,
    /// Transport timeout for every request
    pub http_timeout: Duration,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
}

impl ClientConfig {
    /// Build a configuration with default tuning for the given backend and
    /// data directory.
    #[must_use]
    pub fn new(api_base_url: Url, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base_url,
            data_dir: data_dir.into(),
            refresh_expires_in_mins: 30,
            http_timeout: Duration::from_secs(30),
            catalog_cache_ttl: Duration::from_secs(300),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "TOTE_API_BASE_URL",
            &get_env_or_default("TOTE_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let data_dir = PathBuf::from(get_env_or_default("TOTE_DATA_DIR", DEFAULT_DATA_DIR));
        let refresh_expires_in_mins = get_env_or_default("TOTE_REFRESH_EXPIRES_IN_MINS", "30")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("TOTE_REFRESH_EXPIRES_IN_MINS".to_string(), e.to_string())
            })?;
        let http_timeout = get_secs("TOTE_HTTP_TIMEOUT_SECS", "30")?;
        let catalog_cache_ttl = get_secs("TOTE_CATALOG_CACHE_TTL_SECS", "300")?;

        Ok(Self {
            api_base_url,
            data_dir,
            refresh_expires_in_mins,
            http_timeout,
            catalog_cache_ttl,
        })
    }

    /// Override the backend URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `url` is not an absolute URL.
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = parse_base_url("TOTE_API_BASE_URL", url)?;
        Ok(self)
    }

    /// Override the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a duration in whole seconds.
fn get_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    get_env_or_default(key, default)
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a base URL, making sure it ends with `/` so relative paths join
/// onto it rather than replacing its last segment.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
