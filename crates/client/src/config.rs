//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GATEHOUSE_API_URL` - Base URL of the account service (http or https)
//!
//! ## Optional
//! - `GATEHOUSE_STATE_DIR` - Directory holding the credential state file
//!   (default: `.gatehouse` in the working directory)
//! - `GATEHOUSE_HTTP_TIMEOUT_SECS` - HTTP request timeout in seconds
//!   (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default request timeout in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default state directory, relative to the working directory.
const DEFAULT_STATE_DIR: &str = ".gatehouse";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the account service.
    pub api_url: Url,
    /// Directory holding the credential state file.
    pub state_dir: PathBuf,
    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `GATEHOUSE_API_URL` is missing or not a
    /// valid http(s) URL, or if the timeout is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url("GATEHOUSE_API_URL", &get_required_env("GATEHOUSE_API_URL")?)?;
        let state_dir = PathBuf::from(get_env_or_default("GATEHOUSE_STATE_DIR", DEFAULT_STATE_DIR));
        let http_timeout = parse_timeout(
            "GATEHOUSE_HTTP_TIMEOUT_SECS",
            get_optional_env("GATEHOUSE_HTTP_TIMEOUT_SECS").as_deref(),
        )?;

        Ok(Self {
            api_url,
            state_dir,
            http_timeout,
        })
    }

    /// Path of the credential state file inside [`state_dir`](Self::state_dir).
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join("credentials.json")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the account service base URL.
fn parse_api_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("scheme must be http or https, got '{}'", url.scheme()),
        ));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "URL has no host".to_string(),
        ));
    }

    Ok(url)
}

/// Parse the request timeout, falling back to the default when unset.
fn parse_timeout(var_name: &str, raw: Option<&str>) -> Result<Duration, ConfigError> {
    let secs = match raw {
        None => DEFAULT_HTTP_TIMEOUT_SECS,
        Some(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?,
    };
    Ok(Duration::from_secs(secs))
}
