//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLEMENTINE_API_URL` - Base URL of the commerce backend
//!
//! ## Optional
//! - `CLEMENTINE_STATE_DIR` - Directory for durable client state such as the
//!   persisted session (default: platform data dir under `clementine/`)
//! - `CLEMENTINE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

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
pub struct Config {
    /// Base URL of the commerce backend (e.g. `https://api.shop.example`).
    pub api_url: Url,
    /// Directory holding durable client state (persisted session).
    pub state_dir: PathBuf,
    /// Bounded timeout applied to every network call.
    pub request_timeout: Duration,
}

impl Config {
    /// Create a configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            state_dir: default_state_dir(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one is present (development convenience).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `CLEMENTINE_API_URL` is missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_url = required_env("CLEMENTINE_API_URL")?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CLEMENTINE_API_URL".to_owned(), e.to_string())
        })?;

        let state_dir = std::env::var("CLEMENTINE_STATE_DIR")
            .map_or_else(|_| default_state_dir(), PathBuf::from);

        let request_timeout = match std::env::var("CLEMENTINE_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ConfigError::InvalidEnvVar(
                        "CLEMENTINE_REQUEST_TIMEOUT_SECS".to_owned(),
                        format!("expected an integer, got {raw:?}"),
                    )
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            state_dir,
            request_timeout,
        })
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

/// Platform data dir under `clementine/`, falling back to the current
/// directory when the platform provides none.
fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clementine")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let config = Config::new(Url::parse("http://localhost:4000").expect("valid url"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.state_dir.ends_with("clementine"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("CLEMENTINE_API_URL".to_owned());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: CLEMENTINE_API_URL"
        );
    }
}
