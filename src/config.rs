//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Production API base URL.
pub const DEFAULT_API_URL: &str = "https://fitnessapi-d773a1148384.herokuapp.com/api";

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL that endpoint paths are joined onto
    pub api_url: String,
    /// File holding the persisted credential
    pub credential_path: PathBuf,
    /// Timeout for ordinary requests
    pub request_timeout: Duration,
    /// Timeout for file uploads
    pub upload_timeout: Duration,
    /// Delay before the single retry of a 503 response
    pub retry_backoff: Duration,
    /// Authorization header scheme ("Token" for the fitness API)
    pub auth_scheme: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".to_string(),
            credential_path: PathBuf::from(".fittrack/credential"),
            request_timeout: Duration::from_secs(15),
            upload_timeout: Duration::from_secs(30),
            retry_backoff: Duration::ZERO,
            auth_scheme: "Token".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            api_url: env::var("FITTRACK_API_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            credential_path: env::var("FITTRACK_CREDENTIAL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".fittrack/credential")),
            request_timeout: Duration::from_secs(parse_var(
                "FITTRACK_REQUEST_TIMEOUT_SECS",
                15,
            )?),
            upload_timeout: Duration::from_secs(parse_var("FITTRACK_UPLOAD_TIMEOUT_SECS", 30)?),
            retry_backoff: Duration::from_millis(parse_var("FITTRACK_RETRY_BACKOFF_MS", 2000)?),
            auth_scheme: env::var("FITTRACK_AUTH_SCHEME")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "Token".to_string()),
        })
    }

    /// Join an endpoint path onto the API base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("FITTRACK_API_URL", "https://api.example.com/api/");
        env::set_var("FITTRACK_REQUEST_TIMEOUT_SECS", "20");
        env::remove_var("FITTRACK_RETRY_BACKOFF_MS");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_url, "https://api.example.com/api");
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.upload_timeout, Duration::from_secs(30));
        assert_eq!(config.retry_backoff, Duration::from_millis(2000));
        assert_eq!(config.auth_scheme, "Token");

        env::remove_var("FITTRACK_API_URL");
        env::remove_var("FITTRACK_REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn test_endpoint_joins_single_slash() {
        let config = Config {
            api_url: "http://localhost:8000/api/".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.endpoint("/workouts/summary/"),
            "http://localhost:8000/api/workouts/summary/"
        );
    }
}
