//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `JULID_API_BASE` - Backend REST base URL (default: `http://127.0.0.1:8000/api`)
//! - `JULID_FRONTEND_URL` - Origin password reset links point at (default: `http://localhost:5173`)
//! - `JULID_SESSION_DIR` - Directory for the persisted session (default: `.julid`)
//! - `JULID_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `JULID_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `JULID_NOTICE_TTL_SECS` - How long notices stay visible (default: 4)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_SESSION_DIR: &str = ".julid";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL, normalized to end with `/`
    pub api_base: Url,
    /// Origin the backend embeds in password reset links
    pub frontend_url: String,
    /// Directory holding the persisted `token` and `user` keys
    pub session_dir: PathBuf,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Catalog cache time-to-live
    pub catalog_cache_ttl: Duration,
    /// Notice auto-dismiss delay
    pub notice_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base = parse_base_url(
            "JULID_API_BASE",
            &get_env_or_default(&lookup, "JULID_API_BASE", DEFAULT_API_BASE),
        )?;
        let frontend_url = get_env_or_default(&lookup, "JULID_FRONTEND_URL", DEFAULT_FRONTEND_URL)
            .trim_end_matches('/')
            .to_string();
        let session_dir = PathBuf::from(get_env_or_default(
            &lookup,
            "JULID_SESSION_DIR",
            DEFAULT_SESSION_DIR,
        ));

        Ok(Self {
            api_base,
            frontend_url,
            session_dir,
            http_timeout: get_secs(&lookup, "JULID_HTTP_TIMEOUT_SECS", 15)?,
            catalog_cache_ttl: get_secs(&lookup, "JULID_CATALOG_CACHE_TTL_SECS", 300)?,
            notice_ttl: get_secs(&lookup, "JULID_NOTICE_TTL_SECS", 4)?,
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating blank values as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Get a variable with a default value.
fn get_env_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Get a positive number of seconds.
fn get_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(lookup, key) else {
        return Ok(Duration::from_secs(default));
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse an absolute http(s) URL and make sure its path ends with `/`.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not carry a query or fragment".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_base.as_str(), "http://127.0.0.1:8000/api/");
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert_eq!(config.session_dir, PathBuf::from(".julid"));
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.notice_ttl, Duration::from_secs(4));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_api_base_normalized_for_joins() {
        let config = config(&[("JULID_API_BASE", "https://shop.example.com/api")]).unwrap();
        assert_eq!(
            config.api_base.join("cart/add").unwrap().as_str(),
            "https://shop.example.com/api/cart/add"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config(&[("JULID_API_BASE", "ftp://x")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(config(&[("JULID_API_BASE", "not a url")]).is_err());
        assert!(config(&[("JULID_HTTP_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("JULID_NOTICE_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_blank_optional_values_are_unset() {
        let config = config(&[("SENTRY_DSN", "  "), ("JULID_SESSION_DIR", "")]).unwrap();
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.session_dir, PathBuf::from(".julid"));
    }
}
