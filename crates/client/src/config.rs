//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTSYNC_API_BASE_URL` - Base URL of the storefront REST API
//!   (e.g., `https://api.example.com/api/`)
//!
//! ## Optional
//! - `CARTSYNC_DATA_DIR` - Directory for persisted snapshots (default: `.cartsync`)
//! - `CARTSYNC_DEFAULT_UNIT` - Unit sent for cart lines without one (default: `kg`)
//! - `CARTSYNC_AUTH_TOKEN` - Session bearer token to seed the credential store
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Unit label sent for cart lines that do not carry one.
pub const DEFAULT_UNIT_LABEL: &str = "kg";

/// Default directory for persisted snapshots.
pub const DEFAULT_DATA_DIR: &str = ".cartsync";

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
    /// REST API configuration
    pub api: ApiConfig,
    /// Directory holding persisted snapshots
    pub data_dir: PathBuf,
    /// Session token to store at startup, if any
    pub auth_token: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Storefront REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; always ends with a slash so endpoint paths can be joined
    pub base_url: Url,
    /// Unit label sent when a cart line has none
    pub default_unit: String,
}

impl ApiConfig {
    /// Create an API configuration for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed, is
    /// not `http`/`https`, or has no host.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            default_unit: DEFAULT_UNIT_LABEL.to_string(),
        })
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = get_required(&lookup, "CARTSYNC_API_BASE_URL")?;
        let mut api = ApiConfig::new(&base_url)?;
        api.default_unit = get_or_default(&lookup, "CARTSYNC_DEFAULT_UNIT", DEFAULT_UNIT_LABEL);
        if api.default_unit.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CARTSYNC_DEFAULT_UNIT".to_string(),
                "cannot be blank".to_string(),
            ));
        }

        let data_dir = PathBuf::from(get_or_default(&lookup, "CARTSYNC_DATA_DIR", DEFAULT_DATA_DIR));
        let auth_token = get_optional(&lookup, "CARTSYNC_AUTH_TOKEN").map(SecretString::from);

        Ok(Self {
            api,
            data_dir,
            auth_token,
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get_optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional variable; blank values count as unset.
fn get_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse and normalize the API base URL.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("CARTSYNC_API_BASE_URL".to_string(), reason);

    let mut url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("must have a host".to_string()));
    }
    // Url::join replaces the last path segment unless the path ends with '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
