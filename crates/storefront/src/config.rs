//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COMMERCE_API_BASE_URL` - Commerce API server (e.g., <https://shop-api.example.com>)
//! - `COMMERCE_API_PATH` - Per-store path prefix assigned by the commerce API
//!
//! ## Optional
//! - `COMMERCE_API_VERSION` - API version segment (default: v2)
//! - `COMMERCE_API_TOKEN` - Token sent in the `Authorization` header
//! - `COMMERCE_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CATALOG_CACHE_TTL_SECS` - Product cache time-to-live (default: 300)
//! - `STORE_CURRENCY` - ISO 4217 currency of the store (default: TWD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use cartwheel_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Commerce API connection settings
    pub api: CommerceApiConfig,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
    /// Currency all store amounts are expressed in
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce API connection settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CommerceApiConfig {
    /// API server base URL
    pub base_url: Url,
    /// API version segment (e.g., v2)
    pub api_version: String,
    /// Per-store path prefix
    pub api_path: String,
    /// Optional authorization token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for CommerceApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("api_path", &self.api_path)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CommerceApiConfig {
    /// Settings for a server with no token and the default version/timeout.
    #[must_use]
    pub fn new(base_url: Url, api_path: impl Into<String>) -> Self {
        Self {
            base_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            api_path: api_path.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Root URL every endpoint path is appended to, without a trailing slash.
    ///
    /// e.g. `https://shop-api.example.com/v2/api/my-store`
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.api_version.trim_matches('/'),
            self.api_path.trim_matches('/')
        )
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw_base = get_required_env("COMMERCE_API_BASE_URL")?;
        let base_url = Url::parse(&raw_base).map_err(|e| {
            ConfigError::InvalidEnvVar("COMMERCE_API_BASE_URL".to_string(), e.to_string())
        })?;

        let api_path = get_required_env("COMMERCE_API_PATH")?;
        if api_path.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "COMMERCE_API_PATH".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_version: get_env_or_default("COMMERCE_API_VERSION", DEFAULT_API_VERSION),
            api_path,
            token: get_optional_env("COMMERCE_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(get_secs_or_default(
                "COMMERCE_API_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }
}

const DEFAULT_API_VERSION: &str = "v2";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

impl StorefrontConfig {
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

        let api = CommerceApiConfig::from_env()?;
        let catalog_cache_ttl = Duration::from_secs(get_secs_or_default(
            "CATALOG_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);
        let currency = get_env_or_default("STORE_CURRENCY", "TWD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STORE_CURRENCY".to_string(), e.to_string()))?;

        Ok(Self {
            api,
            catalog_cache_ttl,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for the given API settings with every optional value at
    /// its default.
    #[must_use]
    pub fn with_api(api: CommerceApiConfig) -> Self {
        Self {
            api,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds with a default value.
fn get_secs_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
