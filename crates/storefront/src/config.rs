//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CRAFTED_ROOTS_API_BASE` - Backend base URL (default: `http://127.0.0.1:8000`)
//! - `CRAFTED_ROOTS_LOGIN_ROUTE` - Route users are sent to when their session
//!   cannot be recovered (default: `/sign-in/login`)
//! - `CRAFTED_ROOTS_REQUEST_TIMEOUT_SECS` - Transport timeout in seconds
//!   (default: none)
//! - `CRAFTED_ROOTS_SESSION_FILE` - Where the CLI persists the session
//!   (default: `$HOME/.crafted-roots/session.json`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
const DEFAULT_LOGIN_ROUTE: &str = "/sign-in/login";
const SESSION_DIR: &str = ".crafted-roots";
const SESSION_FILE_NAME: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are resolved against it
    pub api_base: Url,
    /// Route announced when the user must log in again
    pub login_route: String,
    /// Transport timeout applied to every request
    pub request_timeout: Option<Duration>,
    /// Location of the file-backed session store
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            request_timeout: None,
            session_file: default_session_file(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given backend, leaving everything else
    /// at its default.
    #[must_use]
    pub fn for_api_base(api_base: Url) -> Self {
        Self {
            api_base: with_trailing_slash(api_base),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base = parse_api_base(
            "CRAFTED_ROOTS_API_BASE",
            &get_env_or_default("CRAFTED_ROOTS_API_BASE", DEFAULT_API_BASE),
        )?;
        let login_route = parse_login_route(
            "CRAFTED_ROOTS_LOGIN_ROUTE",
            &get_env_or_default("CRAFTED_ROOTS_LOGIN_ROUTE", DEFAULT_LOGIN_ROUTE),
        )?;
        let request_timeout = get_optional_env("CRAFTED_ROOTS_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_timeout("CRAFTED_ROOTS_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?;
        let session_file = get_optional_env("CRAFTED_ROOTS_SESSION_FILE")
            .map_or_else(default_session_file, PathBuf::from);

        Ok(Self {
            api_base,
            login_route,
            request_timeout,
            session_file,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[allow(clippy::expect_used)] // constant input
fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL")
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(SESSION_DIR).join(SESSION_FILE_NAME),
        |home| PathBuf::from(home).join(SESSION_DIR).join(SESSION_FILE_NAME),
    )
}

/// Parse the backend base URL. Only absolute http(s) URLs are accepted.
///
/// A trailing slash is added so relative endpoint paths resolve beneath any
/// path prefix the base carries.
fn parse_api_base(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(with_trailing_slash(url))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_login_route(var_name: &str, raw: &str) -> Result<String, ConfigError> {
    if raw.starts_with('/') {
        Ok(raw.to_string())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must start with '/'".to_string(),
        ))
    }
}

fn parse_timeout(var_name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
