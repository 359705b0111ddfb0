//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8082";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Path prefix that marks same-origin backend calls eligible for the bearer header.
pub const API_PREFIX: &str = "/api/";

/// Route every unauthenticated navigation ends up on.
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("cannot resolve session file: set INKWELL_SESSION_FILE or HOME")]
    NoSessionFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    pub ai: Duration,
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            ai: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `INKWELL_BASE_URL`: default `http://localhost:8082`
    /// - `INKWELL_REQUEST_TIMEOUT_SECS`: default 60
    /// - `INKWELL_AI_TIMEOUT_SECS`: default 180
    /// - `INKWELL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `INKWELL_SESSION_FILE`: default `$HOME/.inkwell/session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or no session file path can be resolved.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(
            &std::env::var("INKWELL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
        )?;
        let timeouts = Timeouts {
            request: Duration::from_secs(env_parse_u64("INKWELL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)),
            ai: Duration::from_secs(env_parse_u64("INKWELL_AI_TIMEOUT_SECS", DEFAULT_AI_TIMEOUT_SECS)),
            connect: Duration::from_secs(env_parse_u64("INKWELL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)),
        };
        let session_file = match std::env::var_os("INKWELL_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_session_file().ok_or(ConfigError::NoSessionFile)?,
        };
        Ok(Self { base_url, timeouts, session_file })
    }

    /// Config pointing at `base_url` with default timeouts. Used by tests and embedders.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not http(s).
    pub fn with_base_url(base_url: &str, session_file: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeouts: Timeouts::default(),
            session_file: session_file.into(),
        })
    }
}

/// Trim whitespace and trailing slashes; require an http(s) scheme.
///
/// # Errors
///
/// Returns `InvalidBaseUrl` for anything else.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn default_session_file() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".inkwell").join("session.json"))
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
