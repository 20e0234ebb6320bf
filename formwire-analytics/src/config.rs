//! Environment-driven configuration.
//!
//! Every setting is read from a `FORMWIRE_` prefixed variable and falls back
//! to the local development backend.

use std::env;
use std::time::Duration;

use formwire_core::error::{ConfigValidationError, Error, Result, ValidationResult};
use formwire_core::ws_client::{WS_URL_ENV, WsConfig};
use url::Url;

/// REST base URL variable.
pub const API_URL_ENV: &str = "FORMWIRE_API_URL";
/// REST request timeout variable, in milliseconds.
pub const REQUEST_TIMEOUT_ENV: &str = "FORMWIRE_REQUEST_TIMEOUT_MS";
/// Poll interval variable, in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "FORMWIRE_POLL_INTERVAL_MS";

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Client-side settings for talking to the Formwire backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormwireConfig {
    /// REST base URL, without a trailing `/analytics`.
    pub api_url: String,
    /// Explicit WebSocket URL. Derived from `api_url` when unset.
    pub ws_url: Option<String>,
    /// REST request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Poll interval in milliseconds for [`AnalyticsPoller`](crate::AnalyticsPoller).
    pub poll_interval_ms: u64,
}

impl Default for FormwireConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl FormwireConfig {
    /// Loads configuration from `FORMWIRE_` environment variables.
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads a `.env` file into the process environment, then reads it.
    pub fn from_dotenv(path: &str) -> Result<Self> {
        dotenvy::from_filename(path).map_err(|e| {
            Error::from(ConfigValidationError::invalid(
                "dotenv",
                format!("{path}: {e}"),
            ))
        })?;
        Ok(Self::from_env())
    }

    /// Reads the default `.env` file if there is one, then the environment.
    pub fn from_default_dotenv() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.api_url = val.trim().to_string();
        }
        config.ws_url = lookup(WS_URL_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(val) = lookup(REQUEST_TIMEOUT_ENV) {
            config.request_timeout_ms = val.parse().unwrap_or(default_request_timeout_ms());
        }
        if let Some(val) = lookup(POLL_INTERVAL_ENV) {
            config.poll_interval_ms = val.parse().unwrap_or(default_poll_interval_ms());
        }

        config
    }

    /// REST request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Realtime client configuration: the explicit WebSocket URL if one is
    /// set, otherwise one derived from the REST origin.
    pub fn ws_config(&self) -> Result<WsConfig> {
        match &self.ws_url {
            Some(url) => Ok(WsConfig::new(url.clone())),
            None => {
                let api = Url::parse(&self.api_url)?;
                WsConfig::from_origin(api.origin().ascii_serialization().as_str())
            }
        }
    }

    /// Checks URLs and timeouts.
    pub fn validate(&self) -> std::result::Result<ValidationResult, ConfigValidationError> {
        let api = Url::parse(&self.api_url)
            .map_err(|e| ConfigValidationError::invalid("api_url", e.to_string()))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ConfigValidationError::invalid(
                "api_url",
                format!("unsupported scheme '{}'", api.scheme()),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigValidationError::too_low("request_timeout_ms", 0, 1));
        }
        if self.poll_interval_ms < 100 {
            return Err(ConfigValidationError::too_low(
                "poll_interval_ms",
                self.poll_interval_ms,
                100,
            ));
        }

        let mut result = ValidationResult::new();
        if let Some(ws_url) = &self.ws_url {
            result.merge(WsConfig::new(ws_url.clone()).validate()?);
        }
        if api.scheme() == "http" && api.host_str().is_some_and(|h| h != "localhost") {
            result.add_warning(format!("api_url {} is not using TLS", self.api_url));
        }
        Ok(result)
    }
}
