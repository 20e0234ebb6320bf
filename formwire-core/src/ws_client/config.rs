//! Realtime client configuration and endpoint resolution.

use rand::Rng;
use std::time::Duration;
use url::Url;

use crate::error::{ConfigValidationError, Result, ValidationResult};

/// Port the analytics backend serves the WebSocket hub on.
pub const DEFAULT_WS_PORT: u16 = 8080;

/// Path of the WebSocket hub.
pub const DEFAULT_WS_PATH: &str = "/api/v1/ws";

/// Environment variable that overrides the derived WebSocket URL.
pub const WS_URL_ENV: &str = "FORMWIRE_WS_URL";

/// Default maximum number of subscriptions.
pub const DEFAULT_MAX_SUBSCRIPTIONS: usize = 100;

/// Default maximum number of consecutive reconnection attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Default bound on a single frame write or the close handshake, in milliseconds.
pub const DEFAULT_WRITE_TIMEOUT: u64 = 5000;

/// Smallest accepted reconnect base delay.
const MIN_BASE_DELAY: Duration = Duration::from_millis(10);

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry (default: 5 seconds)
    pub base_delay: Duration,
    /// Maximum delay cap (default: 30 seconds)
    pub max_delay: Duration,
    /// Jitter factor in `[0.0, 1.0]` (default: 0.0, deterministic)
    pub jitter_factor: f64,
    /// Multiplier for exponential growth (default: 2.0)
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.0,
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Checks the bounds of every field.
    pub fn validate(&self) -> std::result::Result<ValidationResult, ConfigValidationError> {
        if self.base_delay < MIN_BASE_DELAY {
            return Err(ConfigValidationError::too_low(
                "base_delay",
                format!("{}ms", self.base_delay.as_millis()),
                format!("{}ms", MIN_BASE_DELAY.as_millis()),
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigValidationError::too_low(
                "max_delay",
                format!("{}ms", self.max_delay.as_millis()),
                format!("{}ms", self.base_delay.as_millis()),
            ));
        }
        if !(self.multiplier >= 1.0) {
            return Err(ConfigValidationError::too_low(
                "multiplier",
                self.multiplier.to_string(),
                "1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigValidationError::invalid(
                "jitter_factor",
                format!("{} is outside [0.0, 1.0]", self.jitter_factor),
            ));
        }

        let mut result = ValidationResult::new();
        if self.max_delay > Duration::from_secs(300) {
            result.add_warning(format!(
                "max_delay of {}s leaves dashboards stale for a long time",
                self.max_delay.as_secs()
            ));
        }
        Ok(result)
    }
}

/// Calculates retry delay with exponential backoff and optional jitter.
#[derive(Debug, Clone)]
pub struct BackoffStrategy {
    config: BackoffConfig,
}

impl BackoffStrategy {
    /// Creates a new backoff strategy with the given configuration.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Creates a new backoff strategy with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(BackoffConfig::default())
    }

    /// Returns a reference to the underlying configuration.
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay for the zero-based `attempt`: `min(base * multiplier^attempt, max)`,
    /// plus up to `jitter_factor` of that value.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let capped = self.capped_millis(attempt);
        let jitter = if self.config.jitter_factor > 0.0 {
            rand::rng().random::<f64>() * capped * self.config.jitter_factor
        } else {
            0.0
        };
        millis_to_duration(capped + jitter)
    }

    /// Same as [`calculate_delay`](Self::calculate_delay) with jitter disabled.
    pub fn calculate_delay_without_jitter(&self, attempt: u32) -> Duration {
        millis_to_duration(self.capped_millis(attempt))
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    fn capped_millis(&self, attempt: u32) -> f64 {
        let base_ms = self.config.base_delay.as_millis() as f64;
        let max_ms = self.config.max_delay.as_millis() as f64;
        let exponent = attempt.min(i32::MAX as u32) as i32;
        (base_ms * self.config.multiplier.powi(exponent)).min(max_ms)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis_to_duration(ms: f64) -> Duration {
    Duration::from_millis(ms as u64)
}

/// Realtime client configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket server URL (`ws://` or `wss://`)
    pub url: String,
    /// Handshake timeout in milliseconds
    pub connect_timeout: u64,
    /// Bound on one frame write or the close handshake, in milliseconds.
    /// A write that exceeds it fails the connection.
    pub write_timeout: u64,
    /// Heartbeat ping interval in milliseconds, 0 disables the heartbeat
    pub ping_interval: u64,
    /// Maximum consecutive reconnection attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Reconnect automatically after an unexpected close
    pub auto_reconnect: bool,
    /// Exponential backoff configuration for reconnection.
    pub backoff_config: BackoffConfig,
    /// Maximum number of subscribed topics.
    pub max_subscriptions: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://localhost:{DEFAULT_WS_PORT}{DEFAULT_WS_PATH}"),
            connect_timeout: 10_000,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            ping_interval: 30_000,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            auto_reconnect: true,
            backoff_config: BackoffConfig::default(),
            max_subscriptions: DEFAULT_MAX_SUBSCRIPTIONS,
        }
    }
}

impl WsConfig {
    /// Creates a configuration for an explicit WebSocket URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration whose URL is derived from a page origin.
    ///
    /// See [`resolve_ws_url`].
    pub fn from_origin(origin: &str) -> Result<Self> {
        Ok(Self::new(resolve_ws_url(origin)?))
    }

    /// Creates a configuration from `FORMWIRE_WS_URL`, falling back to
    /// [`resolve_ws_url`] on `fallback_origin`.
    pub fn from_env_or_origin(fallback_origin: &str) -> Result<Self> {
        match std::env::var(WS_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Ok(Self::new(url.trim())),
            _ => Self::from_origin(fallback_origin),
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = duration_to_millis(interval);
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = duration_to_millis(timeout);
        self
    }

    /// Sets the write timeout.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = duration_to_millis(timeout);
        self
    }

    /// Sets the maximum number of reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Replaces the backoff configuration.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff_config = backoff;
        self
    }

    /// Heartbeat interval, `None` when disabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval > 0).then(|| Duration::from_millis(self.ping_interval))
    }

    /// Handshake timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    /// Write and close timeout.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout)
    }

    /// Validates the configuration, returning non-fatal warnings on success.
    pub fn validate(&self) -> std::result::Result<ValidationResult, ConfigValidationError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ConfigValidationError::invalid("url", e.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigValidationError::invalid(
                "url",
                format!("scheme must be ws or wss, got {}", url.scheme()),
            ));
        }
        if self.max_subscriptions == 0 {
            return Err(ConfigValidationError::too_low("max_subscriptions", "0", "1"));
        }
        if self.connect_timeout == 0 {
            return Err(ConfigValidationError::too_low("connect_timeout", "0", "1"));
        }
        if self.write_timeout == 0 {
            return Err(ConfigValidationError::too_low("write_timeout", "0", "1"));
        }

        let mut result = self.backoff_config.validate()?;
        if self.ping_interval == 0 {
            result.add_warning("heartbeat disabled; idle proxies may drop the connection");
        }
        if !self.auto_reconnect {
            result.add_warning("auto_reconnect disabled; closes require a manual connect");
        }
        Ok(result)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Derives the WebSocket endpoint from a page origin.
///
/// `https` maps to `wss`, anything else to `ws`; the host is kept, the port
/// is forced to 8080 and the path to `/api/v1/ws`.
///
/// ```
/// use formwire_core::ws_client::resolve_ws_url;
///
/// let url = resolve_ws_url("https://forms.example.com").unwrap();
/// assert_eq!(url, "wss://forms.example.com:8080/api/v1/ws");
/// ```
pub fn resolve_ws_url(origin: &str) -> Result<String> {
    let origin = Url::parse(origin)?;
    let host = origin
        .host_str()
        .ok_or_else(|| crate::error::Error::invalid_request(format!("origin has no host: {origin}")))?;
    let scheme = if origin.scheme() == "https" { "wss" } else { "ws" };
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    Ok(format!("{scheme}://{host}:{DEFAULT_WS_PORT}{DEFAULT_WS_PATH}"))
}
