//! # Error Handling for Formwire
//!
//! Every fallible operation in `formwire-core` and `formwire-analytics` returns
//! [`Result<T>`], whose error type is the [`Error`] enum defined here.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (main error type)
//! ├── Network           - Transport failures (via NetworkError)
//! ├── Parse             - Frame / payload decoding failures (via ParseError)
//! ├── WebSocket         - WebSocket protocol errors
//! ├── Timeout           - Operation timeout
//! ├── Cancelled         - Operation cancelled through a CancellationToken
//! ├── ResourceExhausted - Capacity limits (e.g. subscription slots)
//! ├── InvalidRequest    - Invalid arguments
//! ├── Config            - Configuration validation failures
//! └── Context           - Error with additional context
//! ```
//!
//! Transport failures of the realtime client are *not* reported through this
//! type once the client is running: they surface as connection state changes
//! and lifecycle events. `Error` is what synchronous validation, the REST
//! collaborator and the codec return.
//!
//! ## Adding Context to Errors
//!
//! ```rust
//! use formwire_core::error::{Error, Result, ContextExt};
//!
//! fn load(form_id: &str) -> Result<()> {
//!     fetch(form_id).with_context(|| format!("Failed to load analytics for {form_id}"))?;
//!     Ok(())
//! }
//! # fn fetch(_: &str) -> Result<()> { Ok(()) }
//! ```

mod config;
mod context;
mod convert;
mod network;
mod parse;

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

pub use config::{ConfigValidationError, ValidationResult};
pub use context::ContextExt;
pub use network::NetworkError;
pub use parse::ParseError;

pub(crate) use convert::truncate_message;

/// Result type alias for all Formwire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for Formwire.
///
/// Large variants are boxed to keep the enum small, and static messages use
/// `Cow<'static, str>` so they do not allocate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Network-related errors encapsulating transport layer issues.
    #[error("Network error: {0}")]
    Network(Box<NetworkError>),

    /// Errors while decoding frames or HTTP response bodies.
    #[error("Parse error: {0}")]
    Parse(Box<ParseError>),

    /// WebSocket communication errors.
    /// Uses `Box<dyn StdError>` to preserve original error for downcast.
    #[error("WebSocket error: {0}")]
    WebSocket(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// Operation timeout.
    #[error("Timeout: {0}")]
    Timeout(Cow<'static, str>),

    /// Operation was cancelled.
    #[error("Cancelled: {0}")]
    Cancelled(Cow<'static, str>),

    /// A capacity limit has been reached, such as the maximum number of
    /// topic subscriptions.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(Cow<'static, str>),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    /// Configuration validation failure.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),

    /// Error with additional context, preserving the error chain.
    #[error("{context}")]
    Context {
        /// Context message describing what operation failed
        context: String,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    // ==================== Constructor Methods ====================

    /// Creates a network error from a message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(Box::new(NetworkError::ConnectionFailed(msg.into())))
    }

    /// Creates a network error for a non-success HTTP status.
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::Network(Box::new(NetworkError::RequestFailed {
            status,
            message: truncate_message(message.into()),
        }))
    }

    /// Creates a timeout error.
    pub fn timeout(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a cancelled error.
    ///
    /// ```rust
    /// use formwire_core::error::Error;
    ///
    /// let err = Error::cancelled("WebSocket connection cancelled");
    /// assert!(err.to_string().contains("cancelled"));
    /// ```
    pub fn cancelled(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a resource exhausted error.
    ///
    /// ```rust
    /// use formwire_core::error::Error;
    ///
    /// let err = Error::resource_exhausted(format!("Maximum subscriptions ({}) reached", 100));
    /// assert!(err.to_string().contains("Resource exhausted"));
    /// ```
    pub fn resource_exhausted(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Creates an invalid request error.
    pub fn invalid_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a WebSocket error from a message string.
    pub fn websocket(msg: impl Into<String>) -> Self {
        Self::WebSocket(Box::new(SimpleError(msg.into())))
    }

    /// Creates a WebSocket error from any error type.
    pub fn websocket_error<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::WebSocket(Box::new(err))
    }

    // ==================== Context Methods ====================

    /// Attaches context to an existing error.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    // ==================== Chain Traversal Methods ====================

    fn iter_chain(&self) -> impl Iterator<Item = &Error> {
        std::iter::successors(Some(self), |err| match err {
            Error::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        })
    }

    /// Returns the root cause of the error, skipping Context layers.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        self.iter_chain().last().unwrap_or(self)
    }

    /// Generates a detailed error report with the full chain.
    ///
    /// ```rust
    /// use formwire_core::error::Error;
    ///
    /// let err = Error::network("Connection refused").context("Failed to fetch analytics");
    /// let report = err.report();
    /// assert!(report.starts_with("Failed to fetch analytics"));
    /// assert!(report.contains("Caused by: Network error"));
    /// ```
    #[must_use]
    pub fn report(&self) -> String {
        use std::fmt::Write;
        let mut report = String::new();
        report.push_str(&self.to_string());

        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            let _ = write!(report, "\nCaused by: {err}");
            current = err.source();
        }
        report
    }

    // ==================== Helper Methods (Context Penetrating) ====================

    /// Checks if this error is retryable (penetrates Context layers).
    ///
    /// Returns `true` for connection failures, timeouts and 5xx responses.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(ne) => match ne.as_ref() {
                NetworkError::Timeout | NetworkError::ConnectionFailed(_) => true,
                NetworkError::RequestFailed { status, .. } => *status >= 500,
                _ => false,
            },
            Error::Timeout(_) => true,
            Error::Context { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Checks if this is a cancelled error (penetrates Context layers).
    #[must_use]
    pub fn as_cancelled(&self) -> Option<&str> {
        match self {
            Error::Cancelled(msg) => Some(msg.as_ref()),
            Error::Context { source, .. } => source.as_cancelled(),
            _ => None,
        }
    }

    /// Checks if this is a resource exhausted error (penetrates Context layers).
    #[must_use]
    pub fn as_resource_exhausted(&self) -> Option<&str> {
        match self {
            Error::ResourceExhausted(msg) => Some(msg.as_ref()),
            Error::Context { source, .. } => source.as_resource_exhausted(),
            _ => None,
        }
    }

    /// Returns the configuration error, if this is one (penetrates Context layers).
    #[must_use]
    pub fn as_config(&self) -> Option<&ConfigValidationError> {
        match self {
            Error::Config(err) => Some(err),
            Error::Context { source, .. } => source.as_config(),
            _ => None,
        }
    }

    /// Returns the HTTP status of a failed request (penetrates Context layers).
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Network(ne) => match ne.as_ref() {
                NetworkError::RequestFailed { status, .. } => Some(*status),
                _ => None,
            },
            Error::Context { source, .. } => source.http_status(),
            _ => None,
        }
    }
}

/// A simple error type for wrapping string messages.
#[derive(Debug)]
struct SimpleError(String);

impl fmt::Display for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for SimpleError {}
