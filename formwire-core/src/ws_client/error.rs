//! Classification of transport failures.
//!
//! Transport failures never surface as `Err` from the driver; they are
//! turned into a [`WsError`] whose kind is logged and whose message is
//! published in [`WsEvent::Error`](super::WsEvent::Error).

use std::fmt;

use tokio_tungstenite::tungstenite::Error as TungError;

use crate::error::{Error, NetworkError};

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WsErrorKind {
    /// Network blips, server restarts, timeouts.
    Transient,
    /// Bad URL, protocol violations, rejected handshakes.
    Permanent,
}

impl WsErrorKind {
    /// Returns `true` for [`WsErrorKind::Transient`].
    #[inline]
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns `true` for [`WsErrorKind::Permanent`].
    #[inline]
    #[must_use]
    pub fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }
}

impl fmt::Display for WsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        })
    }
}

/// A classified transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsError {
    kind: WsErrorKind,
    message: String,
}

impl WsError {
    /// Creates a classified error.
    pub fn new(kind: WsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(WsErrorKind::Transient, message)
    }

    /// Creates a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(WsErrorKind::Permanent, message)
    }

    /// Returns the error kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> WsErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this error may clear up on retry.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Returns `true` if retrying cannot help.
    #[inline]
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.kind.is_permanent()
    }

    /// Classifies a tungstenite error.
    pub fn from_tungstenite(err: &TungError) -> Self {
        match err {
            TungError::Io(io_err) => Self::transient(format!("IO error: {io_err}")),
            TungError::ConnectionClosed => Self::transient("connection closed by server"),
            TungError::AlreadyClosed => Self::transient("connection already closed"),
            TungError::Tls(tls_err) => Self::transient(format!("TLS error: {tls_err}")),
            TungError::WriteBufferFull(_) => Self::transient("write buffer full"),
            TungError::Http(response) if response.status().is_server_error() => {
                Self::transient(format!("handshake rejected: HTTP {}", response.status()))
            }
            TungError::Http(response) => {
                Self::permanent(format!("handshake rejected: HTTP {}", response.status()))
            }
            TungError::Url(url_err) => Self::permanent(format!("invalid URL: {url_err}")),
            TungError::Protocol(protocol_err) => {
                Self::permanent(format!("protocol error: {protocol_err}"))
            }
            other => Self::permanent(other.to_string()),
        }
    }

    /// Classifies a crate error, such as one returned by a
    /// [`Connector`](super::Connector).
    pub fn from_error(err: &Error) -> Self {
        match err.root_cause() {
            Error::Timeout(_) => Self::transient(err.to_string()),
            Error::Network(network) => match network.as_ref() {
                NetworkError::InvalidEndpoint(_) => Self::permanent(err.to_string()),
                NetworkError::RequestFailed { status, .. } if *status < 500 => {
                    Self::permanent(err.to_string())
                }
                _ => Self::transient(err.to_string()),
            },
            Error::WebSocket(source) => source
                .downcast_ref::<TungError>()
                .map_or_else(|| Self::transient(err.to_string()), Self::from_tungstenite),
            Error::Config(_) | Error::InvalidRequest(_) => Self::permanent(err.to_string()),
            _ => Self::transient(err.to_string()),
        }
    }
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for WsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_endpoint_is_permanent() {
        let err = Error::from(NetworkError::InvalidEndpoint("ftp://x".into()));
        assert_eq!(WsError::from_error(&err).kind(), WsErrorKind::Permanent);
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = Error::timeout("handshake").context("connecting");
        assert!(WsError::from_error(&err).is_transient());
    }

    #[test]
    fn test_server_rejection_classification() {
        assert!(WsError::from_error(&Error::request_failed(503, "down")).is_transient());
        assert!(!WsError::from_error(&Error::request_failed(404, "gone")).is_transient());
    }

    #[test]
    fn test_tungstenite_closed_is_transient() {
        let err = WsError::from_tungstenite(&TungError::ConnectionClosed);
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "[transient] connection closed by server");
    }
}
