//! Connection lifecycle events.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle event published to listeners registered with
/// [`WsClient::add_event_listener`](super::WsClient::add_event_listener).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Handshake started.
    Connecting,
    /// Socket open, heartbeat started, subscriptions replayed.
    Connected,
    /// Socket closed without the caller asking for it.
    Disconnected,
    /// Transport failure; a close follows.
    Error {
        /// Classified failure description.
        message: String,
    },
    /// A reconnect timer was armed.
    Reconnecting {
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// The attempt budget is spent; only a manual connect resumes.
    ReconnectExhausted {
        /// Attempts made since the last successful open.
        total_attempts: u32,
    },
    /// Subscriptions replayed after an open.
    SubscriptionRestored {
        /// Number of `subscribe` frames sent.
        count: usize,
    },
    /// Intentional disconnect completed.
    Closed,
}

impl WsEvent {
    /// Returns true if this is a Connected event.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if this is a Disconnected event.
    #[inline]
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Returns true if this is a Reconnecting event.
    #[inline]
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, Self::Reconnecting { .. })
    }

    /// Returns true for [`WsEvent::Error`] and [`WsEvent::ReconnectExhausted`].
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::ReconnectExhausted { .. })
    }

    /// Returns true if no further events follow without a manual connect.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReconnectExhausted { .. } | Self::Closed)
    }
}

impl fmt::Display for WsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Error { message } => write!(f, "Error: {message}"),
            Self::Reconnecting { attempt, delay } => {
                write!(f, "Reconnecting (attempt {attempt}, delay: {delay:?})")
            }
            Self::ReconnectExhausted { total_attempts } => {
                write!(f, "ReconnectExhausted (attempts: {total_attempts})")
            }
            Self::SubscriptionRestored { count } => {
                write!(f, "SubscriptionRestored ({count} topics)")
            }
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Event callback function type.
pub type WsEventCallback = Arc<dyn Fn(&WsEvent) + Send + Sync>;
