//! Connection state and lock-free statistics.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Connection state of a [`WsClient`](super::WsClient).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket; the initial state and the state after an unexpected close
    #[default]
    Disconnected = 0,
    /// Handshake in progress
    Connecting = 1,
    /// Socket open, heartbeat running
    Connected = 2,
    /// Intentional shutdown in progress
    Closing = 3,
    /// Intentionally closed by the caller
    Closed = 4,
    /// Transport error observed; a close follows
    Error = 5,
}

impl ConnectionState {
    /// Converts a `u8` value to `ConnectionState`.
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            4 => Self::Closed,
            _ => Self::Error,
        }
    }

    /// Converts the state to its `u8` representation.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lower-case name, as used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }

    /// `true` while a handshake is pending or the socket is open.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug, Default)]
pub(crate) struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores `state`, returning the previous one.
    pub(crate) fn swap(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state.as_u8(), Ordering::AcqRel))
    }
}

/// Connection statistics (lock-free).
#[derive(Debug, Default)]
pub struct WsStats {
    messages_received: AtomicU64,
    messages_sent: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    decode_failures: AtomicU64,
    last_message_time: AtomicI64,
    last_ping_time: AtomicI64,
    last_pong_time: AtomicI64,
    connected_at: AtomicI64,
    reconnect_attempts: AtomicU32,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl WsStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received text frame.
    pub fn record_received(&self, bytes: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        self.last_message_time.store(now_millis(), Ordering::Relaxed);
    }

    /// Records a frame written to the socket.
    pub fn record_sent(&self, bytes: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a frame that could not be decoded.
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a heartbeat ping.
    pub fn record_ping(&self) {
        self.last_ping_time.store(now_millis(), Ordering::Relaxed);
    }

    /// Records a pong, either a protocol frame or a `pong` message.
    pub fn record_pong(&self) {
        self.last_pong_time.store(now_millis(), Ordering::Relaxed);
    }

    /// Records a successful open.
    pub fn record_connected(&self) {
        self.connected_at.store(now_millis(), Ordering::Relaxed);
    }

    /// Mirrors the reconnect policy's attempt counter.
    pub fn set_reconnect_attempts(&self, attempts: u32) {
        self.reconnect_attempts.store(attempts, Ordering::Relaxed);
    }

    /// Current consecutive reconnection attempts.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Creates an immutable snapshot of current statistics.
    pub fn snapshot(&self) -> WsStatsSnapshot {
        WsStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            last_message_time: self.last_message_time.load(Ordering::Relaxed),
            last_ping_time: self.last_ping_time.load(Ordering::Relaxed),
            last_pong_time: self.last_pong_time.load(Ordering::Relaxed),
            connected_at: self.connected_at.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of [`WsStats`]. Timestamps are Unix milliseconds, 0 if never set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsStatsSnapshot {
    /// Text frames received
    pub messages_received: u64,
    /// Frames sent
    pub messages_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Frames dropped because they failed to decode
    pub decode_failures: u64,
    /// Last received frame
    pub last_message_time: i64,
    /// Last heartbeat ping
    pub last_ping_time: i64,
    /// Last pong
    pub last_pong_time: i64,
    /// Last successful open
    pub connected_at: i64,
    /// Consecutive reconnection attempts
    pub reconnect_attempts: u32,
}
