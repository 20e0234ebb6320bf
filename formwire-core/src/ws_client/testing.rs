//! Scripted in-memory transport for exercising the client without a server.
//!
//! ```
//! # async fn demo() {
//! use std::sync::Arc;
//! use formwire_core::ws_client::{WsClient, WsConfig};
//! use formwire_core::ws_client::testing::MockConnector;
//!
//! let connector = Arc::new(MockConnector::new());
//! let mut peer = connector.accept_next();
//! let client = WsClient::with_connector(WsConfig::default(), connector.clone());
//! client.subscribe("form-1").unwrap();
//! client.connect();
//! assert_eq!(
//!     peer.next_frame().await.as_deref(),
//!     Some(r#"{"type":"subscribe","formId":"form-1"}"#)
//! );
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{sink, stream};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use super::WsClient;
use super::dispatch::HandlerId;
use super::error::WsError;
use super::event::WsEvent;
use super::transport::{Connection, Connector, TransportEvent};
use crate::error::{Error, NetworkError, Result};

enum Outcome {
    Accept(Connection),
    Refuse(String),
    Hang,
}

/// A [`Connector`] that plays back scripted handshake outcomes in order.
///
/// Once the script runs out every handshake is refused.
#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: AtomicUsize,
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

impl MockConnector {
    /// Creates a connector with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, outcome: Outcome) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// Scripts a successful handshake and returns the server side of it.
    pub fn accept_next(&self) -> MockPeer {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();

        let sink = sink::unfold(frames_tx, |tx, frame: String| async move {
            tx.send(frame)
                .map_err(|_| Error::from(NetworkError::ConnectionFailed("peer gone".into())))?;
            Ok::<_, Error>(tx)
        });
        let stream = stream::unfold(events_rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        self.push(Outcome::Accept(Connection::new(sink, stream)));
        MockPeer {
            frames: frames_rx,
            events: events_tx,
        }
    }

    /// Scripts a successful handshake whose socket never finishes a write,
    /// as with a peer that stopped reading. Inbound events still flow.
    pub fn accept_stalled_next(&self) -> MockPeer {
        let (_, frames_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();

        let sink = sink::unfold((), |(), _frame: String| std::future::pending::<Result<()>>());
        let stream = stream::unfold(events_rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        self.push(Outcome::Accept(Connection::new(sink, stream)));
        MockPeer {
            frames: frames_rx,
            events: events_tx,
        }
    }

    /// Scripts a refused handshake.
    pub fn refuse_next(&self, reason: impl Into<String>) {
        self.push(Outcome::Refuse(reason.into()));
    }

    /// Scripts `count` refused handshakes.
    pub fn refuse_times(&self, count: usize) {
        for _ in 0..count {
            self.refuse_next("connection refused");
        }
    }

    /// Scripts a handshake that never completes.
    pub fn hang_next(&self) {
        self.push(Outcome::Hang);
    }

    /// Handshakes attempted so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<Connection> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        match outcome {
            Some(Outcome::Accept(connection)) => Ok(connection),
            Some(Outcome::Refuse(reason)) => Err(NetworkError::ConnectionFailed(reason).into()),
            Some(Outcome::Hang) => std::future::pending().await,
            None => Err(NetworkError::ConnectionFailed("no scripted outcome".into()).into()),
        }
    }
}

/// Server side of a scripted connection.
///
/// Dropping the peer closes the socket from the server side.
#[derive(Debug)]
pub struct MockPeer {
    frames: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockPeer {
    /// Waits for the next frame written by the client. `None` once the
    /// client dropped the connection.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Returns every frame written so far without waiting.
    pub fn drain_frames(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.frames.try_recv().ok()).collect()
    }

    /// Returns every frame written so far, parsed as JSON.
    pub fn drain_json(&mut self) -> Vec<Value> {
        self.drain_frames()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Pushes a text frame to the client.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Text(text.into()));
    }

    /// Pushes a JSON frame to the client.
    pub fn send_json(&self, value: &Value) {
        self.send_text(value.to_string());
    }

    /// Pushes a protocol pong.
    pub fn send_pong(&self) {
        let _ = self.events.send(TransportEvent::Pong);
    }

    /// Closes the socket from the server side.
    pub fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Fails the transport.
    pub fn fail(&self, message: impl Into<String>) {
        let _ = self
            .events
            .send(TransportEvent::Error(WsError::transient(message)));
    }

    /// `true` once the client has dropped its side of the connection.
    pub fn is_client_gone(&self) -> bool {
        self.events.is_closed()
    }
}

/// Records the lifecycle events of a client into a channel.
///
/// The recording ends when the client disconnects, which drops listeners.
#[derive(Debug)]
pub struct EventProbe {
    events: mpsc::UnboundedReceiver<WsEvent>,
    id: HandlerId,
}

impl EventProbe {
    /// Starts recording `client`'s events.
    pub fn attach(client: &WsClient) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let id = client.add_event_listener(move |event: &WsEvent| {
            let _ = tx.send(event.clone());
        });
        Self { events, id }
    }

    /// Listener id, for removing the probe with [`WsClient::off`].
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> Option<WsEvent> {
        self.events.recv().await
    }

    /// Skips events until one matches `predicate`.
    pub async fn wait_for(&mut self, predicate: impl Fn(&WsEvent) -> bool) -> Option<WsEvent> {
        while let Some(event) = self.events.recv().await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Returns the events recorded so far without waiting.
    pub fn drain(&mut self) -> Vec<WsEvent> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }
}
