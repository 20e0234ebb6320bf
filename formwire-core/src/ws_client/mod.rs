//! Realtime subscription client.
//!
//! [`WsClient`] owns one WebSocket to the analytics hub. It keeps a set of
//! subscribed forms that is replayed on every open, pings the server while
//! connected, reconnects with exponential backoff after unexpected closes
//! and fans decoded messages out to registered handlers.
//!
//! All socket work happens on a driver task spawned by the constructor.
//! Public methods only enqueue commands, and handlers run on the driver in
//! frame order, one at a time.

mod config;
mod dispatch;
mod error;
mod event;
mod heartbeat;
mod message;
mod reconnect;
mod state;
mod subscription;
mod transport;

#[cfg(any(test, feature = "test-utils", debug_assertions))]
pub mod testing;

pub use config::{
    BackoffConfig, BackoffStrategy, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_MAX_SUBSCRIPTIONS,
    DEFAULT_WRITE_TIMEOUT, DEFAULT_WS_PATH, DEFAULT_WS_PORT, WS_URL_ENV, WsConfig, resolve_ws_url,
};
pub use dispatch::{EventKey, HandlerId, HandlerRegistry, MessageHandler};
pub use error::{WsError, WsErrorKind};
pub use event::{WsEvent, WsEventCallback};
pub use heartbeat::Heartbeat;
pub use message::{InboundMessage, MessageKind, OutboundMessage};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use state::{ConnectionState, WsStats, WsStatsSnapshot};
pub use subscription::{Subscription, SubscriptionRegistry};
pub use transport::{Connection, Connector, EventStream, FrameSink, TransportEvent, TungsteniteConnector};

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Sleep, sleep};
use tracing::{Instrument, debug, error, info, info_span, instrument, trace, warn};

use crate::error::{Error, Result, truncate_message};
use state::AtomicConnectionState;

/// Longest frame excerpt logged for undecodable frames.
const FRAME_PREVIEW_LEN: usize = 120;

enum Command {
    Connect,
    Disconnect { done: oneshot::Sender<()> },
    Subscribe(String),
    Unsubscribe(String),
    Send(OutboundMessage),
}

/// State shared between the handle and the driver.
struct Shared {
    state: AtomicConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    subscriptions: SubscriptionRegistry,
    handlers: HandlerRegistry,
    stats: WsStats,
}

/// Reconnecting WebSocket client for the analytics hub.
///
/// Construct once and share through `Arc`. Dropping the last handle stops
/// the driver and closes the socket.
pub struct WsClient {
    config: WsConfig,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("url", &self.config.url)
            .field("state", &self.state())
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

impl WsClient {
    /// Creates a client using the `tokio-tungstenite` transport.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(config: WsConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector::new()))
    }

    /// Creates a client with a custom transport.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_connector(config: WsConfig, connector: Arc<dyn Connector>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            state: AtomicConnectionState::default(),
            state_tx,
            subscriptions: SubscriptionRegistry::new(config.max_subscriptions),
            handlers: HandlerRegistry::new(),
            stats: WsStats::new(),
        });
        let (commands, command_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            policy: ReconnectPolicy::new(config.backoff_config.clone(), config.max_reconnect_attempts),
            heartbeat: Heartbeat::new(config.ping_interval()),
            config: config.clone(),
            shared: Arc::clone(&shared),
            connector,
            commands: command_rx,
            handshake: None,
            connection: None,
            reconnect_timer: None,
            delivered: HashSet::new(),
        };
        let span = info_span!("ws_driver", url = %config.url);
        tokio::spawn(driver.run().instrument(span));

        Self {
            config,
            shared,
            commands,
        }
    }

    fn enqueue(&self, command: Command) {
        if self.commands.send(command).is_err() {
            error!("WebSocket driver is gone; command dropped");
        }
    }

    /// Opens the socket.
    ///
    /// No-op while connecting or connected. Cancels a pending reconnect
    /// timer. Progress is reported through lifecycle events.
    #[instrument(name = "ws_connect", skip(self), fields(url = %self.config.url))]
    pub fn connect(&self) {
        self.enqueue(Command::Connect);
    }

    /// Closes the socket and forgets every subscription and handler.
    ///
    /// Pending reconnects are cancelled and no reconnect follows. Succeeds
    /// from any state and returns once the driver has finished closing.
    #[instrument(name = "ws_disconnect", skip(self))]
    pub async fn disconnect(&self) {
        self.shared.subscriptions.clear();
        let (done, finished) = oneshot::channel();
        self.enqueue(Command::Disconnect { done });
        let _ = finished.await;
        info!("WebSocket disconnected");
    }

    /// Adds `form_id` to the subscription set.
    ///
    /// The `subscribe` frame is sent immediately when connected, otherwise
    /// on the next open. Subscribing twice sends a single frame.
    #[instrument(name = "ws_subscribe", skip(self), fields(form_id = %form_id))]
    pub fn subscribe(&self, form_id: &str) -> Result<()> {
        if form_id.trim().is_empty() {
            return Err(Error::invalid_request("form id must not be empty"));
        }
        if self.shared.subscriptions.try_add(form_id)? {
            debug!(count = self.shared.subscriptions.count(), "subscription added");
        }
        self.enqueue(Command::Subscribe(form_id.to_string()));
        Ok(())
    }

    /// Removes `form_id` from the subscription set, returning whether it
    /// was subscribed. The server is only told when the topic had been
    /// delivered on the current connection.
    #[instrument(name = "ws_unsubscribe", skip(self), fields(form_id = %form_id))]
    pub fn unsubscribe(&self, form_id: &str) -> bool {
        let removed = self.shared.subscriptions.remove(form_id).is_some();
        if removed {
            self.enqueue(Command::Unsubscribe(form_id.to_string()));
        }
        removed
    }

    /// Sends a control frame. Fails when the socket is not open.
    pub fn send(&self, message: OutboundMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::network(format!(
                "cannot send {}: not connected",
                message.kind()
            )));
        }
        self.enqueue(Command::Send(message));
        Ok(())
    }

    /// Registers a handler for `key`.
    pub fn on(&self, key: EventKey, handler: MessageHandler) -> HandlerId {
        debug!(key = %key, "handler registered");
        self.shared.handlers.on(key, handler)
    }

    /// Registers a handler for every message of `kind`.
    pub fn on_kind<F>(&self, kind: MessageKind, handler: F) -> HandlerId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.on(EventKey::Kind(kind), Arc::new(handler))
    }

    /// Registers a handler for messages of `kind` about `form_id`.
    pub fn on_topic<F>(&self, form_id: &str, kind: MessageKind, handler: F) -> HandlerId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.on(EventKey::topic(form_id, kind), Arc::new(handler))
    }

    /// Removes a handler or listener. Returns `false` if it was already gone.
    pub fn off(&self, id: HandlerId) -> bool {
        self.shared.handlers.off(id)
    }

    /// Sets the handler that sees every message before keyed handlers.
    pub fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.shared.handlers.set_message_handler(Arc::new(handler));
    }

    /// Removes the global message handler.
    pub fn clear_message_handler(&self) {
        self.shared.handlers.clear_message_handler();
    }

    /// Registers a lifecycle listener; remove it with [`off`](Self::off).
    pub fn add_event_listener<F>(&self, listener: F) -> HandlerId
    where
        F: Fn(&WsEvent) + Send + Sync + 'static,
    {
        self.shared.handlers.add_event_listener(Arc::new(listener))
    }

    /// Current connection state.
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    /// `true` while the socket is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watches state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.stats.reconnect_attempts()
    }

    /// `true` if `form_id` is in the subscription set.
    pub fn is_subscribed(&self, form_id: &str) -> bool {
        self.shared.subscriptions.contains(form_id)
    }

    /// Number of subscribed forms.
    pub fn subscription_count(&self) -> usize {
        self.shared.subscriptions.count()
    }

    /// Forms that can still be subscribed.
    pub fn remaining_capacity(&self) -> usize {
        self.shared.subscriptions.remaining_capacity()
    }

    /// Subscribed forms in subscription order.
    pub fn subscribed_topics(&self) -> Vec<String> {
        self.shared.subscriptions.topics()
    }

    /// Snapshot of connection statistics.
    pub fn stats(&self) -> WsStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Milliseconds between the last ping and the pong that followed it.
    pub fn latency(&self) -> Option<i64> {
        let stats = self.stats();
        (stats.last_ping_time > 0 && stats.last_pong_time >= stats.last_ping_time)
            .then(|| stats.last_pong_time - stats.last_ping_time)
    }

    /// Client configuration.
    #[inline]
    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}

/// Event loop owning the socket, the timers and the policy.
struct Driver {
    config: WsConfig,
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    policy: ReconnectPolicy,
    heartbeat: Heartbeat,
    handshake: Option<BoxFuture<'static, Result<Connection>>>,
    connection: Option<Connection>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    /// Topics sent as `subscribe` on the current connection.
    delivered: HashSet<String>,
}

impl Driver {
    async fn run(mut self) {
        debug!("WebSocket driver started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                result = handshake_done(&mut self.handshake) => {
                    self.handshake = None;
                    match result {
                        Ok(connection) => self.on_open(connection).await,
                        Err(err) => self.on_handshake_failed(&err),
                    }
                }
                event = next_event(&mut self.connection) => self.on_transport_event(event).await,
                () = timer_fired(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    debug!(attempt = self.policy.attempts(), "reconnect timer fired");
                    self.start_connect();
                }
                () = self.heartbeat.tick() => self.on_heartbeat().await,
            }
        }

        self.close_socket().await;
        debug!("WebSocket driver stopped");
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.shared.state.swap(state);
        if previous != state {
            trace!(from = %previous, to = %state, "state transition");
            self.shared.state_tx.send_replace(state);
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    fn emit(&self, event: WsEvent) {
        trace!(event = %event, "lifecycle event");
        self.shared.handlers.emit(&event);
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.start_connect(),
            Command::Disconnect { done } => {
                self.shutdown().await;
                let _ = done.send(());
            }
            Command::Subscribe(form_id) => {
                if self.state() == ConnectionState::Connected
                    && self.shared.subscriptions.contains(&form_id)
                    && !self.delivered.contains(&form_id)
                {
                    self.deliver_subscribe(form_id).await;
                }
            }
            Command::Unsubscribe(form_id) => {
                if self.state() == ConnectionState::Connected && self.delivered.remove(&form_id) {
                    if let Err(err) = self.send_frame(&OutboundMessage::unsubscribe(&form_id)).await {
                        warn!(form_id = %form_id, error = %err, "failed to send unsubscribe");
                    }
                }
            }
            Command::Send(message) => {
                if let Err(err) = self.send_frame(&message).await {
                    warn!(kind = %message.kind(), error = %err, "failed to send frame");
                }
            }
        }
    }

    fn start_connect(&mut self) {
        let state = self.state();
        if state.is_active() {
            debug!(state = %state, "connect ignored");
            return;
        }
        self.reconnect_timer = None;
        self.set_state(ConnectionState::Connecting);
        self.emit(WsEvent::Connecting);
        info!(url = %self.config.url, "connecting");

        let connector = Arc::clone(&self.connector);
        let url = self.config.url.clone();
        let timeout = self.config.connect_timeout();
        self.handshake = Some(Box::pin(async move {
            match tokio::time::timeout(timeout, connector.connect(&url)).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(format!(
                    "handshake did not complete within {}ms",
                    timeout.as_millis()
                ))),
            }
        }));
    }

    async fn on_open(&mut self, connection: Connection) {
        self.connection = Some(connection);
        self.reconnect_timer = None;
        self.policy.reset();
        self.shared.stats.set_reconnect_attempts(0);
        self.shared.stats.record_connected();
        self.set_state(ConnectionState::Connected);
        self.heartbeat.start();
        self.delivered.clear();

        let mut restored = 0;
        for form_id in self.shared.subscriptions.topics() {
            if self.deliver_subscribe(form_id).await {
                restored += 1;
            }
            if self.connection.is_none() {
                // a stalled or broken write already failed the connection
                return;
            }
        }
        info!(subscriptions = restored, "WebSocket connected");
        self.emit(WsEvent::Connected);
        self.emit(WsEvent::SubscriptionRestored { count: restored });
    }

    fn on_handshake_failed(&mut self, err: &Error) {
        let classified = WsError::from_error(err);
        if classified.is_permanent() {
            error!(error = %err, "WebSocket handshake failed; check the endpoint configuration");
        } else {
            warn!(error = %err, kind = %classified.kind(), "WebSocket handshake failed");
        }
        self.fail(classified);
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Text(text) => self.on_text(&text),
            TransportEvent::Pong => self.shared.stats.record_pong(),
            TransportEvent::Error(err) => {
                warn!(error = %err, "WebSocket transport error");
                self.fail(err);
            }
            TransportEvent::Closed => {
                info!("WebSocket closed by peer");
                self.on_unexpected_close();
            }
        }
    }

    fn on_text(&self, text: &str) {
        self.shared.stats.record_received(text.len() as u64);
        match InboundMessage::decode(text) {
            Ok(message) => {
                if message.kind() == MessageKind::Pong {
                    self.shared.stats.record_pong();
                }
                let delivered = self.shared.handlers.dispatch(&message);
                trace!(kind = %message.kind(), handlers = delivered, "message dispatched");
            }
            Err(err) => {
                self.shared.stats.record_decode_failure();
                warn!(
                    error = %err,
                    frame = %preview(text),
                    "dropping undecodable frame"
                );
            }
        }
    }

    async fn on_heartbeat(&mut self) {
        self.shared.stats.record_ping();
        if let Err(err) = self.send_frame(&OutboundMessage::Ping).await {
            warn!(error = %err, "heartbeat ping failed");
        }
    }

    /// Transport failure: report it, then treat it as a close.
    fn fail(&mut self, err: WsError) {
        self.set_state(ConnectionState::Error);
        self.emit(WsEvent::Error {
            message: err.to_string(),
        });
        self.on_unexpected_close();
    }

    fn on_unexpected_close(&mut self) {
        self.connection = None;
        self.heartbeat.stop();
        self.delivered.clear();
        self.set_state(ConnectionState::Disconnected);
        self.emit(WsEvent::Disconnected);

        if !self.config.auto_reconnect {
            info!("auto reconnect disabled; staying disconnected");
            return;
        }

        match self.policy.decide() {
            ReconnectDecision::Retry { attempt, delay } => {
                self.shared.stats.set_reconnect_attempts(attempt);
                info!(
                    attempt,
                    max_attempts = self.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                self.reconnect_timer = Some(Box::pin(sleep(delay)));
                self.emit(WsEvent::Reconnecting { attempt, delay });
            }
            ReconnectDecision::Exhausted { total_attempts } => {
                error!(total_attempts, "reconnect attempts exhausted");
                self.emit(WsEvent::ReconnectExhausted { total_attempts });
            }
        }
    }

    async fn shutdown(&mut self) {
        self.reconnect_timer = None;
        self.handshake = None;
        self.heartbeat.stop();
        self.set_state(ConnectionState::Closing);
        self.close_socket().await;
        self.delivered.clear();
        self.set_state(ConnectionState::Closed);
        self.emit(WsEvent::Closed);
        self.shared.handlers.clear();
    }

    async fn close_socket(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            match tokio::time::timeout(self.config.write_timeout(), connection.sink.close()).await {
                Ok(Ok(())) => debug!("close handshake sent"),
                Ok(Err(err)) => debug!(error = %err, "close handshake failed"),
                Err(_) => debug!("close handshake timed out"),
            }
        }
    }

    /// Sends `subscribe` for `form_id` and marks it delivered. Returns
    /// whether the frame was written.
    async fn deliver_subscribe(&mut self, form_id: String) -> bool {
        match self.send_frame(&OutboundMessage::subscribe(&form_id)).await {
            Ok(()) => {
                debug!(form_id = %form_id, "subscribe sent");
                self.delivered.insert(form_id);
                true
            }
            Err(err) => {
                warn!(form_id = %form_id, error = %err, "failed to send subscribe");
                false
            }
        }
    }

    /// Writes one frame, bounded by the write timeout. A failed or stalled
    /// write fails the connection.
    async fn send_frame(&mut self, message: &OutboundMessage) -> Result<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(Error::network("not connected"));
        };
        let text = message.encode()?;
        let len = text.len() as u64;
        let limit = self.config.write_timeout();
        let written = match tokio::time::timeout(limit, connection.sink.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "write did not complete within {}ms",
                limit.as_millis()
            ))),
        };
        match written {
            Ok(()) => {
                self.shared.stats.record_sent(len);
                Ok(())
            }
            Err(err) => {
                warn!(kind = %message.kind(), error = %err, "WebSocket write failed");
                self.fail(WsError::from_error(&err));
                Err(err)
            }
        }
    }
}

async fn handshake_done(handshake: &mut Option<BoxFuture<'static, Result<Connection>>>) -> Result<Connection> {
    match handshake.as_mut() {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_event(connection: &mut Option<Connection>) -> TransportEvent {
    match connection.as_mut() {
        Some(connection) => connection
            .stream
            .next()
            .await
            .unwrap_or(TransportEvent::Closed),
        None => std::future::pending().await,
    }
}

async fn timer_fired(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

fn preview(text: &str) -> String {
    let mut cut = text.len().min(FRAME_PREVIEW_LEN);
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut < text.len() {
        truncate_message(format!("{}...", &text[..cut]))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{EventProbe, MockConnector};
    use super::*;
    use std::time::Duration;

    fn config() -> WsConfig {
        WsConfig::new("ws://localhost:8080/api/v1/ws")
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(100);
        let shown = preview(&text);
        assert!(shown.ends_with("..."));
        assert!(shown.len() <= FRAME_PREVIEW_LEN + 3);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_new_client_is_disconnected() {
        let client = WsClient::with_connector(config(), Arc::new(MockConnector::new()));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_validates_and_tracks() {
        let mut cfg = config();
        cfg.max_subscriptions = 1;
        let client = WsClient::with_connector(cfg, Arc::new(MockConnector::new()));

        assert!(client.subscribe("").is_err());
        client.subscribe("f1").unwrap();
        client.subscribe("f1").unwrap();
        assert_eq!(client.subscription_count(), 1);
        assert!(client.subscribe("f2").unwrap_err().as_resource_exhausted().is_some());

        assert!(client.unsubscribe("f1"));
        assert!(!client.unsubscribe("f1"));
        assert_eq!(client.remaining_capacity(), 1);
    }

    #[tokio::test]
    async fn test_send_refused_when_disconnected() {
        let client = WsClient::with_connector(config(), Arc::new(MockConnector::new()));
        let err = client.send(OutboundMessage::Ping).unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_replays_and_emits_events() {
        let connector = Arc::new(MockConnector::new());
        let mut peer = connector.accept_next();
        let client = WsClient::with_connector(config(), connector.clone());
        let mut probe = EventProbe::attach(&client);

        client.subscribe("f1").unwrap();
        client.subscribe("f2").unwrap();
        client.connect();

        assert_eq!(probe.next().await, Some(WsEvent::Connecting));
        assert_eq!(probe.next().await, Some(WsEvent::Connected));
        assert_eq!(
            probe.next().await,
            Some(WsEvent::SubscriptionRestored { count: 2 })
        );
        assert_eq!(
            peer.drain_frames(),
            vec![
                r#"{"type":"subscribe","formId":"f1"}"#,
                r#"{"type":"subscribe","formId":"f2"}"#,
            ]
        );
        assert_eq!(client.stats().messages_sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_pings_while_connected() {
        let connector = Arc::new(MockConnector::new());
        let mut peer = connector.accept_next();
        let client = WsClient::with_connector(
            config().with_ping_interval(Duration::from_secs(30)),
            connector.clone(),
        );
        client.connect();

        assert_eq!(peer.next_frame().await.as_deref(), Some(r#"{"type":"ping"}"#));
        assert_eq!(peer.next_frame().await.as_deref(), Some(r#"{"type":"ping"}"#));
        assert!(client.stats().last_ping_time > 0);

        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(peer.next_frame().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_schedules_reconnect() {
        let connector = Arc::new(MockConnector::new());
        connector.hang_next();
        let client = WsClient::with_connector(
            config().with_connect_timeout(Duration::from_secs(2)),
            connector.clone(),
        );
        let mut probe = EventProbe::attach(&client);
        client.connect();

        let error = probe.wait_for(|e| matches!(e, WsEvent::Error { .. })).await;
        assert!(matches!(error, Some(WsEvent::Error { message }) if message.contains("handshake")));
        assert_eq!(probe.next().await, Some(WsEvent::Disconnected));
        assert_eq!(
            probe.next().await,
            Some(WsEvent::Reconnecting {
                attempt: 1,
                delay: Duration::from_secs(5)
            })
        );
        assert_eq!(client.reconnect_attempts(), 1);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_frame_recorded() {
        let connector = Arc::new(MockConnector::new());
        let peer = connector.accept_next();
        let client = WsClient::with_connector(config(), connector.clone());
        let mut probe = EventProbe::attach(&client);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on_kind(MessageKind::Pong, move |message: &InboundMessage| {
            let _ = tx.send(message.kind());
        });

        client.connect();
        probe.wait_for(WsEvent::is_connected).await;
        peer.send_text(r#"{"type":"pong","data":null,"timestamp":"2024-01-15T10:30:00Z"}"#);

        assert_eq!(rx.recv().await, Some(MessageKind::Pong));
        assert!(client.stats().last_pong_time > 0);
    }
}
