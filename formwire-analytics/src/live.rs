//! Live analytics view for one form.
//!
//! [`LiveAnalytics`] fetches the form's aggregate over REST, then keeps it
//! current from `new_response` and `analytics_update` messages delivered by
//! a shared [`WsClient`]. Readers take immutable [`AnalyticsView`] snapshots.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use formwire_core::error::Result;
use formwire_core::types::{AnalyticsData, NewResponseData};
use formwire_core::ws_client::{
    ConnectionState, HandlerId, InboundMessage, MessageKind, WsClient, WsEvent,
};
use tracing::{debug, info, instrument, warn};

use crate::source::AnalyticsSource;

/// Callback for each response folded into the view.
pub type NewResponseCallback = Arc<dyn Fn(&NewResponseData) + Send + Sync>;

/// Callback for each replacement aggregate.
pub type AnalyticsUpdateCallback = Arc<dyn Fn(&AnalyticsData) + Send + Sync>;

/// Behaviour of a [`LiveAnalytics`].
#[derive(Clone)]
pub struct LiveAnalyticsOptions {
    /// Disconnect the client when the view disconnects. Leave unset when the
    /// client is shared with other views.
    pub owns_client: bool,
    /// [`LiveAnalytics::start`] also connects (default: true).
    pub auto_connect: bool,
    /// Invoked after a `new_response` has been applied.
    pub on_new_response: Option<NewResponseCallback>,
    /// Invoked after an `analytics_update` has been applied.
    pub on_analytics_update: Option<AnalyticsUpdateCallback>,
}

impl Default for LiveAnalyticsOptions {
    fn default() -> Self {
        Self {
            owns_client: false,
            auto_connect: true,
            on_new_response: None,
            on_analytics_update: None,
        }
    }
}

impl std::fmt::Debug for LiveAnalyticsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveAnalyticsOptions")
            .field("owns_client", &self.owns_client)
            .field("auto_connect", &self.auto_connect)
            .field("on_new_response", &self.on_new_response.is_some())
            .field("on_analytics_update", &self.on_analytics_update.is_some())
            .finish()
    }
}

impl LiveAnalyticsOptions {
    /// Marks the client as owned by the view.
    pub fn with_owned_client(mut self) -> Self {
        self.owns_client = true;
        self
    }

    /// Sets whether [`LiveAnalytics::start`] connects.
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Sets the new-response callback.
    pub fn on_new_response<F>(mut self, callback: F) -> Self
    where
        F: Fn(&NewResponseData) + Send + Sync + 'static,
    {
        self.on_new_response = Some(Arc::new(callback));
        self
    }

    /// Sets the analytics-update callback.
    pub fn on_analytics_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AnalyticsData) + Send + Sync + 'static,
    {
        self.on_analytics_update = Some(Arc::new(callback));
        self
    }
}

/// Immutable snapshot of a [`LiveAnalytics`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsView {
    /// Latest aggregate, `None` until the first fetch or update lands.
    pub analytics: Option<AnalyticsData>,
    /// A fetch is in flight.
    pub loading: bool,
    /// Message of the last failed fetch, else of the last socket failure
    /// not yet followed by a successful open.
    pub error: Option<String>,
    /// State of the underlying client. Reported as
    /// [`ConnectionState::Error`] while the client waits to reconnect after
    /// a socket failure.
    pub connection_state: ConnectionState,
    /// The underlying client is connected.
    pub is_connected: bool,
    /// Responses received since the last reset.
    pub new_responses_count: u64,
    /// Most recent response received.
    pub last_response: Option<NewResponseData>,
}

#[derive(Debug, Default)]
struct ViewState {
    analytics: Option<AnalyticsData>,
    loading: bool,
    error: Option<String>,
    socket_error: Option<String>,
    new_responses_count: u64,
    last_response: Option<NewResponseData>,
}

/// State reachable from message handlers.
struct Inner {
    form_id: RwLock<String>,
    view: RwLock<ViewState>,
    on_new_response: Option<NewResponseCallback>,
    on_analytics_update: Option<AnalyticsUpdateCallback>,
}

impl Inner {
    fn form_id(&self) -> String {
        self.form_id
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn is_tracking(&self, form_id: &str) -> bool {
        self.form_id.read().is_ok_and(|guard| *guard == form_id)
    }

    fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> Option<R> {
        self.view.write().ok().map(|mut guard| f(&mut guard))
    }

    fn apply_new_response(&self, form_id: &str, response: &NewResponseData) {
        if !self.is_tracking(form_id) {
            return;
        }
        let now = Utc::now();
        self.update(|view| {
            if let Some(analytics) = view.analytics.as_mut() {
                analytics.record_response(response, now);
            }
            view.last_response = Some(response.clone());
            view.new_responses_count += 1;
        });
        debug!(form_id, response_id = %response.id, "new response applied");

        if let Some(callback) = &self.on_new_response {
            callback(response);
        }
    }

    fn apply_connection_event(&self, event: &WsEvent) {
        match event {
            WsEvent::Error { message } => {
                warn!(error = %message, "live analytics lost its connection");
                self.update(|view| {
                    view.socket_error = Some(format!("WebSocket connection error: {message}"));
                });
            }
            WsEvent::Connected | WsEvent::Closed => {
                self.update(|view| view.socket_error = None);
            }
            _ => {}
        }
    }

    fn apply_analytics_update(&self, form_id: &str, analytics: &AnalyticsData) {
        if !self.is_tracking(form_id) {
            return;
        }
        self.update(|view| view.analytics = Some(analytics.clone()));
        debug!(form_id, total = analytics.total_responses, "analytics replaced");

        if let Some(callback) = &self.on_analytics_update {
            callback(analytics);
        }
    }
}

/// Live analytics of one form on top of a shared realtime client.
///
/// Several views may share one [`WsClient`]; each subscribes and
/// unsubscribes only its own form.
pub struct LiveAnalytics {
    client: Arc<WsClient>,
    source: Arc<dyn AnalyticsSource>,
    owns_client: bool,
    auto_connect: bool,
    inner: Arc<Inner>,
    /// Handler registrations while attached to the client.
    handlers: Mutex<Vec<HandlerId>>,
}

impl std::fmt::Debug for LiveAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveAnalytics")
            .field("form_id", &self.form_id())
            .field("owns_client", &self.owns_client)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl LiveAnalytics {
    /// Creates a view of `form_id`. Nothing is fetched or sent until
    /// [`start`](Self::start), [`connect`](Self::connect) or
    /// [`refresh_analytics`](Self::refresh_analytics).
    pub fn new(
        client: Arc<WsClient>,
        source: Arc<dyn AnalyticsSource>,
        form_id: impl Into<String>,
        options: LiveAnalyticsOptions,
    ) -> Self {
        Self {
            client,
            source,
            owns_client: options.owns_client,
            auto_connect: options.auto_connect,
            inner: Arc::new(Inner {
                form_id: RwLock::new(form_id.into()),
                view: RwLock::new(ViewState::default()),
                on_new_response: options.on_new_response,
                on_analytics_update: options.on_analytics_update,
            }),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Fetches the initial aggregate and, with `auto_connect`, connects.
    pub async fn start(&self) -> Result<()> {
        self.refresh_analytics().await;
        if self.auto_connect {
            self.connect()?;
        }
        Ok(())
    }

    /// Tracked form.
    pub fn form_id(&self) -> String {
        self.inner.form_id()
    }

    /// Underlying client.
    pub fn client(&self) -> &Arc<WsClient> {
        &self.client
    }

    fn is_attached(&self) -> bool {
        self.handlers.lock().is_ok_and(|handlers| !handlers.is_empty())
    }

    fn attach(&self, form_id: &str) {
        let Ok(mut handlers) = self.handlers.lock() else {
            return;
        };
        if !handlers.is_empty() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        handlers.push(self.client.on_topic(
            form_id,
            MessageKind::NewResponse,
            move |message: &InboundMessage| {
                if let InboundMessage::NewResponse { form_id, data, .. } = message {
                    inner.apply_new_response(form_id, data);
                }
            },
        ));
        let inner = Arc::clone(&self.inner);
        handlers.push(self.client.on_topic(
            form_id,
            MessageKind::AnalyticsUpdate,
            move |message: &InboundMessage| {
                if let InboundMessage::AnalyticsUpdate { form_id, data, .. } = message {
                    inner.apply_analytics_update(form_id, data);
                }
            },
        ));
        let inner = Arc::clone(&self.inner);
        handlers.push(
            self.client
                .add_event_listener(move |event: &WsEvent| inner.apply_connection_event(event)),
        );
    }

    fn detach(&self) {
        if let Ok(mut handlers) = self.handlers.lock() {
            for id in handlers.drain(..) {
                self.client.off(id);
            }
        }
        self.inner.update(|view| view.socket_error = None);
    }

    /// Subscribes the tracked form and connects the client.
    ///
    /// The subscription is registered before connecting, so the open
    /// replays it exactly once.
    #[instrument(name = "live_connect", skip(self), fields(form_id = %self.form_id()))]
    pub fn connect(&self) -> Result<()> {
        let form_id = self.form_id();
        self.attach(&form_id);
        self.client.subscribe(&form_id)?;
        if self.client.is_connected() {
            debug!("client already connected");
        } else {
            self.client.connect();
        }
        Ok(())
    }

    /// Unsubscribes the tracked form and drops this view's handlers. The
    /// client is disconnected only when the view owns it.
    #[instrument(name = "live_disconnect", skip(self), fields(form_id = %self.form_id()))]
    pub async fn disconnect(&self) {
        self.detach();
        self.client.unsubscribe(&self.form_id());
        if self.owns_client {
            self.client.disconnect().await;
        }
        info!("live analytics detached");
    }

    /// Re-fetches the aggregate. Failures are kept in
    /// [`AnalyticsView::error`]; a result for a form that is no longer
    /// tracked is discarded.
    #[instrument(name = "live_refresh", skip(self))]
    pub async fn refresh_analytics(&self) {
        let form_id = self.form_id();
        self.inner.update(|view| view.loading = true);

        let result = self.source.fetch(&form_id).await;
        if !self.inner.is_tracking(&form_id) {
            debug!(form_id = %form_id, "discarding analytics for a form no longer tracked");
            return;
        }

        match result {
            Ok(analytics) => {
                debug!(form_id = %form_id, total = analytics.total_responses, "analytics fetched");
                self.inner.update(|view| {
                    view.analytics = Some(analytics);
                    view.error = None;
                    view.loading = false;
                });
            }
            Err(err) => {
                warn!(form_id = %form_id, error = %err, "failed to fetch analytics");
                self.inner.update(|view| {
                    view.error = Some(err.to_string());
                    view.loading = false;
                });
            }
        }
    }

    /// Zeroes [`AnalyticsView::new_responses_count`].
    pub fn reset_new_responses_count(&self) {
        self.inner.update(|view| view.new_responses_count = 0);
    }

    /// Switches the tracked form.
    ///
    /// When attached, the old form is unsubscribed and the new one
    /// subscribed. The view is cleared and re-fetched.
    #[instrument(name = "live_set_form", skip(self, form_id))]
    pub async fn set_form_id(&self, form_id: impl Into<String>) -> Result<()> {
        let form_id = form_id.into();
        let previous = match self.inner.form_id.write() {
            Ok(mut guard) if *guard != form_id => std::mem::replace(&mut *guard, form_id.clone()),
            _ => return Ok(()),
        };
        info!(from = %previous, to = %form_id, "switching form");

        self.inner.update(|view| {
            *view = ViewState {
                socket_error: view.socket_error.take(),
                ..ViewState::default()
            };
        });
        if self.is_attached() {
            self.detach();
            self.client.unsubscribe(&previous);
            self.attach(&form_id);
            self.client.subscribe(&form_id)?;
        }

        self.refresh_analytics().await;
        Ok(())
    }

    /// Current view.
    pub fn snapshot(&self) -> AnalyticsView {
        let client_state = self.client.state();
        let view = self.inner.view.read();
        let (analytics, loading, error, socket_failed, new_responses_count, last_response) =
            match view {
                Ok(view) => (
                    view.analytics.clone(),
                    view.loading,
                    view.error.clone().or_else(|| view.socket_error.clone()),
                    view.socket_error.is_some(),
                    view.new_responses_count,
                    view.last_response.clone(),
                ),
                Err(_) => (None, false, None, false, 0, None),
            };
        let connection_state = if socket_failed && client_state == ConnectionState::Disconnected {
            ConnectionState::Error
        } else {
            client_state
        };
        AnalyticsView {
            analytics,
            loading,
            error,
            connection_state,
            is_connected: connection_state == ConnectionState::Connected,
            new_responses_count,
            last_response,
        }
    }
}
