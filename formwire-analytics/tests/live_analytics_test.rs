//! LiveAnalytics integration tests.
//!
//! Test coverage:
//! - `new_response` folding and callbacks
//! - `analytics_update` replacement
//! - Form switching and stale fetch results
//! - Fetch error reporting
//! - Socket failures surfaced in the view until the next open
//! - Shared client ownership on disconnect

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use formwire_analytics::{AnalyticsSource, LiveAnalytics, LiveAnalyticsOptions};
use formwire_core::error::{Error, Result};
use formwire_core::types::{AnalyticsData, NewResponseData, ResponseSummary};
use formwire_core::ws_client::testing::{EventProbe, MockConnector, MockPeer};
use formwire_core::ws_client::{ConnectionState, WsClient, WsConfig, WsEvent};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

// ============================================================================
// Fixtures
// ============================================================================

/// In-memory analytics source with optional per-form gates.
#[derive(Default)]
struct FakeSource {
    data: Mutex<HashMap<String, AnalyticsData>>,
    failure: Mutex<Option<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn with(entries: &[AnalyticsData]) -> Arc<Self> {
        let source = Self::default();
        for entry in entries {
            source.put(entry.clone());
        }
        Arc::new(source)
    }

    fn put(&self, analytics: AnalyticsData) {
        self.data
            .lock()
            .unwrap()
            .insert(analytics.form_id.clone(), analytics);
    }

    fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    /// Holds the next fetch of `form_id` until the returned handle is notified.
    fn gate(&self, form_id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(form_id.to_string(), Arc::clone(&notify));
        notify
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyticsSource for FakeSource {
    async fn fetch(&self, form_id: &str) -> Result<AnalyticsData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(form_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::request_failed(500, message));
        }
        self.data
            .lock()
            .unwrap()
            .get(form_id)
            .cloned()
            .ok_or_else(|| Error::request_failed(404, "form not found"))
    }
}

fn summary(id: &str) -> ResponseSummary {
    ResponseSummary {
        id: id.to_string(),
        submitted_at: Utc.with_ymd_and_hms(2024, 1, 14, 9, 0, 0).unwrap(),
        device: "desktop".into(),
        location: "Berlin".into(),
        response_data: HashMap::new(),
    }
}

fn analytics(form_id: &str, total: u64) -> AnalyticsData {
    AnalyticsData {
        form_id: form_id.to_string(),
        total_responses: total,
        today_responses: 2,
        week_responses: 5,
        month_responses: 8,
        recent_responses: (0..10).map(|i| summary(&format!("old-{i}"))).collect(),
        last_updated: Utc.with_ymd_and_hms(2024, 1, 14, 9, 0, 0).unwrap(),
        ..AnalyticsData::default()
    }
}

fn new_response_frame(form_id: &str, id: &str) -> serde_json::Value {
    json!({
        "type": "new_response",
        "formId": form_id,
        "data": {
            "id": id,
            "formId": form_id,
            "submittedAt": "2024-01-15T10:30:00Z",
            "data": {"rating": 5},
            "device": "mobile"
        },
        "timestamp": "2024-01-15T10:30:00Z"
    })
}

fn config() -> WsConfig {
    WsConfig::new("ws://localhost:8080/api/v1/ws").with_ping_interval(Duration::ZERO)
}

struct Harness {
    client: Arc<WsClient>,
    connector: Arc<MockConnector>,
    peer: MockPeer,
    probe: EventProbe,
}

fn harness() -> Harness {
    let connector = Arc::new(MockConnector::new());
    let peer = connector.accept_next();
    let client = Arc::new(WsClient::with_connector(config(), connector.clone()));
    let probe = EventProbe::attach(&client);
    Harness {
        client,
        connector,
        peer,
        probe,
    }
}

async fn wait_connected(probe: &mut EventProbe) {
    probe
        .wait_for(|e| matches!(e, WsEvent::SubscriptionRestored { .. }))
        .await
        .expect("client should connect");
}

// ============================================================================
// Message handling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_new_response_updates_counters_and_recent_list() {
    let mut h = harness();
    let source = FakeSource::with(&[analytics("f1", 10)]);
    let (tx, mut rx) = mpsc::unbounded_channel::<NewResponseData>();
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f1",
        LiveAnalyticsOptions::default().on_new_response(move |response: &NewResponseData| {
            let _ = tx.send(response.clone());
        }),
    );

    live.start().await.unwrap();
    wait_connected(&mut h.probe).await;
    assert_eq!(
        h.peer.drain_frames(),
        vec![r#"{"type":"subscribe","formId":"f1"}"#.to_string()]
    );

    h.peer.send_json(&new_response_frame("other", "ignored"));
    h.peer.send_json(&new_response_frame("f1", "r-new"));
    let delivered = rx.recv().await.unwrap();
    assert_eq!(delivered.id, "r-new");

    let view = live.snapshot();
    let data = view.analytics.unwrap();
    assert_eq!(data.total_responses, 11);
    assert_eq!(data.today_responses, 3);
    assert_eq!(data.week_responses, 6);
    assert_eq!(data.month_responses, 9);
    assert_eq!(data.recent_responses.len(), 10);
    assert_eq!(data.recent_responses[0].id, "r-new");
    assert_eq!(data.recent_responses[0].location, "Unknown");
    assert_eq!(data.recent_responses[9].id, "old-8");
    assert!(data.last_updated > Utc.with_ymd_and_hms(2024, 1, 14, 9, 0, 0).unwrap());
    assert_eq!(view.new_responses_count, 1);
    assert_eq!(view.last_response.map(|r| r.id), Some("r-new".to_string()));
    assert!(view.is_connected);
    assert!(rx.try_recv().is_err());

    live.reset_new_responses_count();
    assert_eq!(live.snapshot().new_responses_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_analytics_update_replaces_snapshot() {
    let mut h = harness();
    let source = FakeSource::with(&[analytics("f1", 10)]);
    let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f1",
        LiveAnalyticsOptions::default().on_analytics_update(move |data: &AnalyticsData| {
            let _ = tx.send(data.total_responses);
        }),
    );
    live.start().await.unwrap();
    wait_connected(&mut h.probe).await;

    let mut replacement = analytics("f1", 42);
    replacement.recent_responses.clear();
    h.peer.send_json(&json!({
        "type": "analytics_update",
        "formId": "f1",
        "data": replacement.clone(),
        "timestamp": "2024-01-15T10:30:00Z"
    }));

    assert_eq!(rx.recv().await, Some(42));
    let view = live.snapshot();
    assert_eq!(view.analytics, Some(replacement));
    assert_eq!(view.new_responses_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_response_before_fetch_counts_only() {
    let mut h = harness();
    let source = FakeSource::with(&[]);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f1",
        LiveAnalyticsOptions::default().on_new_response(move |r: &NewResponseData| {
            let _ = tx.send(r.id.clone());
        }),
    );
    live.connect().unwrap();
    wait_connected(&mut h.probe).await;

    h.peer.send_json(&new_response_frame("f1", "r1"));
    assert_eq!(rx.recv().await.as_deref(), Some("r1"));

    let view = live.snapshot();
    assert!(view.analytics.is_none());
    assert_eq!(view.new_responses_count, 1);
}

// ============================================================================
// Fetching and form switching
// ============================================================================

#[tokio::test]
async fn test_fetch_error_is_stored_then_cleared() {
    let h = harness();
    let source = FakeSource::with(&[analytics("f1", 3)]);
    source.fail_with(Some("backend down"));
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source.clone(),
        "f1",
        LiveAnalyticsOptions::default().with_auto_connect(false),
    );

    live.start().await.unwrap();
    let view = live.snapshot();
    assert!(view.error.unwrap().contains("backend down"));
    assert!(!view.loading);
    assert!(view.analytics.is_none());
    assert_eq!(h.connector.attempts(), 0);

    source.fail_with(None);
    live.refresh_analytics().await;
    let view = live.snapshot();
    assert_eq!(view.error, None);
    assert_eq!(view.analytics.map(|a| a.total_responses), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_set_form_id_moves_subscription() {
    let mut h = harness();
    let source = FakeSource::with(&[analytics("f1", 10), analytics("f2", 20)]);
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f1",
        LiveAnalyticsOptions::default(),
    );
    live.start().await.unwrap();
    wait_connected(&mut h.probe).await;
    h.peer.drain_frames();

    h.peer.send_json(&new_response_frame("f1", "r1"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(live.snapshot().new_responses_count, 1);

    live.set_form_id("f2").await.unwrap();
    assert_eq!(
        h.peer.next_frame().await.as_deref(),
        Some(r#"{"type":"unsubscribe","formId":"f1"}"#)
    );
    assert_eq!(
        h.peer.next_frame().await.as_deref(),
        Some(r#"{"type":"subscribe","formId":"f2"}"#)
    );

    let view = live.snapshot();
    assert_eq!(live.form_id(), "f2");
    assert_eq!(view.analytics.map(|a| a.total_responses), Some(20));
    assert_eq!(view.new_responses_count, 0);
    assert!(view.last_response.is_none());

    h.peer.send_json(&new_response_frame("f1", "late"));
    h.peer.send_json(&new_response_frame("f2", "r2"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let view = live.snapshot();
    assert_eq!(view.new_responses_count, 1);
    assert_eq!(view.last_response.map(|r| r.id), Some("r2".to_string()));
    assert_eq!(h.client.subscribed_topics(), vec!["f2".to_string()]);
}

#[tokio::test]
async fn test_stale_fetch_is_discarded() {
    let h = harness();
    let source = FakeSource::with(&[analytics("f1", 10), analytics("f2", 20)]);
    let release = source.gate("f1");
    let live = Arc::new(LiveAnalytics::new(
        Arc::clone(&h.client),
        source.clone(),
        "f1",
        LiveAnalyticsOptions::default().with_auto_connect(false),
    ));

    let pending = {
        let live = Arc::clone(&live);
        tokio::spawn(async move { live.refresh_analytics().await })
    };
    while source.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(live.snapshot().loading);

    live.set_form_id("f2").await.unwrap();
    release.notify_one();
    pending.await.unwrap();

    let view = live.snapshot();
    assert_eq!(view.analytics.map(|a| a.form_id), Some("f2".to_string()));
    assert!(!view.loading);
}

#[tokio::test(start_paused = true)]
async fn test_socket_failure_shows_in_view_until_reopen() {
    let mut h = harness();
    let source = FakeSource::with(&[analytics("f1", 10)]);
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f1",
        LiveAnalyticsOptions::default(),
    );
    live.start().await.unwrap();
    wait_connected(&mut h.probe).await;
    assert_eq!(live.snapshot().error, None);

    let _next = h.connector.accept_next();
    h.peer.fail("connection reset");
    h.probe.wait_for(WsEvent::is_reconnecting).await.unwrap();

    let view = live.snapshot();
    assert_eq!(view.connection_state, ConnectionState::Error);
    assert!(!view.is_connected);
    let error = view.error.unwrap();
    assert!(error.starts_with("WebSocket connection error"), "{error}");
    assert!(error.contains("connection reset"), "{error}");
    assert_eq!(view.analytics.map(|a| a.total_responses), Some(10));

    wait_connected(&mut h.probe).await;
    let view = live.snapshot();
    assert_eq!(view.error, None);
    assert_eq!(view.connection_state, ConnectionState::Connected);
}

// ============================================================================
// Disconnect and ownership
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shared_client_survives_view_disconnect() {
    let mut h = harness();
    let source = FakeSource::with(&[analytics("f1", 1), analytics("f2", 2)]);
    let first = LiveAnalytics::new(
        Arc::clone(&h.client),
        source.clone(),
        "f1",
        LiveAnalyticsOptions::default(),
    );
    let second = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f2",
        LiveAnalyticsOptions::default(),
    );

    first.start().await.unwrap();
    wait_connected(&mut h.probe).await;
    assert_eq!(
        h.peer.drain_frames(),
        vec![r#"{"type":"subscribe","formId":"f1"}"#.to_string()]
    );
    second.start().await.unwrap();
    assert_eq!(
        h.peer.next_frame().await.as_deref(),
        Some(r#"{"type":"subscribe","formId":"f2"}"#)
    );

    first.disconnect().await;
    assert_eq!(
        h.peer.next_frame().await.as_deref(),
        Some(r#"{"type":"unsubscribe","formId":"f1"}"#)
    );
    assert!(h.client.is_connected());
    assert_eq!(h.client.subscribed_topics(), vec!["f2".to_string()]);

    h.peer.send_json(&new_response_frame("f1", "x"));
    h.peer.send_json(&new_response_frame("f2", "y"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(first.snapshot().new_responses_count, 0);
    assert_eq!(second.snapshot().new_responses_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_owning_view_disconnects_client() {
    let mut h = harness();
    let source = FakeSource::with(&[analytics("f1", 1)]);
    let live = LiveAnalytics::new(
        Arc::clone(&h.client),
        source,
        "f1",
        LiveAnalyticsOptions::default().with_owned_client(),
    );
    live.start().await.unwrap();
    wait_connected(&mut h.probe).await;

    live.disconnect().await;
    let view = live.snapshot();
    assert_eq!(view.connection_state, ConnectionState::Closed);
    assert!(!view.is_connected);
    assert_eq!(h.client.subscription_count(), 0);

    // reconnecting re-attaches handlers and replays the subscription once
    let mut peer = h.connector.accept_next();
    let mut probe = EventProbe::attach(&h.client);
    live.connect().unwrap();
    wait_connected(&mut probe).await;
    assert_eq!(
        peer.drain_frames(),
        vec![r#"{"type":"subscribe","formId":"f1"}"#.to_string()]
    );

    peer.send_json(&new_response_frame("f1", "again"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(live.snapshot().new_responses_count, 1);
}
