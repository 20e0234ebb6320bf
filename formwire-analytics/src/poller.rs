//! Periodic analytics polling, for deployments without the realtime hub.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use formwire_core::error::{Error, Result};
use formwire_core::types::{AnalyticsData, ResponseSummary};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::source::AnalyticsSource;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Result of one successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    /// Fetched aggregate.
    pub analytics: AnalyticsData,
    /// Responses that arrived since the previous poll. Always zero on the
    /// first poll, which only sets the baseline.
    pub new_responses: u64,
    /// Recent responses not present in the previous poll, newest first.
    pub unseen: Vec<ResponseSummary>,
}

/// Callback invoked after every successful poll.
pub type PollCallback = Arc<dyn Fn(&PollUpdate) + Send + Sync>;

/// Detects responses that arrived between two snapshots.
#[derive(Debug, Default)]
pub struct ResponseTracker {
    last_total: Option<u64>,
    seen: HashSet<String>,
}

impl ResponseTracker {
    /// Creates a tracker with no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares `analytics` with the previous snapshot.
    ///
    /// New responses are the larger of the `totalResponses` growth and the
    /// number of unseen recent entries, so a reset counter on the server
    /// does not hide fresh submissions.
    pub fn observe(&mut self, analytics: AnalyticsData) -> PollUpdate {
        let current: HashSet<String> = analytics
            .recent_responses
            .iter()
            .map(|r| r.id.clone())
            .collect();

        let (new_responses, unseen) = match self.last_total {
            None => (0, Vec::new()),
            Some(last) => {
                let unseen: Vec<ResponseSummary> = analytics
                    .recent_responses
                    .iter()
                    .filter(|r| !self.seen.contains(&r.id))
                    .cloned()
                    .collect();
                let growth = analytics.total_responses.saturating_sub(last);
                (growth.max(unseen.len() as u64), unseen)
            }
        };

        self.last_total = Some(analytics.total_responses);
        self.seen = current;
        PollUpdate {
            analytics,
            new_responses,
            unseen,
        }
    }
}

/// Polls a form's analytics on a fixed interval until stopped.
pub struct AnalyticsPoller {
    source: Arc<dyn AnalyticsSource>,
    form_id: String,
    interval: Duration,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel_token: Mutex<Option<CancellationToken>>,
    callback: Option<PollCallback>,
}

impl std::fmt::Debug for AnalyticsPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsPoller")
            .field("form_id", &self.form_id)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl AnalyticsPoller {
    /// Creates a stopped poller for `form_id` with the default interval.
    pub fn new(source: Arc<dyn AnalyticsSource>, form_id: impl Into<String>) -> Self {
        Self {
            source,
            form_id: form_id.into(),
            interval: DEFAULT_POLL_INTERVAL,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            cancel_token: Mutex::new(None),
            callback: None,
        }
    }

    /// Sets the poll interval. Zero is bumped to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the callback receiving each poll.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PollUpdate) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Uses `token` for cancellation, so a parent can stop the poller.
    pub fn with_cancel_token(self, token: CancellationToken) -> Self {
        let _ = self.cancel_token.try_lock().map(|mut guard| {
            *guard = Some(token);
        });
        self
    }

    /// Polled form.
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` while the polling task runs.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts polling; the first poll happens immediately. Returns `false`
    /// if the poller was already running.
    pub async fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!(form_id = %self.form_id, "poller already running");
            return false;
        }

        let token = {
            let mut guard = self.cancel_token.lock().await;
            match guard.as_ref() {
                Some(token) if !token.is_cancelled() => token.clone(),
                _ => {
                    let token = CancellationToken::new();
                    *guard = Some(token.clone());
                    token
                }
            }
        };

        info!(form_id = %self.form_id, interval_ms = self.interval.as_millis() as u64, "starting analytics poller");
        let span = info_span!("analytics_poller", form_id = %self.form_id);
        let handle = tokio::spawn(
            poll_loop(
                Arc::clone(&self.source),
                self.form_id.clone(),
                self.interval,
                self.callback.clone(),
                token,
                Arc::clone(&self.running),
            )
            .instrument(span),
        );
        *self.task.lock().await = Some(handle);
        true
    }

    /// Stops polling and waits for the task to finish.
    pub async fn stop(&self) {
        if let Some(token) = self.cancel_token.lock().await.as_ref() {
            token.cancel();
        }
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "poller task ended abnormally");
            }
        }
        self.running.store(false, Ordering::SeqCst);
        info!(form_id = %self.form_id, "analytics poller stopped");
    }
}

async fn poll_loop(
    source: Arc<dyn AnalyticsSource>,
    form_id: String,
    period: Duration,
    callback: Option<PollCallback>,
    token: CancellationToken,
    running: Arc<AtomicBool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tracker = ResponseTracker::new();

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match fetch_or_cancel(source.as_ref(), &form_id, &token).await {
            Ok(analytics) => {
                let update = tracker.observe(analytics);
                if update.new_responses > 0 {
                    info!(new_responses = update.new_responses, "new responses observed");
                }
                if let Some(callback) = &callback {
                    callback(&update);
                }
            }
            Err(err) if err.as_cancelled().is_some() => break,
            Err(err) => warn!(error = %err, "analytics poll failed"),
        }
    }

    running.store(false, Ordering::SeqCst);
    debug!("poll loop exited");
}

/// Fetches `form_id`, abandoning the request once `token` is cancelled.
async fn fetch_or_cancel(
    source: &dyn AnalyticsSource,
    form_id: &str,
    token: &CancellationToken,
) -> Result<AnalyticsData> {
    tokio::select! {
        () = token.cancelled() => Err(Error::cancelled("analytics poll cancelled")),
        result = source.fetch(form_id) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(total: u64, ids: &[&str]) -> AnalyticsData {
        AnalyticsData {
            total_responses: total,
            recent_responses: ids
                .iter()
                .map(|id| ResponseSummary {
                    id: (*id).to_string(),
                    submitted_at: Utc::now(),
                    device: "desktop".into(),
                    location: "Unknown".into(),
                    response_data: Default::default(),
                })
                .collect(),
            ..AnalyticsData::default()
        }
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let mut tracker = ResponseTracker::new();
        let update = tracker.observe(snapshot(5, &["a", "b"]));
        assert_eq!(update.new_responses, 0);
        assert!(update.unseen.is_empty());
    }

    #[test]
    fn test_growth_and_unseen_entries() {
        let mut tracker = ResponseTracker::new();
        tracker.observe(snapshot(5, &["b", "a"]));

        let update = tracker.observe(snapshot(7, &["d", "c", "b", "a"]));
        assert_eq!(update.new_responses, 2);
        let ids: Vec<&str> = update.unseen.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);

        let update = tracker.observe(snapshot(7, &["d", "c", "b", "a"]));
        assert_eq!(update.new_responses, 0);
    }

    #[test]
    fn test_counter_reset_still_reports_unseen() {
        let mut tracker = ResponseTracker::new();
        tracker.observe(snapshot(50, &["a"]));
        let update = tracker.observe(snapshot(1, &["z", "a"]));
        assert_eq!(update.new_responses, 1);
    }

    struct Never;

    #[async_trait::async_trait]
    impl AnalyticsSource for Never {
        async fn fetch(&self, _form_id: &str) -> Result<AnalyticsData> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_fetch_reports_cancellation() {
        let token = CancellationToken::new();
        let pending = fetch_or_cancel(&Never, "f1", &token);
        token.cancel();
        let err = pending.await.unwrap_err();
        assert_eq!(err.as_cancelled(), Some("analytics poll cancelled"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_interval_floor() {
        let poller = AnalyticsPoller::new(Arc::new(Never), "f1").with_interval(Duration::ZERO);
        assert_eq!(poller.interval(), Duration::from_millis(1));
        assert!(!poller.is_running());
        assert_eq!(poller.form_id(), "f1");
    }
}
