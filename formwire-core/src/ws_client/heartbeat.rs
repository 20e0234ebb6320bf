//! Keep-alive ticker for the open socket.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Periodic `ping` schedule, running only while the socket is open.
///
/// The first tick fires one full period after [`start`](Self::start).
#[derive(Debug)]
pub struct Heartbeat {
    period: Option<Duration>,
    interval: Option<Interval>,
}

impl Heartbeat {
    /// Creates a stopped heartbeat; `None` disables it entirely.
    pub fn new(period: Option<Duration>) -> Self {
        Self {
            period: period.filter(|p| !p.is_zero()),
            interval: None,
        }
    }

    /// Starts (or restarts) the schedule. No-op when disabled.
    pub fn start(&mut self) {
        self.interval = self.period.map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
    }

    /// Stops the schedule.
    pub fn stop(&mut self) {
        self.interval = None;
    }

    /// `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Configured period.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Completes at the next tick; never completes while stopped.
    ///
    /// Cancel safe.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
