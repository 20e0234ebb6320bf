//! Reconnection policy.
//!
//! [`ReconnectPolicy`] only counts attempts and computes delays; arming the
//! timer and reconnecting is the driver's job.

use std::time::Duration;

use super::config::{BackoffConfig, BackoffStrategy};

/// Decision taken after an unexpected close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Reconnect after `delay`; `attempt` is 1-indexed.
    Retry {
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// The attempt budget is spent.
    Exhausted {
        /// Attempts made since the last successful open.
        total_attempts: u32,
    },
}

/// Attempt counter plus backoff schedule.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    backoff: BackoffStrategy,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Creates a policy allowing `max_attempts` consecutive attempts.
    pub fn new(backoff: BackoffConfig, max_attempts: u32) -> Self {
        Self {
            backoff: BackoffStrategy::new(backoff),
            max_attempts,
            attempts: 0,
        }
    }

    /// Consumes one attempt and returns its delay, or `None` when exhausted.
    ///
    /// Attempt `n` (1-indexed) waits `min(base * multiplier^(n-1), max)`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.backoff.calculate_delay(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Same as [`next_delay`](Self::next_delay), as a [`ReconnectDecision`].
    pub fn decide(&mut self) -> ReconnectDecision {
        match self.next_delay() {
            Some(delay) => ReconnectDecision::Retry {
                attempt: self.attempts,
                delay,
            },
            None => ReconnectDecision::Exhausted {
                total_attempts: self.attempts,
            },
        }
    }

    /// Clears the counter after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts consumed since the last reset.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Configured attempt budget.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `true` once every attempt has been used.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
