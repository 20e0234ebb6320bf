//! Topic subscription registry.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// A topic the caller wants to receive messages for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub(crate) form_id: String,
    pub(crate) added_at: DateTime<Utc>,
    seq: u64,
}

impl Subscription {
    /// Subscribed form.
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// When the topic was first added.
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}

/// Set of subscribed topics with a capacity limit.
///
/// Membership reflects caller intent: it survives reconnects and is only
/// changed by explicit subscribe/unsubscribe calls or by a disconnect.
/// Iteration yields topics in the order they were added.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    subscriptions: DashMap<String, Subscription>,
    max_subscriptions: usize,
    next_seq: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates a registry holding at most `max_subscriptions` topics.
    pub fn new(max_subscriptions: usize) -> Self {
        Self {
            subscriptions: DashMap::new(),
            max_subscriptions,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Creates a registry with the default capacity (100).
    pub fn with_default_capacity() -> Self {
        Self::new(super::config::DEFAULT_MAX_SUBSCRIPTIONS)
    }

    /// Maximum number of topics.
    #[inline]
    #[must_use]
    pub fn max_subscriptions(&self) -> usize {
        self.max_subscriptions
    }

    /// Adds `form_id`, returning `true` if it was not already present.
    ///
    /// Re-adding an existing topic is a no-op and keeps its position.
    /// Fails with [`Error::ResourceExhausted`] when the registry is full.
    pub fn try_add(&self, form_id: &str) -> Result<bool> {
        if self.subscriptions.contains_key(form_id) {
            return Ok(false);
        }
        if self.subscriptions.len() >= self.max_subscriptions {
            return Err(Error::resource_exhausted(format!(
                "maximum subscriptions ({}) reached",
                self.max_subscriptions
            )));
        }

        let inserted = match self.subscriptions.entry(form_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Subscription {
                    form_id: form_id.to_string(),
                    added_at: Utc::now(),
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                });
                true
            }
        };
        Ok(inserted)
    }

    /// Removes `form_id`, returning its entry if it was present.
    pub fn remove(&self, form_id: &str) -> Option<Subscription> {
        self.subscriptions.remove(form_id).map(|(_, v)| v)
    }

    /// `true` if `form_id` is subscribed.
    #[inline]
    #[must_use]
    pub fn contains(&self, form_id: &str) -> bool {
        self.subscriptions.contains_key(form_id)
    }

    /// Number of subscribed topics.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Topics that can still be added.
    #[inline]
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.max_subscriptions
            .saturating_sub(self.subscriptions.len())
    }

    /// `true` when no topics are subscribed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Removes every topic.
    pub fn clear(&self) {
        self.subscriptions.clear();
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn collect_subscriptions(&self) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        subscriptions.sort_by_key(|s| s.seq);
        subscriptions
    }

    /// All topics in insertion order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.collect_subscriptions()
            .into_iter()
            .map(|s| s.form_id)
            .collect()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
