//! Property-based tests for subscription bookkeeping and reconnect backoff.
//!
//! Test coverage:
//! - Subscription set semantics under arbitrary add/remove sequences
//! - Capacity enforcement
//! - Replay order matches first-subscription order
//! - Concurrent subscription consistency
//! - Backoff delays are monotonic and capped
//! - Attempt budget is never exceeded

use formwire_core::ws_client::{
    BackoffConfig, BackoffStrategy, ReconnectDecision, ReconnectPolicy, SubscriptionRegistry,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Generators
// ============================================================================

/// Strategy for generating form ids from a small pool, so that sequences
/// revisit the same topics.
fn form_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("contact-form".to_string()),
        Just("signup".to_string()),
        Just("survey-2024".to_string()),
        "[a-z]{1,3}".prop_map(|s| format!("form-{s}")),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Remove(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => form_id_strategy().prop_map(Op::Add),
        1 => form_id_strategy().prop_map(Op::Remove),
    ]
}

fn backoff_strategy() -> impl Strategy<Value = BackoffConfig> {
    (10u64..10_000, 1u64..20, 1.0f64..4.0).prop_map(|(base_ms, factor, multiplier)| {
        BackoffConfig {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(base_ms * factor),
            jitter_factor: 0.0,
            multiplier,
        }
    })
}

// ============================================================================
// Subscription Registry Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The registry behaves like an insertion-ordered set.
    #[test]
    fn prop_registry_matches_ordered_set(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let registry = SubscriptionRegistry::new(1_000);
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            match op {
                Op::Add(id) => {
                    let added = registry.try_add(&id).unwrap();
                    prop_assert_eq!(added, !model.contains(&id));
                    if added {
                        model.push(id);
                    }
                }
                Op::Remove(id) => {
                    let removed = registry.remove(&id).is_some();
                    prop_assert_eq!(removed, model.contains(&id));
                    model.retain(|m| m != &id);
                }
            }
        }

        prop_assert_eq!(registry.count(), model.len());
        prop_assert_eq!(registry.topics(), model);
    }

    /// The registry never grows past its capacity, and duplicates are
    /// accepted even when full.
    #[test]
    fn prop_capacity_enforced(
        capacity in 1usize..10,
        ids in prop::collection::vec(form_id_strategy(), 1..40),
    ) {
        let registry = SubscriptionRegistry::new(capacity);
        for id in &ids {
            let was_member = registry.contains(id);
            let result = registry.try_add(id);
            if was_member {
                prop_assert_eq!(result.ok(), Some(false));
            } else if registry.count() >= capacity {
                prop_assert!(result.is_err());
            }
            prop_assert!(registry.count() <= capacity);
            prop_assert_eq!(registry.remaining_capacity(), capacity - registry.count());
        }
    }

    /// Re-adding a removed topic moves it to the end of the replay order.
    #[test]
    fn prop_readd_moves_to_end(ids in prop::collection::hash_set(form_id_strategy(), 2..10)) {
        let ids: Vec<String> = ids.into_iter().collect();
        let registry = SubscriptionRegistry::new(100);
        for id in &ids {
            registry.try_add(id).unwrap();
        }
        registry.remove(&ids[0]);
        registry.try_add(&ids[0]).unwrap();

        let topics = registry.topics();
        prop_assert_eq!(topics.last(), Some(&ids[0]));
        prop_assert_eq!(&topics[..ids.len() - 1], &ids[1..]);
    }

    /// Concurrent adds from several threads leave exactly the union.
    #[test]
    fn prop_concurrent_adds_consistent(
        per_thread in prop::collection::vec(prop::collection::vec(form_id_strategy(), 1..20), 2..6),
    ) {
        let registry = Arc::new(SubscriptionRegistry::new(10_000));
        let expected: HashSet<String> = per_thread.iter().flatten().cloned().collect();

        let handles: Vec<_> = per_thread
            .into_iter()
            .map(|ids| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for id in ids {
                        registry.try_add(&id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let topics = registry.topics();
        let unique: HashSet<String> = topics.iter().cloned().collect();
        prop_assert_eq!(topics.len(), unique.len());
        prop_assert_eq!(unique, expected);
    }
}

// ============================================================================
// Backoff Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Delays never decrease and never exceed the cap.
    #[test]
    fn prop_backoff_monotonic_and_capped(config in backoff_strategy()) {
        let strategy = BackoffStrategy::new(config.clone());
        let mut previous = Duration::ZERO;
        for attempt in 0..40 {
            let delay = strategy.calculate_delay(attempt);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= config.max_delay);
            previous = delay;
        }
        prop_assert_eq!(strategy.calculate_delay(0), config.base_delay);
    }

    /// Jitter stays within its configured fraction.
    #[test]
    fn prop_jitter_bounded(mut config in backoff_strategy(), jitter in 0.0f64..=1.0, attempt in 0u32..10) {
        config.jitter_factor = jitter;
        let strategy = BackoffStrategy::new(config);
        let plain = strategy.calculate_delay_without_jitter(attempt);
        let jittered = strategy.calculate_delay(attempt);

        prop_assert!(jittered >= plain);
        let slack = plain.as_secs_f64() * jitter + 0.001;
        prop_assert!(jittered.as_secs_f64() <= plain.as_secs_f64() + slack);
    }

    /// A policy grants exactly `max_attempts` retries, numbered from 1,
    /// and starts over after a reset.
    #[test]
    fn prop_policy_respects_budget(max_attempts in 0u32..15, closes in 0usize..30) {
        let mut policy = ReconnectPolicy::new(BackoffConfig::default(), max_attempts);
        let mut retries = 0u32;

        for _ in 0..closes {
            match policy.decide() {
                ReconnectDecision::Retry { attempt, .. } => {
                    retries += 1;
                    prop_assert_eq!(attempt, retries);
                }
                ReconnectDecision::Exhausted { total_attempts } => {
                    prop_assert_eq!(total_attempts, max_attempts);
                }
            }
        }

        prop_assert_eq!(retries as usize, closes.min(max_attempts as usize));
        policy.reset();
        prop_assert_eq!(policy.attempts(), 0);
    }
}
