//! # Fibonacci Backoff
//!
//! Requeue delays for parents whose last reconciliation pass failed.
//! Each delay is the sum of the previous two, starting at the configured
//! minimum and capped at the maximum: with 5s/300s that is
//! 5s, 5s, 10s, 15s, 25s, 40s, 65s, 105s, 170s, 275s, 300s.
//!
//! State is tracked per parent (`namespace/name`) and dropped on the first
//! successful pass. Deleted parents are never reconciled again, so entries
//! whose last failure is older than twice the maximum delay are pruned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }
}

/// Backoff state for a parent
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
    last_failure: Instant,
}

/// Per-parent backoff bookkeeping shared by the watcher's reconcile and error policy.
#[derive(Debug, Clone)]
pub struct BackoffTracker {
    min: Duration,
    max: Duration,
    /// Error count tracking per parent (namespace/name -> BackoffState)
    states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl BackoffTracker {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a failure and return the delay before the next attempt along
    /// with the number of consecutive failures.
    pub fn next_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        self.record_failure(resource_key, Instant::now())
    }

    fn record_failure(&self, resource_key: &str, now: Instant) -> (Duration, u32) {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                return (self.min, 0);
            }
        };

        // A failing parent is retried within `max`, so anything quieter is gone
        let stale_after = self.max.saturating_mul(2);
        let before = states.len();
        states.retain(|_, state| now.saturating_duration_since(state.last_failure) <= stale_after);
        if states.len() < before {
            debug!("Pruned {} stale backoff entries", before - states.len());
        }

        let state = states
            .entry(resource_key.to_string())
            .or_insert_with(|| BackoffState {
                backoff: FibonacciBackoff::new(self.min, self.max),
                error_count: 0,
                last_failure: now,
            });
        state.error_count += 1;
        state.last_failure = now;
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the failures of a parent (on successful reconciliation)
    pub fn reset(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(resource_key);
        }
    }

    /// Consecutive failures recorded for a parent
    #[cfg(test)]
    fn error_count(&self, resource_key: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(resource_key).map(|s| s.error_count))
            .unwrap_or(0)
    }

    /// Number of parents with recorded failures
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.states.lock().map(|states| states.len()).unwrap_or(0)
    }
}
