//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciles. The sequence grows more slowly than
//! exponential backoff, so a briefly unavailable API server is retried soon
//! while a persistent failure settles at the cap.
//!
//! Default sequence: 5s, 5s, 10s, 15s, 25s, 40s, 65s, ... up to 300s.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default first delay in seconds
pub const DEFAULT_MIN_SECONDS: u64 = 5;
/// Default cap in seconds
pub const DEFAULT_MAX_SECONDS: u64 = 300;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value in seconds
    prev_seconds: u64,
    /// Current backoff value in seconds
    current_seconds: u64,
    /// Maximum backoff value in seconds
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given bounds in seconds
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;

        let next = self.prev_seconds.saturating_add(self.current_seconds);
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next, self.max_seconds);

        Duration::from_secs(result)
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SECONDS, DEFAULT_MAX_SECONDS)
    }
}

/// Backoff state tracked per reconcile key
#[derive(Debug, Clone, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Independent Fibonacci backoff per reconcile key.
///
/// A failure for one key never delays another.
#[derive(Debug, Default)]
pub struct KeyedBackoff {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl KeyedBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, BackoffState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failure for `key` and return (delay, consecutive error count)
    pub fn next_delay(&self, key: &str) -> (Duration, u32) {
        let mut states = self.states();
        let state = states.entry(key.to_string()).or_default();
        state.error_count += 1;
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the failures of `key` after a successful reconcile; the next
    /// failure starts the sequence again
    pub fn reset(&self, key: &str) {
        self.states().remove(key);
    }

    /// Number of keys currently backing off
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.states().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::default();

        assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(15));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(25));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(40));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(65));
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(5, 30);

        let delays: Vec<u64> = (0..7).map(|_| backoff.next_backoff().as_secs()).collect();
        // 25 + 15 would be 40, capped at 30; stays there
        assert_eq!(delays, vec![5, 5, 10, 15, 25, 30, 30]);
    }

    #[test]
    fn test_keyed_backoff_is_per_key() {
        let backoff = KeyedBackoff::new();

        assert_eq!(backoff.next_delay("default/web"), (Duration::from_secs(5), 1));
        assert_eq!(backoff.next_delay("default/web"), (Duration::from_secs(5), 2));
        assert_eq!(backoff.next_delay("default/web"), (Duration::from_secs(10), 3));
        // Another key starts fresh
        assert_eq!(backoff.next_delay("default/db"), (Duration::from_secs(5), 1));
        assert_eq!(backoff.len(), 2);
    }

    #[test]
    fn test_keyed_backoff_reset() {
        let backoff = KeyedBackoff::new();
        backoff.next_delay("default/web");
        backoff.next_delay("default/web");

        backoff.reset("default/web");

        assert_eq!(backoff.len(), 0);
        assert_eq!(backoff.next_delay("default/web"), (Duration::from_secs(5), 1));
    }
}
