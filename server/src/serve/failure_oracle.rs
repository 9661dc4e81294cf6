/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * Models the external socket-pool failure cache as an injectable trait so
 * the accept loop never depends on a specific cache backend: an in-memory
 * map by default, and a no-op stand-in for when the cache is unavailable
 * (every lookup is then a miss, matching upstream's degrade-to-miss rule).
 */

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait FailureOracle: Send + Sync {
    fn mark_down(&self, host: &str, port: u16, at: Instant);
    fn is_down(&self, host: &str, port: u16, now: Instant) -> bool;
}

/// Marks a host/port down for `cooldown` from the last failure observed.
/// Concurrent writers of the same key may race; last-writer-wins is fine
/// since `is_down` only compares timestamps, never a counter.
pub struct InMemoryFailureOracle {
    cooldown: Duration,
    state: Mutex<HashMap<(String, u16), Instant>>,
}

impl InMemoryFailureOracle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: Mutex::new(HashMap::new()),
        }
    }
}

impl FailureOracle for InMemoryFailureOracle {
    fn mark_down(&self, host: &str, port: u16, at: Instant) {
        let mut state = self.state.lock().unwrap();
        state.insert((host.to_string(), port), at);
    }

    fn is_down(&self, host: &str, port: u16, now: Instant) -> bool {
        let state = self.state.lock().unwrap();
        match state.get(&(host.to_string(), port)) {
            Some(&failed_at) => now.saturating_duration_since(failed_at) < self.cooldown,
            None => false,
        }
    }
}

pub struct NoFailureOracle;

impl FailureOracle for NoFailureOracle {
    fn mark_down(&self, _host: &str, _port: u16, _at: Instant) {}

    fn is_down(&self, _host: &str, _port: u16, _now: Instant) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_host_is_down_within_cooldown() {
        let oracle = InMemoryFailureOracle::new(Duration::from_secs(30));
        let now = Instant::now();
        oracle.mark_down("10.0.0.1", 9999, now);
        assert!(oracle.is_down("10.0.0.1", 9999, now + Duration::from_secs(5)));
        assert!(!oracle.is_down("10.0.0.1", 9999, now + Duration::from_secs(60)));
    }

    #[test]
    fn unknown_host_is_never_down() {
        let oracle = InMemoryFailureOracle::new(Duration::from_secs(30));
        assert!(!oracle.is_down("10.0.0.2", 9999, Instant::now()));
    }

    #[test]
    fn no_failure_oracle_always_reports_up() {
        let oracle = NoFailureOracle;
        oracle.mark_down("x", 1, Instant::now());
        assert!(!oracle.is_down("x", 1, Instant::now()));
    }
}
