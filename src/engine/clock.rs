//! Injectable clock/scheduler.
//!
//! The simulator's processing delays are cosmetic; routing them through a
//! trait lets tests run the whole engine synchronously.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

/// Time source and sleep scheduler.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio's timer.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests: sleeps return immediately and advance the
/// reported time, and every requested sleep is recorded.
pub struct ManualClock {
    state: Mutex<ManualState>,
}

struct ManualState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                sleeps: Vec::new(),
            }),
        }
    }

    /// Durations requested via `sleep`, in order.
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.state.lock().expect("clock lock poisoned").sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().expect("clock lock poisoned").now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().expect("clock lock poisoned");
        state.now += chrono::Duration::from_std(duration).unwrap_or_default();
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_advances_without_waiting() {
        let clock = ManualClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_secs(3600)).await;
        let after = clock.now();
        assert_eq!((after - before).num_seconds(), 3600);
        assert_eq!(clock.recorded_sleeps(), vec![Duration::from_secs(3600)]);
    }
}
