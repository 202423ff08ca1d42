use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::attention::domain::clock::Clock;

/// Hand-driven clock for deterministic runs.
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the service. Setting an earlier time is allowed on purpose:
/// it is how clock irregularities are simulated.
#[derive(Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_secs(secs: f64) -> Self {
        let clock = Self::new();
        clock.set_secs(secs);
        clock
    }

    pub fn set(&self, now: Duration) {
        let nanos = u64::try_from(now.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    pub fn set_secs(&self, secs: f64) {
        self.set(Duration::from_secs_f64(secs.max(0.0)));
    }

    pub fn advance(&self, by: Duration) {
        self.set(self.now().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_reading() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.set_secs(1.5);
        assert_eq!(other.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_advance_accumulates() {
        let clock = ManualClock::at_secs(1.0);
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_can_move_backwards() {
        let clock = ManualClock::at_secs(5.0);
        clock.set_secs(3.0);
        assert_eq!(clock.now(), Duration::from_secs(3));
    }
}
