//! Wall-clock abstraction
//!
//! The cache, processor and suggestion selector read time through [`Clock`]
//! so TTL and cooldown behaviour can be driven by a simulated clock.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of epoch-millisecond timestamps
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for deterministic scenarios
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Elapsed milliseconds, saturating at zero if the clock went backwards
pub fn elapsed_ms(now: i64, since: i64) -> u64 {
    now.saturating_sub(since).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(5_001);
        assert_eq!(clock.now_ms(), 6_001);
        clock.set(42);
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // After 2020-01-01
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_elapsed_saturates() {
        assert_eq!(elapsed_ms(10, 4), 6);
        assert_eq!(elapsed_ms(4, 10), 0);
    }
}
