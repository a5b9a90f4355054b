//! Time source for the engine.
//!
//! DESIGN
//! ======
//! Timestamps are plain `f64` seconds so they travel unchanged over the wire
//! and compare across participants. `SystemClock` reads wall-clock seconds
//! since the Unix epoch and never reports a value smaller than one it has
//! already handed out. `ManualClock` is set by hand in tests and may be moved
//! backwards to exercise regression handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds. Local and remote timestamps share this unit.
pub type Timestamp = f64;

/// Anything that can report the current time.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> Timestamp;
}

/// Elapsed seconds between `since` and `now`, clamped at zero when the clock
/// has gone backwards.
#[must_use]
pub fn age(now: Timestamp, since: Timestamp) -> f64 {
    (now - since).max(0.0)
}

// =============================================================================
// SYSTEM CLOCK
// =============================================================================

/// Wall clock with a monotonic floor.
#[derive(Debug, Default)]
pub struct SystemClock {
    /// Bit pattern of the largest value returned so far. Non-negative `f64`s
    /// order the same way as their bit patterns.
    high_water: AtomicU64,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64());
        let prev = self.high_water.fetch_max(wall.to_bits(), Ordering::AcqRel);
        wall.max(f64::from_bits(prev))
    }
}

// =============================================================================
// MANUAL CLOCK
// =============================================================================

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self { bits: Arc::new(AtomicU64::new(start.to_bits())) }
    }

    /// Jump to an absolute time. Going backwards is allowed.
    pub fn set(&self, t: Timestamp) {
        self.bits.store(t.to_bits(), Ordering::Release);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
