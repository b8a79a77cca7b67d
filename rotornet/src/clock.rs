//! Microsecond clocks.
//!
//! `Clock::steady()` hands out clones sharing one `Instant` origin, so all
//! threads of a run read the same relative timeline. `ManualClock` is an
//! atomic counter advanced explicitly, for deterministic tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic microsecond clock, shared between threads by cloning.
#[derive(Clone)]
pub enum Clock {
    /// Wall clock relative to a shared origin.
    Steady { origin: Instant },
    /// Test clock; advances only when told to.
    Manual { now_us: Arc<AtomicU64> },
}

impl Clock {
    /// Create a steady clock starting at 0.
    pub fn steady() -> Self {
        Clock::Steady {
            origin: Instant::now(),
        }
    }

    /// Microseconds elapsed since the clock's origin.
    #[inline]
    pub fn now_us(&self) -> u64 {
        match self {
            Clock::Steady { origin } => origin.elapsed().as_micros() as u64,
            Clock::Manual { now_us } => now_us.load(Ordering::Acquire),
        }
    }
}

/// Handle driving a manual [`Clock`].
#[derive(Clone)]
pub struct ManualClock {
    now_us: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock at time 0.
    pub fn new() -> Self {
        Self {
            now_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A `Clock` view reading this manual clock.
    pub fn clock(&self) -> Clock {
        Clock::Manual {
            now_us: Arc::clone(&self.now_us),
        }
    }

    /// Advance the clock by `us` microseconds.
    pub fn advance(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::AcqRel);
    }

    /// Set the clock to an absolute time. Must not move backwards.
    pub fn set(&self, us: u64) {
        let prev = self.now_us.swap(us, Ordering::AcqRel);
        assert!(prev <= us, "manual clock moved backwards: {} -> {}", prev, us);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_monotonic() {
        let clock = Clock::steady();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }

    #[test]
    fn test_steady_shared_origin() {
        let clock = Clock::steady();
        let other = clock.clone();
        std::thread::sleep(std::time::Duration::from_millis(2));
        // Both clones read the same timeline.
        let a = clock.now_us();
        let b = other.now_us();
        assert!(a.abs_diff(b) < 2_000);
        assert!(a >= 2_000);
    }

    #[test]
    fn test_manual_advance() {
        let manual = ManualClock::new();
        let clock = manual.clock();
        assert_eq!(clock.now_us(), 0);
        manual.advance(150);
        assert_eq!(clock.now_us(), 150);
        manual.set(1_000);
        assert_eq!(clock.now_us(), 1_000);
    }

    #[test]
    #[should_panic(expected = "moved backwards")]
    fn test_manual_backwards_panics() {
        let manual = ManualClock::new();
        manual.set(100);
        manual.set(50);
    }
}
