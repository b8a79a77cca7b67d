//! Sense-reversing spin barrier.
//!
//! All participants busy-wait at the barrier; the last arrival flips the
//! generation and releases the rest. No participant sleeps, so release
//! latency stays bounded by the polling cadence of the wait policy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::WaitPolicy;

/// A reusable barrier for a fixed set of participants.
pub struct SpinBarrier {
    count: AtomicUsize,
    generation: AtomicUsize,
    participants: usize,
    wait: WaitPolicy,
}

impl SpinBarrier {
    /// Create a barrier for `participants` threads.
    ///
    /// # Panics
    /// Panics if `participants` is 0.
    pub fn new(participants: usize, wait: WaitPolicy) -> Self {
        assert!(participants > 0, "barrier needs at least one participant");
        Self {
            count: AtomicUsize::new(0),
            generation: AtomicUsize::new(0),
            participants,
            wait,
        }
    }

    /// Number of participating threads.
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Block (busy-wait) until all participants have arrived.
    ///
    /// Returns `true` on the thread that released the barrier.
    pub fn wait(&self) -> bool {
        let gen = self.generation.load(Ordering::Acquire);
        let arrived = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        if arrived == self.participants {
            // Last arrival: reset the counter, then advance the generation
            // to release the waiters.
            self.count.store(0, Ordering::Relaxed);
            self.generation.fetch_add(1, Ordering::Release);
            true
        } else {
            while self.generation.load(Ordering::Acquire) == gen {
                self.wait.relax();
            }
            false
        }
    }
}
