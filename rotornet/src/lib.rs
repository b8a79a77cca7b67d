//! In-process message-passing fabric for slot-synchronized benchmarks.
//!
//! This crate provides:
//! - `fabric`: n-to-n communication over dedicated per-pair bounded channels,
//!   with non-blocking send/receive initiation and completion polling
//! - `barrier`: a sense-reversing spin barrier
//! - `clock`: a shared steady microsecond clock, and a manual clock for
//!   deterministic tests
//!
//! Every busy-wait in the crate is governed by a [`WaitPolicy`], so latency
//! measurements can spin while correctness tests yield.

pub mod barrier;
pub mod chan;
pub mod clock;
pub mod fabric;

pub use barrier::SpinBarrier;
pub use clock::{Clock, ManualClock};
pub use fabric::{create_fabric, FabricConfig, Port, RecvHandle, SendHandle};

/// How a busy-wait loop relaxes between polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Spin with `std::hint::spin_loop()`. Lowest jitter, burns a core.
    Spin,
    /// Yield to the scheduler between polls.
    Yield,
}

impl WaitPolicy {
    /// Execute one relaxation step of this policy.
    #[inline]
    pub fn relax(self) {
        match self {
            WaitPolicy::Spin => std::hint::spin_loop(),
            WaitPolicy::Yield => std::thread::yield_now(),
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy::Spin
    }
}

/// Error returned when sending fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError<T> {
    /// The target peer has disconnected.
    Disconnected(T),
    /// Invalid peer ID (out of range, or self).
    InvalidPeer(T),
}

impl<T> SendError<T> {
    /// Recover the message that failed to send.
    pub fn into_inner(self) -> T {
        match self {
            SendError::Disconnected(v) | SendError::InvalidPeer(v) => v,
        }
    }
}

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Disconnected(_) => write!(f, "peer has disconnected"),
            SendError::InvalidPeer(_) => write!(f, "invalid peer ID"),
        }
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned when receiving fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// No message is currently available.
    Empty,
    /// The peer has disconnected and its channel is drained.
    Disconnected,
    /// Invalid peer ID (out of range, or self).
    InvalidPeer,
}

impl std::fmt::Display for RecvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecvError::Empty => write!(f, "no message available"),
            RecvError::Disconnected => write!(f, "peer has disconnected"),
            RecvError::InvalidPeer => write!(f, "invalid peer ID"),
        }
    }
}

impl std::error::Error for RecvError {}
