//! Error types for the rotor benchmark.

use std::fmt;
use std::io;

/// Error type for benchmark runs.
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration, rejected before any thread is spawned.
    InvalidConfig(String),
    /// A peer's endpoint went away mid-run. Fatal; the benchmark has no
    /// retry policy.
    PeerDisconnected { rank: usize, peer: usize },
    /// An operation named a peer outside the fabric.
    InvalidPeer { rank: usize, peer: usize },
    /// Failed to spawn a node thread.
    Spawn(io::Error),
    /// A node thread panicked.
    WorkerPanicked { rank: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Error::PeerDisconnected { rank, peer } => {
                write!(f, "rank {}: peer {} disconnected", rank, peer)
            }
            Error::InvalidPeer { rank, peer } => {
                write!(f, "rank {}: invalid peer {}", rank, peer)
            }
            Error::Spawn(e) => write!(f, "failed to spawn node thread: {}", e),
            Error::WorkerPanicked { rank } => write!(f, "node thread for rank {} panicked", rank),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Map a fabric send failure on `rank`'s port into a run error.
pub(crate) fn send_failed<T>(rank: usize, peer: usize, err: rotornet::SendError<T>) -> Error {
    match err {
        rotornet::SendError::Disconnected(_) => Error::PeerDisconnected { rank, peer },
        rotornet::SendError::InvalidPeer(_) => Error::InvalidPeer { rank, peer },
    }
}

/// Map a fabric receive failure on `rank`'s port into a run error.
pub(crate) fn recv_failed(rank: usize, peer: usize, err: rotornet::RecvError) -> Error {
    match err {
        rotornet::RecvError::InvalidPeer => Error::InvalidPeer { rank, peer },
        // `Empty` never escapes the polling loops.
        _ => Error::PeerDisconnected { rank, peer },
    }
}
