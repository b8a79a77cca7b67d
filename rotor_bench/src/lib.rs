//! Time-slotted rotor interconnect scheduler.
//!
//! Models a circuit-switched rotor network in software: a coordinator node
//! advances a globally synchronized slot clock, and in every slot each
//! communicating node exchanges one payload with the partners assigned by a
//! cyclic matching table, polling the non-blocking operations to completion.
//! Per-slot completion latencies and delivered-item counts are collected at
//! the coordinator and printed as a table when the run ends.
//!
//! Three synchronization strategies are supported:
//! - `pairwise`: barrier-triggered slots, latency measured at each node
//! - `acked`: barrier-triggered slots, nodes acknowledge received item
//!   counts to the coordinator, which timestamps the ACKs
//! - `staggered`: no per-slot barrier; each node runs its own offset slot
//!   clock and pings the coordinator, which timestamps arrivals

pub mod affinity;
pub mod collector;
pub mod config;
pub mod error;
pub mod harness;
pub mod kernel;
pub mod matching;
pub mod report;
pub mod sync;

pub use config::{Mode, RunConfig};
pub use error::{Error, Result};
pub use harness::run;
pub use report::RunReport;

/// Rank of the coordinator node. Communicating nodes are ranked `1..=n`.
pub const COORDINATOR: usize = 0;
