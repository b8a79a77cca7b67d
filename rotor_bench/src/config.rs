//! Run configuration.

use rotornet::WaitPolicy;

use crate::error::{Error, Result};

/// Slot synchronization strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Barrier-triggered slots; each node polls both its send and its
    /// receive to completion and measures latency locally.
    Pairwise,
    /// Barrier-triggered slots; each node acknowledges its received item
    /// count to the coordinator, which timestamps the ACKs.
    Acked,
    /// No per-slot barrier; each node runs its own slot clock, offset by
    /// `slot_us / comm_nodes`, and pings the coordinator once per slot.
    Staggered,
}

/// Benchmark run configuration.
///
/// Validated once at startup; an invalid configuration is fatal before any
/// communication begins.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Number of communicating nodes, excluding the coordinator.
    /// Default: 3
    pub comm_nodes: usize,
    /// Slot duration in microseconds.
    /// Default: 100000 (100ms)
    pub slot_us: u64,
    /// Total run duration in microseconds.
    /// Default: 2000000 (2s)
    pub run_us: u64,
    /// Payload size in items per slot.
    /// Default: 1
    pub payload_items: usize,
    /// Synchronization strategy.
    /// Default: Acked
    pub mode: Mode,
    /// Busy-wait relaxation policy for every polling loop.
    /// Default: Spin
    pub wait: WaitPolicy,
    /// Per-pair channel capacity.
    /// Default: 64
    pub channel_capacity: usize,
    /// Make one node send fewer items than expected, as `(rank, items)`,
    /// to exercise the short-delivery accounting.
    /// Default: None
    pub short_node: Option<(usize, usize)>,
    /// Pin node threads to cores, assigned downward from this core.
    /// Default: None (no pinning)
    pub affinity_start: Option<usize>,
    /// Per-slot completion tracing on stderr.
    /// Default: false
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            comm_nodes: 3,
            slot_us: 100_000,
            run_us: 2_000_000,
            payload_items: 1,
            mode: Mode::Acked,
            wait: WaitPolicy::Spin,
            channel_capacity: 64,
            short_node: None,
            affinity_start: None,
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of communicating nodes.
    pub fn with_comm_nodes(mut self, comm_nodes: usize) -> Self {
        self.comm_nodes = comm_nodes;
        self
    }

    /// Set the slot duration.
    pub fn with_slot_us(mut self, slot_us: u64) -> Self {
        self.slot_us = slot_us;
        self
    }

    /// Set the run duration.
    pub fn with_run_us(mut self, run_us: u64) -> Self {
        self.run_us = run_us;
        self
    }

    /// Set the payload size in items.
    pub fn with_payload_items(mut self, payload_items: usize) -> Self {
        self.payload_items = payload_items;
        self
    }

    /// Set the synchronization strategy.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the busy-wait policy.
    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Set the per-pair channel capacity.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Make `rank` send only `items` items per slot.
    pub fn with_short_node(mut self, rank: usize, items: usize) -> Self {
        self.short_node = Some((rank, items));
        self
    }

    /// Enable per-slot tracing.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of measured slots in the run. The warm-up cycle is not
    /// counted.
    pub fn total_slots(&self) -> usize {
        (self.run_us / self.slot_us) as usize
    }

    /// Reject invalid configurations before any thread is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.comm_nodes < 2 {
            return Err(Error::InvalidConfig(format!(
                "need at least 2 communicating nodes, got {}",
                self.comm_nodes
            )));
        }
        if self.slot_us == 0 {
            return Err(Error::InvalidConfig("slot duration must be positive".into()));
        }
        if self.run_us == 0 {
            return Err(Error::InvalidConfig("run duration must be positive".into()));
        }
        if self.run_us < self.slot_us {
            return Err(Error::InvalidConfig(format!(
                "run duration {} us is shorter than one slot ({} us)",
                self.run_us, self.slot_us
            )));
        }
        if self.payload_items == 0 {
            return Err(Error::InvalidConfig("payload must be at least 1 item".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::InvalidConfig("channel capacity must be positive".into()));
        }
        if let Some((rank, items)) = self.short_node {
            if rank == 0 || rank > self.comm_nodes {
                return Err(Error::InvalidConfig(format!(
                    "short node rank {} is not a communicating node (1..={})",
                    rank, self.comm_nodes
                )));
            }
            if items == 0 || items > self.payload_items {
                return Err(Error::InvalidConfig(format!(
                    "short node item count {} must be in 1..={}",
                    items, self.payload_items
                )));
            }
        }
        Ok(())
    }
}
