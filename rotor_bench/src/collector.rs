//! Measurement collection at the coordinator.
//!
//! `SlotTable` is a pre-allocated arena of per-(node, slot) records, owned
//! by the coordinator thread and written exactly once per record. The three
//! coordinator loops fill it according to the run's synchronization
//! strategy.

use rotornet::{Clock, Port, RecvError, SpinBarrier};

use crate::config::RunConfig;
use crate::error::{recv_failed, Result};
use crate::kernel::Payload;
use crate::sync::{ClockTrigger, SlotTrigger};
use crate::COORDINATOR;

/// Per-(node, slot) measurement arena.
///
/// Indexed by communicating-node rank (`1..=nodes`) and slot index.
pub struct SlotTable {
    nodes: usize,
    slots: usize,
    items: Box<[u32]>,
    times_us: Box<[u64]>,
    written: Box<[bool]>,
}

impl SlotTable {
    /// Pre-allocate a table for `nodes` communicating nodes and `slots`
    /// measured slots.
    pub fn new(nodes: usize, slots: usize) -> Self {
        Self {
            nodes,
            slots,
            items: vec![0; nodes * slots].into_boxed_slice(),
            times_us: vec![0; nodes * slots].into_boxed_slice(),
            written: vec![false; nodes * slots].into_boxed_slice(),
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    fn index(&self, rank: usize, slot: usize) -> usize {
        assert!(
            (1..=self.nodes).contains(&rank) && slot < self.slots,
            "record ({}, {}) outside {}x{} table",
            rank,
            slot,
            self.nodes,
            self.slots
        );
        (rank - 1) * self.slots + slot
    }

    /// Record the measurement for `(rank, slot)`. Each record is written
    /// exactly once.
    pub fn record(&mut self, rank: usize, slot: usize, items: u32, time_us: u64) {
        let idx = self.index(rank, slot);
        debug_assert!(
            !self.written[idx],
            "record ({}, {}) written twice",
            rank,
            slot
        );
        self.items[idx] = items;
        self.times_us[idx] = time_us;
        self.written[idx] = true;
    }

    /// Item counts for one node, slot by slot.
    pub fn items_row(&self, rank: usize) -> &[u32] {
        let start = self.index(rank, 0);
        &self.items[start..start + self.slots]
    }

    /// Completion times for one node, slot by slot.
    pub fn times_row(&self, rank: usize) -> &[u64] {
        let start = self.index(rank, 0);
        &self.times_us[start..start + self.slots]
    }
}

/// Barrier-triggered coordinator without ACK collection. Measurements come
/// back from the nodes themselves at join.
pub fn run_pairwise_coordinator(
    barrier: &SpinBarrier,
    clock: &Clock,
    cfg: &RunConfig,
) -> Result<()> {
    barrier.wait(); // nodes ready
    let warmup_start = clock.now_us();
    barrier.wait(); // warm-up cycle done
    eprintln!(
        "warmup finished in {} us",
        clock.now_us() - warmup_start
    );

    let mut boundary = ClockTrigger::new(clock.clone(), cfg.wait, cfg.slot_us, cfg.total_slots(), 0);
    while boundary.await_slot().is_some() {
        barrier.wait(); // trigger slot start
    }
    Ok(())
}

/// Barrier-triggered coordinator collecting per-slot ACKs from every node.
pub fn run_acked_coordinator(
    port: &mut Port<Payload>,
    barrier: &SpinBarrier,
    clock: &Clock,
    cfg: &RunConfig,
    table: &mut SlotTable,
) -> Result<()> {
    let nodes = cfg.comm_nodes;

    barrier.wait(); // nodes ready
    let warmup_start = clock.now_us();
    // Drain the warm-up ACKs with blocking receives.
    for rank in 1..=nodes {
        port.recv(rank)
            .map_err(|e| recv_failed(COORDINATOR, rank, e))?;
    }
    barrier.wait(); // warm-up cycle done
    eprintln!(
        "warmup finished in {} us",
        clock.now_us() - warmup_start
    );

    let mut boundary = ClockTrigger::new(clock.clone(), cfg.wait, cfg.slot_us, cfg.total_slots(), 0);
    while let Some(slot) = boundary.await_slot() {
        let trigger_us = clock.now_us();
        barrier.wait(); // trigger slot start

        // One outstanding receive per node, polled round-robin until every
        // ACK for this slot has arrived.
        let mut handles = Vec::with_capacity(nodes);
        for rank in 1..=nodes {
            handles.push(
                port.irecv(rank)
                    .map_err(|e| recv_failed(COORDINATOR, rank, e))?,
            );
        }
        let mut acked = 0;
        while acked < nodes {
            for (i, handle) in handles.iter_mut().enumerate() {
                if handle.is_complete() {
                    continue;
                }
                let rank = i + 1;
                match port.test_recv(handle) {
                    Ok(Some(msg)) => {
                        let items = msg.first().copied().unwrap_or(0);
                        table.record(rank, slot, items, clock.now_us() - trigger_us);
                        acked += 1;
                    }
                    Ok(None) => {}
                    Err(e) => return Err(recv_failed(COORDINATOR, rank, e)),
                }
            }
            cfg.wait.relax();
        }
    }
    Ok(())
}

/// Passive coordinator for the staggered mode: probes every node's inbound
/// queue, timestamping each heartbeat against the run start and advancing
/// that node's slot counter. Terminates once every node has delivered
/// `total_slots` heartbeats.
pub fn run_staggered_coordinator(
    port: &mut Port<Payload>,
    barrier: &SpinBarrier,
    clock: &Clock,
    cfg: &RunConfig,
    table: &mut SlotTable,
) -> Result<()> {
    let nodes = cfg.comm_nodes;
    let total = cfg.total_slots();

    barrier.wait(); // nodes ready
    let start_us = clock.now_us();

    let mut current_slot = vec![0usize; nodes];
    let mut remaining = nodes * total;
    while remaining > 0 {
        for (i, slot) in current_slot.iter_mut().enumerate() {
            if *slot == total {
                continue;
            }
            let rank = i + 1;
            match port.try_recv(rank) {
                Ok(msg) => {
                    table.record(rank, *slot, msg.len() as u32, clock.now_us() - start_us);
                    *slot += 1;
                    remaining -= 1;
                }
                Err(RecvError::Empty) => {}
                Err(e) => return Err(recv_failed(COORDINATOR, rank, e)),
            }
        }
        cfg.wait.relax();
    }
    Ok(())
}
