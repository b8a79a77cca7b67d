//! Run orchestration.
//!
//! One OS thread per communicating node, the coordinator on the calling
//! thread. All cross-node coordination goes through the fabric's channels
//! and barrier; node measurements come back by thread-join return value
//! and are merged into the coordinator-owned table.

use std::sync::Arc;
use std::thread;

use rotornet::{create_fabric, Clock, FabricConfig, Port, SpinBarrier};

use crate::affinity;
use crate::collector::{self, SlotTable};
use crate::config::{Mode, RunConfig};
use crate::error::{send_failed, Error, Result};
use crate::kernel::{CommNode, NodeStats, Payload};
use crate::matching::MatchingTable;
use crate::report::RunReport;
use crate::sync::{BarrierTrigger, ClockTrigger, SlotTrigger};
use crate::COORDINATOR;

/// Execute one full benchmark run and return its report.
pub fn run(cfg: &RunConfig) -> Result<RunReport> {
    cfg.validate()?;
    let matching = Arc::new(MatchingTable::generate(cfg.comm_nodes)?);

    let participants = cfg.comm_nodes + 1;
    let fabric_cfg = FabricConfig {
        capacity: cfg.channel_capacity,
        wait: cfg.wait,
    };
    let mut ports = create_fabric::<Payload>(participants, &fabric_cfg);
    let barrier = Arc::new(SpinBarrier::new(participants, cfg.wait));
    let clock = Clock::steady();

    let mut coordinator_port = ports.remove(COORDINATOR);
    let mut workers = Vec::with_capacity(cfg.comm_nodes);
    for (idx, port) in ports.into_iter().enumerate() {
        let rank = idx + 1;
        let matching = Arc::clone(&matching);
        let barrier = Arc::clone(&barrier);
        let clock = clock.clone();
        let cfg = cfg.clone();
        let handle = thread::Builder::new()
            .name(format!("rotor-node-{}", rank))
            .spawn(move || comm_node_main(rank, port, matching, barrier, clock, cfg))
            .map_err(Error::Spawn)?;
        workers.push(handle);
    }

    affinity::pin_if_configured(cfg.affinity_start, COORDINATOR);

    let mut table = SlotTable::new(cfg.comm_nodes, cfg.total_slots());
    match cfg.mode {
        Mode::Pairwise => collector::run_pairwise_coordinator(&barrier, &clock, cfg)?,
        Mode::Acked => {
            collector::run_acked_coordinator(&mut coordinator_port, &barrier, &clock, cfg, &mut table)?
        }
        Mode::Staggered => collector::run_staggered_coordinator(
            &mut coordinator_port,
            &barrier,
            &clock,
            cfg,
            &mut table,
        )?,
    }

    let mut short_deliveries = 0;
    for (idx, handle) in workers.into_iter().enumerate() {
        let rank = idx + 1;
        let stats = handle
            .join()
            .map_err(|_| Error::WorkerPanicked { rank })?;
        short_deliveries += stats.mismatches;
        if cfg.mode == Mode::Pairwise {
            // Node-measured outcomes fill the table in this mode.
            for outcome in &stats.outcomes {
                table.record(rank, outcome.slot, outcome.items as u32, outcome.recv_done_us);
            }
        }
    }

    Ok(RunReport::new(cfg.mode, table, short_deliveries))
}

/// Node thread entry point. A transport failure is fatal to the whole run:
/// diagnostic to stderr, non-zero exit.
fn comm_node_main(
    rank: usize,
    port: Port<Payload>,
    matching: Arc<MatchingTable>,
    barrier: Arc<SpinBarrier>,
    clock: Clock,
    cfg: RunConfig,
) -> NodeStats {
    match comm_node_run(rank, port, matching, barrier, clock, &cfg) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("rotor_bench: rank {}: fatal: {}", rank, e);
            std::process::exit(1);
        }
    }
}

fn comm_node_run(
    rank: usize,
    mut port: Port<Payload>,
    matching: Arc<MatchingTable>,
    barrier: Arc<SpinBarrier>,
    clock: Clock,
    cfg: &RunConfig,
) -> Result<NodeStats> {
    affinity::pin_if_configured(cfg.affinity_start, rank);
    let total = cfg.total_slots();

    match cfg.mode {
        Mode::Pairwise | Mode::Acked => {
            let ack = cfg.mode == Mode::Acked;
            let mut node = CommNode::new(rank, port, matching, clock, cfg);

            barrier.wait(); // ready
            node.run_slot(0, ack)?; // warm-up cycle, unmeasured
            barrier.wait(); // warm-up done
            node.reset_mismatches();

            let mut outcomes = Vec::with_capacity(total);
            let mut trigger = BarrierTrigger::new(barrier, total);
            while let Some(slot) = trigger.await_slot() {
                outcomes.push(node.run_slot(slot, ack)?);
            }
            Ok(NodeStats {
                outcomes,
                mismatches: node.mismatches(),
            })
        }
        Mode::Staggered => {
            barrier.wait(); // ready
            let offset_us = cfg.slot_us / cfg.comm_nodes as u64;
            let mut trigger = ClockTrigger::new(
                clock,
                cfg.wait,
                cfg.slot_us,
                total,
                (rank as u64 - 1) * offset_us,
            );
            while trigger.await_slot().is_some() {
                port.send(COORDINATOR, vec![1])
                    .map_err(|e| send_failed(rank, COORDINATOR, e))?;
            }
            Ok(NodeStats::default())
        }
    }
}
