use clap::{Parser, ValueEnum};

use rotor_bench::{run, Mode, RunConfig};
use rotornet::WaitPolicy;

#[derive(Parser, Debug)]
#[command(name = "rotor_bench")]
#[command(about = "Time-slotted rotor interconnect benchmark")]
struct Cli {
    /// Number of communicating nodes (excluding the coordinator)
    #[arg(short = 'n', long, default_value = "3")]
    nodes: usize,

    /// Slot duration in microseconds
    #[arg(long, default_value = "100000")]
    slot_us: u64,

    /// Total run duration in microseconds
    #[arg(short = 'd', long, default_value = "2000000")]
    run_us: u64,

    /// Payload size in items per slot
    #[arg(short = 's', long, default_value = "1")]
    payload: usize,

    /// Slot synchronization strategy
    #[arg(short = 'm', long, value_enum, default_value = "acked")]
    mode: ModeArg,

    /// Busy-wait policy for polling loops
    #[arg(long, value_enum, default_value = "spin")]
    wait: WaitArg,

    /// Per-pair channel capacity
    #[arg(long, default_value = "64")]
    capacity: usize,

    /// Make one node send fewer items than expected, as RANK:ITEMS
    #[arg(long, value_parser = parse_short_node)]
    short_node: Option<(usize, usize)>,

    /// Starting core for affinity pinning (cores assigned downward)
    #[arg(long)]
    affinity_start: Option<usize>,

    /// Per-slot completion tracing on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    /// Barrier-triggered slots, latency measured at each node
    Pairwise,
    /// Barrier-triggered slots with per-slot ACKs to the coordinator
    Acked,
    /// Staggered per-node slot clocks, coordinator timestamps arrivals
    Staggered,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Pairwise => Mode::Pairwise,
            ModeArg::Acked => Mode::Acked,
            ModeArg::Staggered => Mode::Staggered,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum WaitArg {
    /// Busy-spin between polls (lowest jitter, burns a core per node)
    Spin,
    /// Yield to the scheduler between polls
    Yield,
}

impl From<WaitArg> for WaitPolicy {
    fn from(wait: WaitArg) -> Self {
        match wait {
            WaitArg::Spin => WaitPolicy::Spin,
            WaitArg::Yield => WaitPolicy::Yield,
        }
    }
}

fn parse_short_node(s: &str) -> Result<(usize, usize), String> {
    let (rank, items) = s
        .split_once(':')
        .ok_or_else(|| format!("expected RANK:ITEMS, got '{}'", s))?;
    let rank = rank
        .parse()
        .map_err(|e| format!("bad rank in '{}': {}", s, e))?;
    let items = items
        .parse()
        .map_err(|e| format!("bad item count in '{}': {}", s, e))?;
    Ok((rank, items))
}

fn main() {
    let cli = Cli::parse();

    let cfg = RunConfig {
        comm_nodes: cli.nodes,
        slot_us: cli.slot_us,
        run_us: cli.run_us,
        payload_items: cli.payload,
        mode: cli.mode.into(),
        wait: cli.wait.into(),
        channel_capacity: cli.capacity,
        short_node: cli.short_node,
        affinity_start: cli.affinity_start,
        verbose: cli.verbose,
    };

    eprintln!(
        "rotor_bench: {} comm nodes, slot {} us, run {} us ({} slots), mode {:?}",
        cfg.comm_nodes,
        cfg.slot_us,
        cfg.run_us,
        cfg.total_slots(),
        cfg.mode
    );

    match run(&cfg) {
        Ok(report) => print!("{}", report),
        Err(e) => {
            eprintln!("rotor_bench: {}", e);
            std::process::exit(1);
        }
    }
}
