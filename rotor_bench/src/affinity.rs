//! CPU affinity for node threads.
//!
//! Cores are assigned downward from a configured start core: the
//! coordinator gets `start_core`, rank r gets `start_core - r`.

/// Compute the core for a rank, assigning downward from `start_core`.
fn core_for_rank(start_core: usize, rank: usize) -> usize {
    assert!(
        rank <= start_core,
        "affinity error: rank {} needs a core below start core {}",
        rank,
        start_core
    );
    start_core - rank
}

fn pin_to_core(core_id: usize) -> Result<(), i32> {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core_id, &mut set);
        let ret = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if ret == 0 {
            Ok(())
        } else {
            Err(*libc::__errno_location())
        }
    }
}

/// Pin the current thread for `rank` if a start core is configured. Does
/// nothing if `start_core` is None; a failed pin is reported, not fatal.
pub fn pin_if_configured(start_core: Option<usize>, rank: usize) {
    let Some(start) = start_core else {
        return;
    };
    let core_id = core_for_rank(start, rank);
    match pin_to_core(core_id) {
        Ok(()) => {
            eprintln!("rank {} pinned to core {}", rank, core_id);
        }
        Err(errno) => {
            eprintln!(
                "rank {}: failed to pin to core {} (errno={})",
                rank, core_id, errno
            );
        }
    }
}
