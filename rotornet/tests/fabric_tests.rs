//! Threaded integration tests for the fabric, barrier, and clock together.

use std::sync::Arc;
use std::thread;

use rotornet::{create_fabric, Clock, FabricConfig, ManualClock, SpinBarrier, WaitPolicy};

#[test]
fn test_ring_pass() {
    // Each node sends its ID around a ring; after n - 1 hops every node has
    // seen every other ID in order.
    let n = 4;
    let ports = create_fabric::<u64>(
        n,
        &FabricConfig {
            capacity: 16,
            wait: WaitPolicy::Yield,
        },
    );

    let mut handles = Vec::new();
    for mut port in ports {
        handles.push(thread::spawn(move || {
            let id = port.id();
            let next = (id + 1) % n;
            let prev = (id + n - 1) % n;

            let mut token = id as u64;
            let mut seen = vec![token];
            for _ in 0..n - 1 {
                port.send(next, token).unwrap();
                token = port.recv(prev).unwrap();
                seen.push(token);
            }
            seen
        }));
    }

    for h in handles {
        let seen = h.join().unwrap();
        assert_eq!(seen.len(), n);
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), n);
    }
}

#[test]
fn test_nonblocking_exchange_with_barrier() {
    // Two nodes post irecv + isend, then poll both to completion, repeating
    // for several barrier-separated rounds.
    let ports = create_fabric::<u64>(
        2,
        &FabricConfig {
            capacity: 4,
            wait: WaitPolicy::Yield,
        },
    );
    let barrier = Arc::new(SpinBarrier::new(2, WaitPolicy::Yield));

    let mut handles = Vec::new();
    for mut port in ports {
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let id = port.id();
            let peer = 1 - id;
            for round in 0..50u64 {
                barrier.wait();
                let mut rh = port.irecv(peer).unwrap();
                let mut sh = port.isend(peer, round * 10 + id as u64).unwrap();
                let mut got = None;
                while got.is_none() || !sh.is_complete() {
                    if got.is_none() {
                        got = port.test_recv(&mut rh).unwrap();
                    }
                    if !sh.is_complete() {
                        port.test_send(&mut sh).unwrap();
                    }
                    WaitPolicy::Yield.relax();
                }
                assert_eq!(got.unwrap(), round * 10 + peer as u64);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn test_manual_clock_across_threads() {
    let manual = ManualClock::new();
    let clock = manual.clock();

    let reader = {
        let clock = clock.clone();
        thread::spawn(move || {
            while clock.now_us() < 500 {
                thread::yield_now();
            }
            clock.now_us()
        })
    };

    manual.advance(200);
    manual.advance(300);
    assert_eq!(reader.join().unwrap(), 500);
}

#[test]
fn test_steady_clock_orders_barrier_rounds() {
    let clock = Clock::steady();
    let barrier = Arc::new(SpinBarrier::new(2, WaitPolicy::Yield));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let clock = clock.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let mut stamps = Vec::new();
            for _ in 0..5 {
                barrier.wait();
                stamps.push(clock.now_us());
            }
            stamps
        }));
    }

    let a = handles.pop().unwrap().join().unwrap();
    let b = handles.pop().unwrap().join().unwrap();
    // Rounds are separated by barriers, so round i on one thread cannot
    // trail round i + 1 on the other.
    for i in 0..4 {
        assert!(a[i] <= b[i + 1]);
        assert!(b[i] <= a[i + 1]);
    }
}
