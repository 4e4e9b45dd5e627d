// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! The dangerous pattern in this system is the two-lock acquisition in
//! transfers: two workers moving money between the same pair of accounts in
//! opposite directions would deadlock if either trusted caller-supplied
//! order. These tests hammer exactly that pattern, plus the blocked-consumer
//! shutdown handshake, with the detector watching for cycles in the lock
//! graph.

use bank_sim_rs::{AccountId, Bank, Simulation, SimulationConfig, WithdrawOutcome};
use parking_lot::deadlock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// The classic circular-wait setup: half the threads transfer 0 -> 1, the
/// other half 1 -> 0, with delays held inside the critical section. The fixed
/// acquisition order must keep them all moving.
#[test]
fn no_deadlock_opposed_transfers_on_one_pair() {
    let detector = start_deadlock_detector();
    let bank = Arc::new(Bank::new(2));
    bank.deposit(AccountId(0), 1_000, Duration::ZERO);
    bank.deposit(AccountId(1), 1_000, Duration::ZERO);

    const NUM_THREADS: usize = 16;
    const TRANSFERS_PER_THREAD: usize = 200;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let bank = bank.clone();

        let handle = thread::spawn(move || {
            let (from, to) = if thread_id % 2 == 0 {
                (AccountId(0), AccountId(1))
            } else {
                (AccountId(1), AccountId(0))
            };
            for _ in 0..TRANSFERS_PER_THREAD {
                bank.transfer_with(from, to, Duration::from_micros(1), |balance| balance / 3);
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert_eq!(bank.total(), 2_000);
    println!(
        "Opposed transfer test passed: {} threads x {} transfers",
        NUM_THREADS, TRANSFERS_PER_THREAD
    );
}

/// Transfers around a ring of accounts, with each thread walking the ring in
/// the opposite direction of its neighbor so every adjacent pair is taken in
/// both orders.
#[test]
fn no_deadlock_ring_of_overlapping_pairs() {
    let detector = start_deadlock_detector();

    const NUM_ACCOUNTS: usize = 5;
    const NUM_THREADS: usize = 10;
    const TRANSFERS_PER_THREAD: usize = 200;

    let bank = Arc::new(Bank::new(NUM_ACCOUNTS));
    for account in 0..NUM_ACCOUNTS {
        bank.deposit(AccountId(account), 100, Duration::ZERO);
    }

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let bank = bank.clone();

        let handle = thread::spawn(move || {
            for i in 0..TRANSFERS_PER_THREAD {
                let here = (thread_id + i) % NUM_ACCOUNTS;
                let next = (here + 1) % NUM_ACCOUNTS;
                let (from, to) = if thread_id % 2 == 0 {
                    (AccountId(here), AccountId(next))
                } else {
                    (AccountId(next), AccountId(here))
                };
                bank.transfer_with(from, to, Duration::ZERO, |balance| balance / 2);
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert_eq!(bank.total(), (NUM_ACCOUNTS as u64) * 100);
    println!(
        "Ring transfer test passed: {} accounts, {} threads",
        NUM_ACCOUNTS, NUM_THREADS
    );
}

/// Producers and a blocked consumer interleaving on a single account.
#[test]
fn no_deadlock_high_contention_single_account() {
    let detector = start_deadlock_detector();
    let bank = Arc::new(Bank::new(1));

    const NUM_THREADS: usize = 20;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let bank = bank.clone();

        let handle = thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                if thread_id % 2 == 0 {
                    bank.deposit(AccountId(0), 2, Duration::ZERO);
                } else {
                    // Plenty of depositors are running, so this commits.
                    bank.withdraw_blocking(AccountId(0), 1, Duration::ZERO);
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // 10 depositor threads add 200 each; 10 withdrawer threads remove 100 each.
    assert_eq!(bank.total(), 10 * 200 - 10 * 100);
    println!(
        "High contention test passed: {} threads x {} ops",
        NUM_THREADS, OPS_PER_THREAD
    );
}

/// Withdrawers parked on empty accounts must all reach a terminal state once
/// shutdown is raised and broadcast; none may stay parked.
#[test]
fn withdrawers_terminate_after_shutdown_broadcast() {
    let detector = start_deadlock_detector();
    let bank = Arc::new(Bank::new(4));

    const NUM_WITHDRAWERS: usize = 12;

    let mut handles = Vec::with_capacity(NUM_WITHDRAWERS);

    for thread_id in 0..NUM_WITHDRAWERS {
        let bank = bank.clone();
        handles.push(thread::spawn(move || {
            bank.withdraw_blocking(AccountId(thread_id % 4), 10, Duration::ZERO)
        }));
    }

    // Let everyone park, then run the handshake.
    thread::sleep(Duration::from_millis(200));
    bank.begin_shutdown();

    for handle in handles {
        assert_eq!(handle.join().expect("Thread panicked"), WithdrawOutcome::Abandoned);
    }

    stop_deadlock_detector(detector);
    println!("Shutdown liveness test passed: {} withdrawers released", NUM_WITHDRAWERS);
}

/// A full simulation with a tiny bank maximizes lock overlap across all three
/// protocols at once.
#[test]
fn no_deadlock_full_simulation_on_tiny_bank() {
    let detector = start_deadlock_detector();

    let report = Simulation::new(SimulationConfig {
        workers_per_role: 8,
        accounts: 2,
        iterations: 150,
        step_delay: Duration::ZERO,
        seed: Some(7),
        verbose: false,
    })
    .unwrap()
    .run()
    .unwrap();

    stop_deadlock_detector(detector);

    assert_eq!(
        report.bank_total(),
        report.total_deposited() - report.total_withdrawn()
    );
    println!(
        "Full simulation test passed: {} workers",
        report.workers().len()
    );
}
