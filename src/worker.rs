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

//! Worker roles and their driving loops.
//!
//! Three roles run against the shared [`Bank`]:
//!
//! - **Deposit** and **Transfer** workers are producers: they run for a
//!   configured number of iterations and never block waiting for funds.
//! - **Withdraw** workers are consumers: each one performs exactly one
//!   withdrawal attempt, blocking while funds are short. The single-attempt
//!   shape is part of the simulated workload; the per-worker net totals
//!   reported at the end depend on it.
//!
//! A worker owns its [`WorkerRecord`] while running; the coordinator reads it
//! only after the thread has joined, so the record carries no lock.

use crate::bank::Bank;
use crate::base::{AccountId, WorkerId};
use crate::config::SimulationConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::Duration;

/// Upper bound (exclusive) for deposit and withdrawal amounts.
pub const MAX_AMOUNT: u64 = 20;

/// The job a worker thread performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    Deposit,
    Transfer,
    Withdraw,
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Transfer => write!(f, "transfer"),
            Self::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// Terminal state of a withdrawal attempt.
///
/// `Committed` means the debit was applied. `Abandoned` means shutdown was
/// observed while funds were still insufficient; the account was not touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Committed,
    Abandoned,
}

impl fmt::Display for WithdrawOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => write!(f, "committed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Per-worker state, exclusively owned by the worker until it joins.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub role: WorkerRole,
    /// Iteration budget for producer roles; withdrawers ignore it.
    pub iterations: u32,
    /// Simulated processing delay applied between balance read and write.
    pub delay: Duration,
    /// Net amount deposited, transferred, or withdrawn, depending on role.
    pub net_total: u64,
    /// Terminal state of the single attempt; withdraw workers only.
    pub outcome: Option<WithdrawOutcome>,
}

/// A worker thread's body: its record plus a private random stream.
///
/// Each worker is seeded independently, so with a fixed base seed the
/// sequence of draws any one worker makes is reproducible regardless of how
/// the threads interleave.
#[derive(Debug)]
pub struct Worker {
    record: WorkerRecord,
    rng: StdRng,
    verbose: bool,
}

impl Worker {
    pub fn new(id: WorkerId, role: WorkerRole, config: &SimulationConfig, seed: u64) -> Self {
        Self {
            record: WorkerRecord {
                id,
                role,
                iterations: config.iterations,
                delay: config.step_delay,
                net_total: 0,
                outcome: None,
            },
            rng: StdRng::seed_from_u64(seed),
            verbose: config.verbose,
        }
    }

    /// Runs the role protocol to completion and hands the record back.
    pub fn run(mut self, bank: &Bank) -> WorkerRecord {
        match self.record.role {
            WorkerRole::Deposit => self.run_deposits(bank),
            WorkerRole::Transfer => self.run_transfers(bank),
            WorkerRole::Withdraw => self.run_withdrawal(bank),
        }
        self.record
    }

    fn pick_account(&mut self, bank: &Bank) -> AccountId {
        AccountId(self.rng.gen_range(0..bank.len()))
    }

    fn run_deposits(&mut self, bank: &Bank) {
        for _ in 0..self.record.iterations {
            let amount = self.rng.gen_range(0..MAX_AMOUNT);
            let account = self.pick_account(bank);

            let balance = bank.deposit(account, amount, self.record.delay);
            self.record.net_total += amount;

            if self.verbose {
                println!(
                    "worker {} deposited {} into account {} (balance now {})",
                    self.record.id, amount, account, balance
                );
            }
        }
    }

    fn run_transfers(&mut self, bank: &Bank) {
        for _ in 0..self.record.iterations {
            let from = self.pick_account(bank);
            let to = self.pick_account(bank);

            // Coinciding draws consume the iteration without transferring.
            if from == to {
                continue;
            }

            let rng = &mut self.rng;
            let moved = bank.transfer_with(from, to, self.record.delay, |balance| {
                rng.gen_range(0..=balance)
            });
            self.record.net_total += moved;

            if self.verbose {
                println!(
                    "worker {} moved {} from account {} to account {}",
                    self.record.id, moved, from, to
                );
            }
        }
    }

    fn run_withdrawal(&mut self, bank: &Bank) {
        let amount = self.rng.gen_range(0..MAX_AMOUNT);
        let account = self.pick_account(bank);

        let outcome = bank.withdraw_blocking(account, amount, self.record.delay);
        if outcome == WithdrawOutcome::Committed {
            self.record.net_total = amount;
        }
        self.record.outcome = Some(outcome);

        if self.verbose {
            match outcome {
                WithdrawOutcome::Committed => println!(
                    "worker {} withdrew {} from account {}",
                    self.record.id, amount, account
                ),
                WithdrawOutcome::Abandoned => println!(
                    "worker {} gave up withdrawing {} from account {}",
                    self.record.id, amount, account
                ),
            }
        }
    }
}
