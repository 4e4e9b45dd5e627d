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

//! The coordinator: spawns the worker populations, runs the shutdown
//! handshake, and collects the final report.
//!
//! # Lifecycle
//!
//! 1. Allocate the [`Bank`] (all balances zero).
//! 2. Spawn N deposit, N transfer, and N withdraw workers, ids numbered by
//!    role block.
//! 3. Join the producers (deposit + transfer).
//! 4. Raise the shutdown flag and broadcast to every account, mandatory
//!    even if no withdrawer is currently blocked.
//! 5. Join the consumers (withdraw).
//! 6. Snapshot balances and hand everything to the report.
//!
//! Workers borrow the bank through a [`crossbeam::thread::scope`], which
//! guarantees every thread is joined before the bank is dropped.

use crate::bank::Bank;
use crate::base::WorkerId;
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::report::SimulationReport;
use crate::worker::{Worker, WorkerRecord, WorkerRole};

/// A validated, runnable simulation.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    /// Validates the configuration and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::NoAccounts`] for a zero-account bank.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs the full simulation to completion.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Spawn`] if the OS refuses a worker thread. Any
    ///   workers already running are released (shutdown is raised) before the
    ///   error is returned.
    /// - [`SimulationError::WorkerPanicked`] if any worker dies before
    ///   handing back its record. The remaining workers are still joined
    ///   first; the shutdown broadcast is raised regardless, so no consumer
    ///   is left blocked.
    pub fn run(&self) -> Result<SimulationReport, SimulationError> {
        let bank = Bank::new(self.config.accounts);
        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        let per_role = self.config.workers_per_role;

        let records = crossbeam::thread::scope(|scope| {
            let mut producers = Vec::with_capacity(2 * per_role);
            let mut consumers = Vec::with_capacity(per_role);

            let roles = [
                WorkerRole::Deposit,
                WorkerRole::Transfer,
                WorkerRole::Withdraw,
            ];
            for (block, role) in roles.into_iter().enumerate() {
                for slot in 0..per_role {
                    let id = WorkerId(block * per_role + slot);
                    let worker =
                        Worker::new(id, role, &self.config, base_seed.wrapping_add(id.0 as u64));
                    let bank = &bank;

                    let spawned = scope
                        .builder()
                        .name(format!("{role}-{id}"))
                        .spawn(move |_| worker.run(bank));
                    let handle = match spawned {
                        Ok(handle) => handle,
                        Err(source) => {
                            // Release any withdrawer already blocked before
                            // surfacing the failure; nothing else will.
                            bank.begin_shutdown();
                            return Err(SimulationError::Spawn(source));
                        }
                    };

                    if role == WorkerRole::Withdraw {
                        consumers.push(handle);
                    } else {
                        producers.push(handle);
                    }
                }
            }

            let mut records: Vec<WorkerRecord> = Vec::with_capacity(3 * per_role);
            let mut panicked = false;

            for handle in producers {
                match handle.join() {
                    Ok(record) => records.push(record),
                    Err(_) => panicked = true,
                }
            }

            // Producers are done; release every withdrawer still blocked on
            // insufficient funds. Raised even when nobody is waiting.
            bank.begin_shutdown();

            for handle in consumers {
                match handle.join() {
                    Ok(record) => records.push(record),
                    Err(_) => panicked = true,
                }
            }

            if panicked {
                return Err(SimulationError::WorkerPanicked);
            }
            Ok(records)
        })
        .map_err(|_| SimulationError::WorkerPanicked)??;

        Ok(SimulationReport::new(bank.balances(), records))
    }
}
