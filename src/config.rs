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

//! Simulation parameters.

use crate::error::SimulationError;
use std::time::Duration;

/// Everything the coordinator needs to run a simulation.
///
/// The defaults match the classic workload: 5 workers per role, 10 accounts,
/// 100 iterations per producer, and a 10 µs simulated processing delay.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Workers spawned per role; the run uses `3 * workers_per_role` threads.
    pub workers_per_role: usize,
    /// Number of accounts in the bank; must be at least 1.
    pub accounts: usize,
    /// Iteration budget for each deposit and transfer worker.
    pub iterations: u32,
    /// Sleep inserted between a balance read and its write-back while the
    /// account lock is held. Zero disables the sleeps.
    pub step_delay: Duration,
    /// Base RNG seed. `None` seeds from entropy; a fixed value makes each
    /// worker's draw sequence reproducible.
    pub seed: Option<u64>,
    /// Narrate each operation to stdout.
    pub verbose: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers_per_role: 5,
            accounts: 10,
            iterations: 100,
            step_delay: Duration::from_micros(10),
            seed: None,
            verbose: false,
        }
    }
}

impl SimulationConfig {
    /// Checks the parameters a simulation cannot run without.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::NoAccounts`] if the bank would be empty;
    /// workers pick accounts uniformly at random and need at least one.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.accounts == 0 {
            return Err(SimulationError::NoAccounts);
        }
        Ok(())
    }
}
