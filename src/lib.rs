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

//! # Bank Sim
//!
//! This library simulates a shared bank ledger hammered by concurrent worker
//! threads: depositors and transferrers produce and move funds, withdrawers
//! consume them, and a cooperative shutdown handshake releases any withdrawer
//! still blocked once the producers are done.
//!
//! ## Core Components
//!
//! - [`Bank`]: the shared ledger, one lock-guarded balance and condition
//!   variable per account, plus the one-shot shutdown flag
//! - [`Worker`]: a deposit, transfer, or withdraw thread body with its own
//!   seeded random stream
//! - [`Simulation`]: the coordinator that spawns, joins, and shuts down the
//!   worker populations
//! - [`SimulationReport`]: final balances and per-worker net totals
//!
//! ## Example
//!
//! ```
//! use bank_sim_rs::{Simulation, SimulationConfig};
//! use std::time::Duration;
//!
//! let config = SimulationConfig {
//!     workers_per_role: 2,
//!     accounts: 4,
//!     iterations: 10,
//!     step_delay: Duration::ZERO,
//!     seed: Some(42),
//!     verbose: false,
//! };
//!
//! let report = Simulation::new(config).unwrap().run().unwrap();
//!
//! // Money is conserved: what is left equals what came in minus what left.
//! assert_eq!(
//!     report.bank_total(),
//!     report.total_deposited() - report.total_withdrawn()
//! );
//! ```
//!
//! ## Thread Safety
//!
//! Holding an account's lock is necessary and sufficient to touch its
//! balance. Transfers take their two locks in a fixed index order, so no
//! pair of transfers can deadlock each other. The only suspension point is a
//! withdrawer waiting for funds, and the coordinator's shutdown broadcast
//! bounds that wait.

pub mod account;
pub mod bank;
mod base;
mod config;
pub mod error;
mod report;
mod simulation;
pub mod worker;

pub use account::Account;
pub use bank::Bank;
pub use base::{AccountId, WorkerId};
pub use config::SimulationConfig;
pub use error::SimulationError;
pub use report::{BalanceRow, SimulationReport};
pub use simulation::Simulation;
pub use worker::{WithdrawOutcome, Worker, WorkerRecord, WorkerRole, MAX_AMOUNT};
