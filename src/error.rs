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

//! Error types for the simulation.
//!
//! Running out of funds is not an error: a withdrawal that never sees enough
//! money ends in [`WithdrawOutcome::Abandoned`] and is reported like any other
//! result.
//!
//! [`WithdrawOutcome::Abandoned`]: crate::worker::WithdrawOutcome::Abandoned

use thiserror::Error;

/// Fatal conditions while setting up or running a simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The bank must hold at least one account
    #[error("bank must have at least one account")]
    NoAccounts,

    /// The operating system refused to spawn a worker thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker thread panicked before handing back its record
    #[error("a worker thread panicked")]
    WorkerPanicked,
}
