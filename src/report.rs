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

//! Final state of a finished simulation.
//!
//! Built by the coordinator after every worker has joined, so nothing in
//! here is shared or locked. Formatting and printing belong to the binary.

use crate::base::AccountId;
use crate::worker::{WithdrawOutcome, WorkerRecord, WorkerRole};
use serde::Serialize;

/// Final balances and per-worker results of one simulation run.
#[derive(Debug)]
pub struct SimulationReport {
    balances: Vec<u64>,
    workers: Vec<WorkerRecord>,
}

impl SimulationReport {
    pub fn new(balances: Vec<u64>, workers: Vec<WorkerRecord>) -> Self {
        Self { balances, workers }
    }

    /// Final balance of every account, in account order.
    pub fn balances(&self) -> &[u64] {
        &self.balances
    }

    /// Every worker record, in worker-id order.
    pub fn workers(&self) -> &[WorkerRecord] {
        &self.workers
    }

    /// Records of one role, in worker-id order.
    pub fn workers_in_role(&self, role: WorkerRole) -> impl Iterator<Item = &WorkerRecord> {
        self.workers.iter().filter(move |record| record.role == role)
    }

    /// Sum of all final balances.
    pub fn bank_total(&self) -> u64 {
        self.balances.iter().sum()
    }

    /// Sum of every deposit worker's net total.
    pub fn total_deposited(&self) -> u64 {
        self.role_total(WorkerRole::Deposit)
    }

    /// Sum of every transfer worker's net total. Transfers move money around
    /// without changing the bank total.
    pub fn total_transferred(&self) -> u64 {
        self.role_total(WorkerRole::Transfer)
    }

    /// Sum of every committed withdrawal; abandoned attempts contribute zero.
    pub fn total_withdrawn(&self) -> u64 {
        self.role_total(WorkerRole::Withdraw)
    }

    /// Number of withdraw workers that reached the given terminal state.
    pub fn withdrawals_with_outcome(&self, outcome: WithdrawOutcome) -> usize {
        self.workers_in_role(WorkerRole::Withdraw)
            .filter(|record| record.outcome == Some(outcome))
            .count()
    }

    fn role_total(&self, role: WorkerRole) -> u64 {
        self.workers_in_role(role).map(|record| record.net_total).sum()
    }

    /// Rows for CSV export of the final balances.
    pub fn balance_rows(&self) -> impl Iterator<Item = BalanceRow> + '_ {
        self.balances
            .iter()
            .enumerate()
            .map(|(index, &balance)| BalanceRow {
                account: AccountId(index),
                balance,
            })
    }
}

/// One line of the balances CSV: `account,balance`.
#[derive(Debug, Serialize)]
pub struct BalanceRow {
    pub account: AccountId,
    pub balance: u64,
}
