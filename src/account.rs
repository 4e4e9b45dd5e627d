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

//! A single account slot: one balance guarded by one lock, with a condition
//! variable for workers blocked on insufficient funds.
//!
//! The balance is only reachable through the [`Mutex`], so holding the guard
//! is both necessary and sufficient to read or write it. Waiters must re-check
//! their predicate in a loop around [`Account::wait`]; condition variables may
//! wake spuriously.

use parking_lot::{Condvar, Mutex, MutexGuard};

/// One slot in the bank's balance table.
#[derive(Debug, Default)]
pub struct Account {
    balance: Mutex<u64>,
    funds_changed: Condvar,
}

impl Account {
    /// Creates an account with a zero balance.
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(0),
            funds_changed: Condvar::new(),
        }
    }

    /// Acquires this account's lock, blocking until it is available.
    pub fn lock(&self) -> MutexGuard<'_, u64> {
        self.balance.lock()
    }

    /// Reads the balance under a fresh lock acquisition.
    pub fn balance(&self) -> u64 {
        *self.balance.lock()
    }

    /// Atomically releases the lock behind `guard` and parks the calling
    /// thread until the account is notified. The lock is re-held when this
    /// returns.
    ///
    /// Spurious wakeups are possible; callers loop on their predicate.
    pub fn wait(&self, guard: &mut MutexGuard<'_, u64>) {
        self.funds_changed.wait(guard);
    }

    /// Wakes every thread currently waiting on this account.
    pub fn notify_all(&self) {
        self.funds_changed.notify_all();
    }
}
