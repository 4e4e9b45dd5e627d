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

//! The shared bank: a fixed table of accounts plus the one-shot shutdown
//! flag that releases withdrawers still blocked once the producers are done.
//!
//! # Locking
//!
//! Every balance lives behind its own [`Account`] lock. Single-account
//! operations acquire exactly one lock; transfers acquire two via
//! [`Bank::lock_pair`], which always takes the higher-indexed lock first no
//! matter which order the caller supplied. Two transfers touching the same
//! pair of accounts in opposite directions therefore always contend for the
//! same lock first, which rules out the circular wait.
//!
//! # Shutdown
//!
//! [`Bank::begin_shutdown`] flips the flag and then broadcasts on every
//! account. The broadcast is taken under each account's lock so a withdrawer
//! that has tested the flag but not yet parked cannot miss its wakeup.
//!
//! # Simulated delays
//!
//! The mutating operations accept a per-step delay that is slept *while the
//! lock is held*, between the read and the write of a balance. A zero delay
//! disables the sleeps; a non-zero delay widens the window in which another
//! worker can contend for the same account.

use crate::account::Account;
use crate::base::AccountId;
use crate::worker::WithdrawOutcome;
use parking_lot::MutexGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Sleeps for one simulated processing step, if delays are enabled.
fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// The shared ledger: one lock-guarded balance per account.
///
/// Created once by the coordinator before any worker starts and dropped after
/// every worker has joined. All balances start at zero.
#[derive(Debug)]
pub struct Bank {
    accounts: Vec<Account>,
    shutdown: AtomicBool,
}

impl Bank {
    /// Creates a bank with `num_accounts` zero-balance accounts.
    pub fn new(num_accounts: usize) -> Self {
        let mut accounts = Vec::with_capacity(num_accounts);
        accounts.resize_with(num_accounts, Account::new);
        Self {
            accounts,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Number of accounts in the bank.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Borrows a single account slot.
    pub fn account(&self, id: AccountId) -> &Account {
        &self.accounts[id.0]
    }

    /// Acquires the lock of one account.
    pub fn lock(&self, id: AccountId) -> MutexGuard<'_, u64> {
        self.accounts[id.0].lock()
    }

    /// Acquires the locks of two distinct accounts without deadlock risk.
    ///
    /// The underlying locks are taken in a fixed total order (higher index
    /// first), never in the order the caller supplied. The guards are handed
    /// back in caller order, so `lock_pair(a, b)` returns `(guard_a, guard_b)`
    /// regardless of which lock was taken first. Releasing happens in drop
    /// order, which is safe once acquisition order is consistent.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`; a single account never needs both locks.
    pub fn lock_pair(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> (MutexGuard<'_, u64>, MutexGuard<'_, u64>) {
        assert_ne!(a, b, "lock_pair requires two distinct accounts");

        let (hi, lo) = if a.0 > b.0 { (a, b) } else { (b, a) };
        let hi_guard = self.accounts[hi.0].lock();
        let lo_guard = self.accounts[lo.0].lock();

        if a.0 > b.0 {
            (hi_guard, lo_guard)
        } else {
            (lo_guard, hi_guard)
        }
    }

    /// Deposits `amount` into `account` and returns the new balance.
    ///
    /// Runs the full producer protocol: lock, read, simulated delay, add,
    /// write back, broadcast to any withdrawer blocked on this account,
    /// unlock.
    pub fn deposit(&self, account: AccountId, amount: u64, delay: Duration) -> u64 {
        let slot = &self.accounts[account.0];
        let mut balance = slot.lock();

        let read = *balance;
        pause(delay);
        let updated = read + amount;
        pause(delay);
        *balance = updated;
        pause(delay);

        slot.notify_all();
        updated
    }

    /// Moves funds between two distinct accounts and returns the amount moved.
    ///
    /// The amount is `pick(source_balance)`, capped at the source balance so
    /// the source can never be overdrawn; a transfer may legitimately move
    /// zero. Both locks are held for the whole operation, so the sum of the
    /// two balances is unchanged when they are released. The destination is
    /// broadcast before unlocking.
    ///
    /// # Panics
    ///
    /// Panics if `from == to` (see [`Bank::lock_pair`]).
    pub fn transfer_with(
        &self,
        from: AccountId,
        to: AccountId,
        delay: Duration,
        pick: impl FnOnce(u64) -> u64,
    ) -> u64 {
        let (mut src, mut dst) = self.lock_pair(from, to);
        let combined = *src + *dst;

        let amount = pick(*src).min(*src);
        pause(delay);
        *src -= amount;
        pause(delay);
        *dst += amount;
        pause(delay);

        debug_assert_eq!(*src + *dst, combined, "transfer must conserve funds");

        self.accounts[to.0].notify_all();
        amount
    }

    /// Withdraws `amount` from `account`, blocking while funds are short.
    ///
    /// While the balance is below `amount` and shutdown has not been
    /// signalled, the caller waits on the account's condition variable; the
    /// predicate is re-checked on every wakeup, so spurious wakeups and
    /// broadcasts for other waiters are harmless. Once the loop exits the
    /// balance is tested one final time: if funds suffice the debit is
    /// committed, otherwise the withdrawal is abandoned with no mutation.
    ///
    /// Termination relies on the coordinator calling [`Bank::begin_shutdown`]
    /// once the producers are done; there is no timeout.
    pub fn withdraw_blocking(
        &self,
        account: AccountId,
        amount: u64,
        delay: Duration,
    ) -> WithdrawOutcome {
        let slot = &self.accounts[account.0];
        let mut balance = slot.lock();

        while *balance < amount && !self.is_shutting_down() {
            slot.wait(&mut balance);
        }

        if *balance >= amount {
            let read = *balance;
            pause(delay);
            *balance = read - amount;
            pause(delay);
            WithdrawOutcome::Committed
        } else {
            WithdrawOutcome::Abandoned
        }
    }

    /// Raises the one-shot shutdown flag and wakes every waiter on every
    /// account.
    ///
    /// Each broadcast is taken under the account's lock. A withdrawer that
    /// observed the flag as unset did so while holding that lock, and `wait`
    /// releases it only at the moment the thread parks; acquiring the lock
    /// here therefore means every such withdrawer is parked and the notify
    /// reaches it. Broadcasting to all accounts, rather than tracking who
    /// waits where, is what guarantees forward progress.
    ///
    /// The flag never resets; calling this more than once only repeats the
    /// broadcast.
    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for slot in &self.accounts {
            let _guard = slot.lock();
            slot.notify_all();
        }
    }

    /// True once [`Bank::begin_shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Snapshot of every balance, each read under its own lock.
    ///
    /// Not an atomic snapshot across accounts; the coordinator only calls it
    /// after all workers have joined.
    pub fn balances(&self) -> Vec<u64> {
        self.accounts.iter().map(|slot| *slot.lock()).collect()
    }

    /// Sum of all balances, via [`Bank::balances`].
    pub fn total(&self) -> u64 {
        self.balances().iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const NO_DELAY: Duration = Duration::ZERO;

    #[test]
    fn new_bank_is_all_zeroes() {
        let bank = Bank::new(4);
        assert_eq!(bank.len(), 4);
        assert_eq!(bank.balances(), vec![0, 0, 0, 0]);
        assert!(!bank.is_shutting_down());
    }

    #[test]
    fn deposit_returns_new_balance() {
        let bank = Bank::new(2);
        assert_eq!(bank.deposit(AccountId(1), 10, NO_DELAY), 10);
        assert_eq!(bank.deposit(AccountId(1), 5, NO_DELAY), 15);
        assert_eq!(bank.balances(), vec![0, 15]);
    }

    #[test]
    fn lock_pair_returns_guards_in_caller_order() {
        let bank = Bank::new(3);
        bank.deposit(AccountId(0), 1, NO_DELAY);
        bank.deposit(AccountId(2), 9, NO_DELAY);

        let (first, second) = bank.lock_pair(AccountId(0), AccountId(2));
        assert_eq!((*first, *second), (1, 9));
        drop((first, second));

        let (first, second) = bank.lock_pair(AccountId(2), AccountId(0));
        assert_eq!((*first, *second), (9, 1));
    }

    #[test]
    #[should_panic(expected = "distinct accounts")]
    fn lock_pair_rejects_same_account() {
        let bank = Bank::new(2);
        let _ = bank.lock_pair(AccountId(1), AccountId(1));
    }

    #[test]
    fn transfer_conserves_funds() {
        let bank = Bank::new(2);
        bank.deposit(AccountId(0), 10, NO_DELAY);

        let moved = bank.transfer_with(AccountId(0), AccountId(1), NO_DELAY, |balance| balance);
        assert_eq!(moved, 10);
        assert_eq!(bank.balances(), vec![0, 10]);
        assert_eq!(bank.total(), 10);
    }

    #[test]
    fn transfer_from_empty_account_moves_nothing() {
        let bank = Bank::new(2);
        let moved = bank.transfer_with(AccountId(0), AccountId(1), NO_DELAY, |balance| balance);
        assert_eq!(moved, 0);
        assert_eq!(bank.balances(), vec![0, 0]);
    }

    #[test]
    fn transfer_caps_picked_amount_at_source_balance() {
        let bank = Bank::new(2);
        bank.deposit(AccountId(0), 3, NO_DELAY);

        let moved = bank.transfer_with(AccountId(0), AccountId(1), NO_DELAY, |_| u64::MAX);
        assert_eq!(moved, 3);
        assert_eq!(bank.balances(), vec![0, 3]);
    }

    #[test]
    fn withdraw_commits_when_funds_are_present() {
        let bank = Bank::new(1);
        bank.deposit(AccountId(0), 10, NO_DELAY);

        let outcome = bank.withdraw_blocking(AccountId(0), 4, NO_DELAY);
        assert_eq!(outcome, WithdrawOutcome::Committed);
        assert_eq!(bank.balances(), vec![6]);
    }

    #[test]
    fn withdraw_of_zero_always_commits() {
        let bank = Bank::new(1);
        let outcome = bank.withdraw_blocking(AccountId(0), 0, NO_DELAY);
        assert_eq!(outcome, WithdrawOutcome::Committed);
        assert_eq!(bank.balances(), vec![0]);
    }

    #[test]
    fn withdraw_abandons_after_shutdown() {
        let bank = Bank::new(2);
        bank.begin_shutdown();

        let outcome = bank.withdraw_blocking(AccountId(0), 1, NO_DELAY);
        assert_eq!(outcome, WithdrawOutcome::Abandoned);
        assert_eq!(bank.balances(), vec![0, 0]);
    }

    #[test]
    fn shutdown_flag_stays_raised() {
        let bank = Bank::new(1);
        bank.begin_shutdown();
        bank.begin_shutdown();
        assert!(bank.is_shutting_down());
    }
}
