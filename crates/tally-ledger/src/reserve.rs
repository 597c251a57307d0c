//! In-memory reserve pool.
//!
//! Holds fee deposits and pays out reimbursements for settled demurrage
//! losses, capped by what it holds. Keeps a per-account payout record so
//! tests and the CLI can inspect who was reimbursed.

use std::collections::HashMap;

use parking_lot::Mutex;
use tally_core::traits::ReservePool;
use tally_core::types::AccountId;
use tracing::debug;

/// Persistable state of a [`MemoryReservePool`].
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ReserveState {
    /// Funds available for reimbursement.
    pub available: u64,
    /// Total paid to each account.
    pub reimbursed: HashMap<AccountId, u64>,
    /// Total paid overall.
    pub total_reimbursed: u64,
}

/// A reserve pool backed by a mutex-protected balance.
#[derive(Debug, Default)]
pub struct MemoryReservePool {
    inner: Mutex<ReserveState>,
}

impl MemoryReservePool {
    /// An empty reserve.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reserve holding `available` funds.
    pub fn with_funds(available: u64) -> Self {
        Self::from_state(ReserveState {
            available,
            ..ReserveState::default()
        })
    }

    /// Restore a reserve from persisted state.
    pub fn from_state(state: ReserveState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Copy of the current state.
    pub fn state(&self) -> ReserveState {
        self.inner.lock().clone()
    }

    /// Add collected fees to the reserve. Returns the new available balance.
    pub fn deposit_fees(&self, amount: u64) -> u64 {
        let mut inner = self.inner.lock();
        inner.available = inner.available.saturating_add(amount);
        debug!(amount, available = inner.available, "reserve fees deposited");
        inner.available
    }

    /// Total reimbursed to `account` so far.
    pub fn reimbursed_to(&self, account: &AccountId) -> u64 {
        self.inner.lock().reimbursed.get(account).copied().unwrap_or(0)
    }

    /// Total reimbursed to all accounts.
    pub fn total_reimbursed(&self) -> u64 {
        self.inner.lock().total_reimbursed
    }
}

impl ReservePool for MemoryReservePool {
    fn reimburse(&self, account: &AccountId, requested: u64) -> u64 {
        let mut inner = self.inner.lock();
        let paid = requested.min(inner.available);
        if paid == 0 {
            return 0;
        }
        inner.available -= paid;
        inner.total_reimbursed = inner.total_reimbursed.saturating_add(paid);
        let entry = inner.reimbursed.entry(*account).or_insert(0);
        *entry = entry.saturating_add(paid);
        debug!(%account, requested, paid, "reserve reimbursement");
        paid
    }

    fn available(&self) -> u64 {
        self.inner.lock().available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::constants::CREDIT;

    fn id(seed: u8) -> AccountId {
        AccountId([seed; 20])
    }

    #[test]
    fn empty_reserve_pays_nothing() {
        let pool = MemoryReservePool::new();
        assert_eq!(pool.reimburse(&id(1), 10), 0);
        assert_eq!(pool.reimbursed_to(&id(1)), 0);
    }

    #[test]
    fn full_payout_when_funded() {
        let pool = MemoryReservePool::with_funds(100 * CREDIT);
        assert_eq!(pool.reimburse(&id(1), 3_333_334), 3_333_334);
        assert_eq!(pool.available(), 100 * CREDIT - 3_333_334);
        assert_eq!(pool.reimbursed_to(&id(1)), 3_333_334);
    }

    #[test]
    fn partial_payout_drains_reserve() {
        let pool = MemoryReservePool::with_funds(3 * CREDIT);
        assert_eq!(pool.reimburse(&id(1), 3_333_334), 3 * CREDIT);
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.reimburse(&id(2), 1), 0);
    }

    #[test]
    fn deposits_accumulate() {
        let pool = MemoryReservePool::new();
        pool.deposit_fees(2);
        assert_eq!(pool.deposit_fees(3), 5);
    }

    #[test]
    fn totals_track_all_accounts() {
        let pool = MemoryReservePool::with_funds(10);
        pool.reimburse(&id(1), 4);
        pool.reimburse(&id(2), 3);
        pool.reimburse(&id(1), 1);
        assert_eq!(pool.reimbursed_to(&id(1)), 5);
        assert_eq!(pool.total_reimbursed(), 8);
    }

    #[test]
    fn state_roundtrip() {
        let pool = MemoryReservePool::with_funds(10);
        pool.reimburse(&id(1), 4);
        let restored = MemoryReservePool::from_state(pool.state());
        assert_eq!(restored.state(), pool.state());
        assert_eq!(restored.available(), 6);
    }
}
