//! Share ledger: per-account positions and conservation bookkeeping.
//!
//! The [`LedgerStore`] holds no policy. It stores positions, keeps the set of
//! accounts with non-zero shares, and maintains two running totals:
//!
//! - `total_supply`: the sum of all raw shares;
//! - `weighted_supply`: the sum of position weights (`shares / checkpoint`),
//!   which times the current rate gives the total displayed supply.
//!
//! Both totals are updated incrementally so no operation iterates the holder
//! set. [`LedgerStore::apply`] commits a batch of position changes
//! all-or-nothing.

use std::collections::HashMap;

use crate::error::{LedgerError, SnapshotError};
use crate::types::{AccountId, Position};

/// In-memory share ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LedgerStore {
    /// Active accounts: every stored position has `shares > 0`.
    positions: HashMap<AccountId, Position>,
    /// Sum of `shares` across all positions.
    total_supply: u64,
    /// Sum of `Position::weight` across all positions.
    weighted_supply: u128,
}

impl LedgerStore {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored positions, recomputing both totals.
    ///
    /// Empty positions are dropped.
    pub fn from_positions<I>(positions: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = (AccountId, Position)>,
    {
        let mut store = Self::new();
        for (id, pos) in positions {
            if pos.is_empty() {
                continue;
            }
            if store.positions.insert(id, pos).is_some() {
                return Err(SnapshotError::Inconsistent(format!(
                    "duplicate account {id}"
                )));
            }
            store.total_supply = store
                .total_supply
                .checked_add(pos.shares)
                .ok_or_else(|| SnapshotError::Inconsistent("supply overflow".into()))?;
            store.weighted_supply = store
                .weighted_supply
                .checked_add(pos.weight())
                .ok_or_else(|| SnapshotError::Inconsistent("weight overflow".into()))?;
        }
        Ok(store)
    }

    /// Position of an account, if it holds any shares.
    pub fn position(&self, id: &AccountId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    /// Raw shares held by an account (zero if unknown).
    pub fn shares_of(&self, id: &AccountId) -> u64 {
        self.positions.get(id).map_or(0, |p| p.shares)
    }

    /// Whether the account is in the active set.
    pub fn contains(&self, id: &AccountId) -> bool {
        self.positions.contains_key(id)
    }

    /// Sum of raw shares.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Sum of position weights (see [`Position::weight`]).
    pub fn weighted_supply(&self) -> u128 {
        self.weighted_supply
    }

    /// Number of accounts holding shares.
    pub fn holder_count(&self) -> usize {
        self.positions.len()
    }

    /// Iterate over active accounts. Order is unspecified.
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &Position)> {
        self.positions.iter()
    }

    /// Commit a batch of position changes atomically.
    ///
    /// Changes apply in order; a later entry for the same account sees the
    /// earlier one. Totals are validated before anything is written, so on
    /// error the store is untouched. Empty positions leave the active set.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ArithmeticOverflow`] if a total would overflow
    pub fn apply(&mut self, changes: &[(AccountId, Position)]) -> Result<(), LedgerError> {
        let mut supply = self.total_supply as u128;
        let mut weighted = self.weighted_supply;
        let mut pending: Vec<(AccountId, Position)> = Vec::with_capacity(changes.len());

        for &(id, new_pos) in changes {
            let old = pending
                .iter()
                .rev()
                .find(|(pid, _)| *pid == id)
                .map(|(_, p)| *p)
                .or_else(|| self.positions.get(&id).copied());

            if let Some(old) = old {
                // Every stored position is already included in both totals.
                supply -= old.shares as u128;
                weighted -= old.weight();
            }
            supply += new_pos.shares as u128;
            weighted = weighted
                .checked_add(new_pos.weight())
                .ok_or(LedgerError::ArithmeticOverflow)?;
            pending.push((id, new_pos));
        }

        let supply = u64::try_from(supply).map_err(|_| LedgerError::ArithmeticOverflow)?;

        for (id, pos) in pending {
            if pos.is_empty() {
                self.positions.remove(&id);
            } else {
                self.positions.insert(id, pos);
            }
        }
        self.total_supply = supply;
        self.weighted_supply = weighted;
        Ok(())
    }
}
