//! Network debt tracker.
//!
//! Accumulates losses from defaulted credit lines and releases them to the
//! demurrage coordinator. Debt never goes below zero.

use tally_core::error::LedgerError;

/// Outstanding default losses awaiting distribution.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct NetworkDebtTracker {
    /// Debt not yet distributed.
    debt: u64,
    /// Every default ever recorded.
    total_defaulted: u64,
}

impl NetworkDebtTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tracker from persisted parts.
    pub fn from_parts(debt: u64, total_defaulted: u64) -> Self {
        Self {
            debt,
            total_defaulted,
        }
    }

    /// Current network debt.
    pub fn debt(&self) -> u64 {
        self.debt
    }

    /// Cumulative defaulted volume.
    pub fn total_defaulted(&self) -> u64 {
        self.total_defaulted
    }

    /// Add a validated default to the network debt. Returns the new debt.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ArithmeticOverflow`] if either counter would overflow
    pub fn record_default(&mut self, amount: u64) -> Result<u64, LedgerError> {
        let debt = self
            .debt
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let total = self
            .total_defaulted
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.debt = debt;
        self.total_defaulted = total;
        Ok(debt)
    }

    /// Check that `amount` can be consumed without touching state.
    pub fn ensure_available(&self, amount: u64) -> Result<(), LedgerError> {
        if amount > self.debt {
            return Err(LedgerError::InsufficientNetworkDebt {
                requested: amount,
                available: self.debt,
            });
        }
        Ok(())
    }

    /// Release `amount` of debt for distribution.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientNetworkDebt`] if `amount` exceeds the debt
    pub fn consume(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.ensure_available(amount)?;
        self.debt -= amount;
        Ok(())
    }
}
