//! Demurrage coordinator.
//!
//! Owns the [`NetworkDebtTracker`] and the [`ConversionRateEngine`] so a
//! demurrage event can validate debt, consume it and move the rate as one
//! step. The rate update is previewed before anything is written; an error
//! at any point leaves both components untouched.

use tally_core::error::LedgerError;
use tally_core::ledger::LedgerStore;
use tally_core::types::Rate;
use tracing::{debug, info};

use crate::debt::NetworkDebtTracker;
use crate::rate::{ConversionRateEngine, SupplyBasis};

/// What a demurrage event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemurrageOutcome {
    /// Debt distributed.
    pub amount: u64,
    pub rate_before: Rate,
    pub rate_after: Rate,
    /// Supply the event was computed against.
    pub nominal_supply: u64,
    /// Network debt left afterwards.
    pub remaining_debt: u64,
}

/// Debt tracker and rate engine, updated together.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DemurrageCoordinator {
    debt: NetworkDebtTracker,
    rates: ConversionRateEngine,
}

impl DemurrageCoordinator {
    pub fn new(basis: SupplyBasis) -> Self {
        Self {
            debt: NetworkDebtTracker::new(),
            rates: ConversionRateEngine::new(basis),
        }
    }

    /// Rebuild a coordinator from persisted components.
    pub fn from_parts(debt: NetworkDebtTracker, rates: ConversionRateEngine) -> Self {
        Self { debt, rates }
    }

    pub fn debt(&self) -> &NetworkDebtTracker {
        &self.debt
    }

    pub fn rates(&self) -> &ConversionRateEngine {
        &self.rates
    }

    /// Current network debt.
    pub fn network_debt(&self) -> u64 {
        self.debt.debt()
    }

    /// Current conversion rate.
    pub fn conversion_rate(&self) -> Rate {
        self.rates.rate()
    }

    /// Record a validated default as network debt.
    pub fn record_default(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.debt.record_default(amount)
    }

    /// Distribute `amount` of network debt across every current holder.
    ///
    /// A zero amount succeeds without changing anything. Driving the rate to
    /// zero is a valid outcome.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientNetworkDebt`] if `amount` exceeds the debt
    /// - [`LedgerError::ArithmeticOverflow`] if cumulative demurrage overflows
    pub fn demurrage_members(
        &mut self,
        amount: u64,
        ledger: &LedgerStore,
    ) -> Result<DemurrageOutcome, LedgerError> {
        let rate_before = self.rates.rate();

        if amount == 0 {
            debug!("zero demurrage requested; nothing to distribute");
            return Ok(DemurrageOutcome {
                amount,
                rate_before,
                rate_after: rate_before,
                nominal_supply: self.rates.basis_supply(ledger),
                remaining_debt: self.debt.debt(),
            });
        }

        self.debt.ensure_available(amount)?;
        let update = self.rates.preview_demurrage(amount, ledger)?;

        // Both checks passed; neither step below can fail.
        self.debt.consume(amount)?;
        self.rates.commit(update);

        let outcome = DemurrageOutcome {
            amount,
            rate_before,
            rate_after: update.rate,
            nominal_supply: update.nominal_supply,
            remaining_debt: self.debt.debt(),
        };
        info!(
            amount,
            rate_before = %outcome.rate_before,
            rate_after = %outcome.rate_after,
            nominal_supply = outcome.nominal_supply,
            remaining_debt = outcome.remaining_debt,
            "demurrage distributed"
        );
        if update.rate.is_zero() {
            info!("conversion rate reached zero; existing balances are fully discounted");
        }
        Ok(outcome)
    }
}
