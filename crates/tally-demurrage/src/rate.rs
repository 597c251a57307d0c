//! Conversion rate engine.
//!
//! Owns the global conversion rate, the nominal supply `S` it is computed
//! against, and the cumulative demurrage `D` processed so far. Converts
//! between raw positions and displayed value in both directions.
//!
//! Two supply bases are supported (see [`SupplyBasis`]). Under the default
//! [`SupplyBasis::Genesis`] basis the rate is
//!
//! ```text
//! rate = 1 - floor(D * 10^18 / S) / 10^18        (clamped at 0)
//! ```
//!
//! with `S` snapshotted at the first demurrage and held fixed afterwards.
//! Only the discounted fraction is truncated, matching the ledger's
//! published rates (`0.666666666666666667` after a third of supply).

use serde::{Deserialize, Serialize};
use tally_core::constants::RATE_PRECISION;
use tally_core::error::LedgerError;
use tally_core::ledger::LedgerStore;
use tally_core::types::{Position, Rate};

/// How the nominal supply `S` is chosen for each demurrage event.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum SupplyBasis {
    /// Snapshot total raw supply at the first demurrage and keep it fixed.
    /// Settlements shrink total supply but never `S`.
    #[default]
    Genesis,
    /// Re-snapshot `S` as the total displayed supply at every demurrage and
    /// scale the rate by `(S - amount) / S`. Keeps the haircut proportional
    /// when credit is issued between events.
    Rolling,
}

/// Result of a previewed demurrage, applied with [`ConversionRateEngine::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateUpdate {
    /// Conversion rate after the event.
    pub rate: Rate,
    /// Supply the event was computed against.
    pub nominal_supply: u64,
    /// Cumulative demurrage including this event.
    pub cumulative_demurrage: u64,
}

/// The global conversion rate and its bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ConversionRateEngine {
    basis: SupplyBasis,
    rate: Rate,
    /// `S`; `None` until the first demurrage.
    nominal_supply: Option<u64>,
    /// `D`.
    cumulative_demurrage: u64,
}

impl Default for ConversionRateEngine {
    fn default() -> Self {
        Self::new(SupplyBasis::default())
    }
}

impl ConversionRateEngine {
    /// A fresh engine at rate `1.0`.
    pub fn new(basis: SupplyBasis) -> Self {
        Self {
            basis,
            rate: Rate::ONE,
            nominal_supply: None,
            cumulative_demurrage: 0,
        }
    }

    /// Rebuild an engine from persisted parts.
    pub fn from_parts(
        basis: SupplyBasis,
        rate: Rate,
        nominal_supply: Option<u64>,
        cumulative_demurrage: u64,
    ) -> Self {
        Self {
            basis,
            rate,
            nominal_supply,
            cumulative_demurrage,
        }
    }

    pub fn basis(&self) -> SupplyBasis {
        self.basis
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// Supply the last demurrage was computed against, if any.
    pub fn nominal_supply(&self) -> Option<u64> {
        self.nominal_supply
    }

    pub fn cumulative_demurrage(&self) -> u64 {
        self.cumulative_demurrage
    }

    /// Total displayed supply: `weighted_supply * rate`, truncated.
    pub fn displayed_supply(&self, ledger: &LedgerStore) -> u64 {
        let displayed = ledger
            .weighted_supply()
            .saturating_mul(self.rate.raw())
            / RATE_PRECISION;
        u64::try_from(displayed).unwrap_or(u64::MAX)
    }

    /// The supply the next demurrage would be computed against.
    pub fn basis_supply(&self, ledger: &LedgerStore) -> u64 {
        match self.basis {
            SupplyBasis::Genesis => self
                .nominal_supply
                .unwrap_or_else(|| ledger.total_supply()),
            SupplyBasis::Rolling => self.displayed_supply(ledger),
        }
    }

    /// Snapshot `S` if the current basis calls for it and return it.
    ///
    /// Under [`SupplyBasis::Genesis`] only the first call snapshots; under
    /// [`SupplyBasis::Rolling`] every call does.
    pub fn begin_epoch_if_needed(&mut self, ledger: &LedgerStore) -> u64 {
        let supply = self.basis_supply(ledger);
        if self.basis == SupplyBasis::Rolling || self.nominal_supply.is_none() {
            self.nominal_supply = Some(supply);
        }
        supply
    }

    /// Compute the effect of distributing `amount` without changing state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ArithmeticOverflow`] if `D` would overflow
    pub fn preview_demurrage(
        &self,
        amount: u64,
        ledger: &LedgerStore,
    ) -> Result<RateUpdate, LedgerError> {
        let supply = self.basis_supply(ledger);
        let cumulative = self
            .cumulative_demurrage
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let rate = match self.basis {
            SupplyBasis::Genesis => genesis_rate(cumulative, supply),
            SupplyBasis::Rolling => rolling_rate(self.rate, amount, supply),
        };

        Ok(RateUpdate {
            // Monotonic: a demurrage never raises the rate.
            rate: rate.min(self.rate),
            nominal_supply: supply,
            cumulative_demurrage: cumulative,
        })
    }

    /// Apply a previewed update. This is the only mutator of the rate.
    pub fn commit(&mut self, update: RateUpdate) {
        self.rate = update.rate.min(self.rate);
        self.nominal_supply = Some(update.nominal_supply);
        self.cumulative_demurrage = update.cumulative_demurrage;
    }

    /// Distribute `amount` across all holders and return the new rate.
    pub fn apply_demurrage(&mut self, amount: u64, ledger: &LedgerStore) -> Result<Rate, LedgerError> {
        self.begin_epoch_if_needed(ledger);
        let update = self.preview_demurrage(amount, ledger)?;
        self.commit(update);
        Ok(self.rate)
    }

    /// Displayed value of a position: `shares * rate / checkpoint`, truncated.
    pub fn displayed_balance(&self, position: &Position) -> u64 {
        let checkpoint = position.checkpoint;
        if checkpoint == self.rate || checkpoint.is_zero() {
            return position.shares;
        }
        let scaled = position.shares as u128 * self.rate.raw() / checkpoint.raw();
        // rate <= checkpoint, so the scaled value never exceeds shares.
        scaled.min(position.shares as u128) as u64
    }

    /// Unrealised loss of a position: `shares - displayed`.
    ///
    /// Displayed value and loss always add up to the raw shares.
    pub fn demurraged_loss(&self, position: &Position) -> u64 {
        position.shares - self.displayed_balance(position)
    }

    /// Re-denominate a position at the current rate.
    ///
    /// The displayed value is unchanged; the shares shrink by the loss and
    /// the checkpoint moves to the current rate.
    pub fn settle(&self, position: &Position) -> Position {
        Position {
            shares: self.displayed_balance(position),
            checkpoint: self.rate,
        }
    }

    /// Credit `value` to a position at the current rate.
    ///
    /// The displayed balance rises by exactly `value` regardless of earlier
    /// demurrage. A fresh account, or one still at checkpoint `1.0` with
    /// nothing to settle, receives `ceil(value / rate)` shares at checkpoint
    /// `1.0`, so total supply keeps tracking displayed value through the
    /// global rate. A position already re-denominated below `1.0` is settled
    /// and credited 1:1 against its new checkpoint, as is every credit once
    /// the rate has reached zero.
    pub fn credit(&self, position: Option<Position>, value: u64) -> Result<Position, LedgerError> {
        let held_at_par = match position {
            _ if self.rate.is_zero() => None,
            None => Some(0),
            Some(p) if p.checkpoint == Rate::ONE && self.demurraged_loss(&p) == 0 => Some(p.shares),
            Some(_) => None,
        };
        if let Some(held) = held_at_par {
            let shares = held
                .checked_add(self.shares_for(value)?)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            return Ok(Position {
                shares,
                checkpoint: Rate::ONE,
            });
        }

        let settled = position.map_or(Position::empty(self.rate), |p| self.settle(&p));
        let shares = settled
            .shares
            .checked_add(value)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(Position {
            shares,
            checkpoint: self.rate,
        })
    }

    /// Shares at checkpoint `1.0` worth `value` at the current rate, rounded
    /// up so they display at least `value`. The rate must be non-zero.
    fn shares_for(&self, value: u64) -> Result<u64, LedgerError> {
        let shares = (value as u128 * RATE_PRECISION).div_ceil(self.rate.raw());
        u64::try_from(shares).map_err(|_| LedgerError::ArithmeticOverflow)
    }

    /// Debit `value` of displayed balance from a position.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if the displayed balance is short
    pub fn debit(&self, position: Option<Position>, value: u64) -> Result<Position, LedgerError> {
        let settled = position.map_or(Position::empty(self.rate), |p| self.settle(&p));
        let shares = settled
            .shares
            .checked_sub(value)
            .ok_or(LedgerError::InsufficientBalance {
                have: settled.shares,
                need: value,
            })?;
        Ok(Position {
            shares,
            checkpoint: self.rate,
        })
    }
}

/// `1 - floor(D * 10^18 / S)`, clamped at zero. A zero supply honours nothing.
fn genesis_rate(cumulative: u64, supply: u64) -> Rate {
    if supply == 0 {
        return Rate::ZERO;
    }
    // cumulative < 2^64 and RATE_PRECISION < 2^60, so the product fits u128.
    let discounted = cumulative as u128 * RATE_PRECISION / supply as u128;
    Rate::from_raw(RATE_PRECISION.saturating_sub(discounted))
}

/// `rate - floor(rate * amount / V)`, zero once `amount >= V`.
fn rolling_rate(current: Rate, amount: u64, displayed_supply: u64) -> Rate {
    if displayed_supply == 0 || amount >= displayed_supply {
        return Rate::ZERO;
    }
    let cut = current.raw() * amount as u128 / displayed_supply as u128;
    Rate::from_raw(current.raw() - cut)
}
