//! Settlement (burn) processor.
//!
//! Settling an account realises its demurraged loss: the position is
//! re-denominated at the current rate so its displayed balance is unchanged,
//! total supply shrinks by the loss, and the reserve pool is asked to
//! reimburse it. The rate itself is never touched.
//!
//! Settlement is split in two so callers can commit ledger state before the
//! external reserve call: [`SettlementProcessor::settle`] mutates the ledger,
//! [`SettlementProcessor::reimburse`] talks to the reserve.

use tally_core::error::LedgerError;
use tally_core::ledger::LedgerStore;
use tally_core::traits::ReservePool;
use tally_core::types::{AccountId, Position};
use tracing::{info, warn};

use crate::rate::ConversionRateEngine;

/// A pending settlement: the position change that realises `loss`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    pub account: AccountId,
    /// Shares burned.
    pub loss: u64,
    pub before: Position,
    pub after: Position,
}

/// Receipt of a completed settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub account: AccountId,
    /// Loss realised and burned from total supply.
    pub loss: u64,
    /// Amount the reserve actually paid, `<= loss`.
    pub reimbursed: u64,
}

impl Settlement {
    /// A settlement that found nothing to burn.
    pub fn nothing(account: AccountId) -> Self {
        Self {
            account,
            loss: 0,
            reimbursed: 0,
        }
    }

    /// Part of the loss the reserve could not cover.
    pub fn shortfall(&self) -> u64 {
        self.loss - self.reimbursed
    }
}

/// Stateless settlement logic.
#[derive(Debug, Clone, Default)]
pub struct SettlementProcessor;

impl SettlementProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Plan the settlement of a position. `None` when there is no loss.
    pub fn plan(
        &self,
        rates: &ConversionRateEngine,
        account: AccountId,
        position: Option<Position>,
    ) -> Option<SettlementPlan> {
        let before = position?;
        let loss = rates.demurraged_loss(&before);
        if loss == 0 {
            return None;
        }
        Some(SettlementPlan {
            account,
            loss,
            before,
            after: rates.settle(&before),
        })
    }

    /// Burn an account's demurraged loss from the ledger.
    ///
    /// Returns `None` (and changes nothing) when the account has no loss.
    pub fn settle(
        &self,
        ledger: &mut LedgerStore,
        rates: &ConversionRateEngine,
        account: AccountId,
    ) -> Result<Option<SettlementPlan>, LedgerError> {
        let Some(plan) = self.plan(rates, account, ledger.position(&account)) else {
            return Ok(None);
        };
        ledger.apply(&[(account, plan.after)])?;
        Ok(Some(plan))
    }

    /// Request reimbursement of a settled loss.
    ///
    /// The payout is capped at the loss even if the reserve misbehaves.
    pub fn reimburse(&self, plan: &SettlementPlan, reserve: &dyn ReservePool) -> Settlement {
        let reimbursed = reserve.reimburse(&plan.account, plan.loss).min(plan.loss);
        let settlement = Settlement {
            account: plan.account,
            loss: plan.loss,
            reimbursed,
        };
        if settlement.shortfall() > 0 {
            warn!(
                account = %plan.account,
                loss = plan.loss,
                reimbursed,
                "reserve shortfall; loss partially reimbursed"
            );
        } else {
            info!(account = %plan.account, loss = plan.loss, "demurraged loss settled and reimbursed");
        }
        settlement
    }
}
