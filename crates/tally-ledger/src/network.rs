//! Credit network composition.
//!
//! [`CreditNetwork`] wires the [`LedgerStore`] and the
//! [`DemurrageCoordinator`] together behind one `RwLock` and talks to an
//! external [`ReservePool`] for reimbursements.
//!
//! Every mutating call runs to completion under the write lock and either
//! commits entirely or leaves state untouched. Settlements commit first and
//! call the reserve afterwards, outside the state lock. Mutating calls are
//! serialised by a reentrant operation lock holding the set of accounts
//! whose reimbursement is in flight: a nested call from inside the reserve
//! that touches one of those accounts is rejected with
//! [`LedgerError::Reentrant`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use serde::Serialize;
use tally_core::error::{LedgerError, SnapshotError};
use tally_core::ledger::LedgerStore;
use tally_core::traits::{CreditLedger, DefaultReceiver, ReservePool};
use tally_core::types::{AccountId, Position, Rate};
use tally_demurrage::{
    DemurrageCoordinator, DemurrageOutcome, Settlement, SettlementPlan, SettlementProcessor,
    SupplyBasis,
};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::snapshot::LedgerSnapshot;

/// Receipt of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u64,
    /// Losses realised on either side before the value moved.
    pub settlements: Vec<Settlement>,
}

/// Receipt of an issuance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintReceipt {
    pub account: AccountId,
    pub amount: u64,
    /// Loss realised on the receiving account before the credit, if any.
    pub settlement: Option<Settlement>,
}

/// Aggregate view of the network, for reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub supply_basis: SupplyBasis,
    pub conversion_rate: String,
    pub total_supply: u64,
    pub displayed_supply: u64,
    pub network_debt: u64,
    pub total_defaulted: u64,
    pub cumulative_demurrage: u64,
    pub nominal_supply: Option<u64>,
    pub holders: usize,
    pub reserve_available: u64,
}

/// Core state guarded by the network's lock.
#[derive(Clone, Debug, Default)]
struct NetworkState {
    ledger: LedgerStore,
    coordinator: DemurrageCoordinator,
}

/// The mutual-credit network.
pub struct CreditNetwork {
    state: RwLock<NetworkState>,
    /// Serialises mutations; holds accounts with a reserve call in flight.
    ops: ReentrantMutex<RefCell<HashSet<AccountId>>>,
    reserve: Arc<dyn ReservePool>,
    settlement: SettlementProcessor,
}

/// Removes accounts from the in-flight set when dropped.
struct InFlight<'a> {
    set: &'a RefCell<HashSet<AccountId>>,
    accounts: Vec<AccountId>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.borrow_mut();
        for account in &self.accounts {
            set.remove(account);
        }
    }
}

impl CreditNetwork {
    /// Create an empty network using the configured supply basis.
    pub fn new(config: &LedgerConfig, reserve: Arc<dyn ReservePool>) -> Self {
        Self::with_basis(config.supply_basis, reserve)
    }

    /// Create an empty network with an explicit supply basis.
    pub fn with_basis(basis: SupplyBasis, reserve: Arc<dyn ReservePool>) -> Self {
        Self::from_state(
            NetworkState {
                ledger: LedgerStore::new(),
                coordinator: DemurrageCoordinator::new(basis),
            },
            reserve,
        )
    }

    fn from_state(state: NetworkState, reserve: Arc<dyn ReservePool>) -> Self {
        Self {
            state: RwLock::new(state),
            ops: ReentrantMutex::new(RefCell::new(HashSet::new())),
            reserve,
            settlement: SettlementProcessor::new(),
        }
    }

    /// Restore a network from a snapshot.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        reserve: Arc<dyn ReservePool>,
    ) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        Ok(Self::from_state(
            NetworkState {
                ledger: snapshot.ledger,
                coordinator: snapshot.coordinator,
            },
            reserve,
        ))
    }

    /// Capture the full core state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read();
        LedgerSnapshot::new(state.ledger.clone(), state.coordinator.clone())
    }

    /// The reserve pool this network reimburses from.
    pub fn reserve(&self) -> &Arc<dyn ReservePool> {
        &self.reserve
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Run a mutation under the operation lock.
    ///
    /// `f` sees the state under the write lock and returns a value plus the
    /// settlements it committed. The reserve is called for each settlement
    /// once the state lock is released.
    fn execute<T, F>(
        &self,
        accounts: &[AccountId],
        f: F,
    ) -> Result<(T, Vec<Settlement>), LedgerError>
    where
        F: FnOnce(&mut NetworkState, &SettlementProcessor) -> Result<(T, Vec<SettlementPlan>), LedgerError>,
    {
        let ops = self.ops.lock();
        if let Some(busy) = accounts.iter().find(|a| ops.borrow().contains(*a)) {
            warn!(account = %busy, "rejected reentrant call during settlement");
            return Err(LedgerError::Reentrant(*busy));
        }

        let (value, plans) = {
            let mut state = self.state.write();
            f(&mut state, &self.settlement)?
        };
        if plans.is_empty() {
            return Ok((value, Vec::new()));
        }

        let accounts: Vec<AccountId> = plans.iter().map(|p| p.account).collect();
        ops.borrow_mut().extend(accounts.iter().copied());
        let _in_flight = InFlight {
            set: &*ops,
            accounts,
        };

        let settlements = plans
            .iter()
            .map(|plan| self.settlement.reimburse(plan, self.reserve.as_ref()))
            .collect();
        Ok((value, settlements))
    }

    /// Record a validated default reported by the Risk Manager.
    ///
    /// Adds `amount` to the network debt. Zero is a no-op.
    pub fn record_default(&self, account: &AccountId, amount: u64) -> Result<u64, LedgerError> {
        let (debt, _) = self.execute(&[], |state, _| {
            let debt = state.coordinator.record_default(amount)?;
            Ok((debt, Vec::new()))
        })?;
        info!(%account, amount, network_debt = debt, "credit line default recorded");
        Ok(debt)
    }

    /// Distribute `amount` of network debt across all holders.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientNetworkDebt`] if `amount` exceeds the debt
    pub fn demurrage_members(&self, amount: u64) -> Result<DemurrageOutcome, LedgerError> {
        let (outcome, _) = self.execute(&[], |state, _| {
            let NetworkState {
                ledger,
                coordinator,
            } = state;
            Ok((coordinator.demurrage_members(amount, ledger)?, Vec::new()))
        })?;
        Ok(outcome)
    }

    /// Settle an account's demurraged loss and request reimbursement.
    ///
    /// Anyone may call this for any account. An account with no loss is a
    /// successful no-op returning a zero settlement.
    pub fn burn_demurraged(&self, account: &AccountId) -> Result<Settlement, LedgerError> {
        let account = *account;
        let (_, settlements) = self.execute(&[account], |state, processor| {
            let NetworkState {
                ledger,
                coordinator,
            } = state;
            let plan = processor.settle(ledger, coordinator.rates(), account)?;
            Ok(((), plan.into_iter().collect()))
        })?;
        match settlements.into_iter().next() {
            Some(settlement) => Ok(settlement),
            None => {
                debug!(%account, "nothing to settle");
                Ok(Settlement::nothing(account))
            }
        }
    }

    /// Move `amount` of displayed value from `from` to `to`.
    ///
    /// Both parties are settled first, so after the transfer neither holds a
    /// demurraged balance. A zero amount does nothing; a self-transfer only
    /// settles.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        let (from, to) = (*from, *to);
        let (_, settlements) = self.execute(&[from, to], |state, processor| {
            let NetworkState {
                ledger,
                coordinator,
            } = state;
            let rates = coordinator.rates();
            let from_pos = ledger.position(&from);
            let have = from_pos.map_or(0, |p| rates.displayed_balance(&p));
            if have < amount {
                return Err(LedgerError::InsufficientBalance { have, need: amount });
            }
            if amount == 0 {
                return Ok(((), Vec::new()));
            }

            let mut plans: Vec<SettlementPlan> = processor
                .plan(rates, from, from_pos)
                .into_iter()
                .collect();

            let changes: Vec<(AccountId, Position)> = if from == to {
                plans.iter().map(|p| (p.account, p.after)).collect()
            } else {
                let to_pos = ledger.position(&to);
                plans.extend(processor.plan(rates, to, to_pos));
                vec![
                    (from, rates.debit(from_pos, amount)?),
                    (to, rates.credit(to_pos, amount)?),
                ]
            };
            ledger.apply(&changes)?;
            Ok(((), plans))
        })?;

        debug!(%from, %to, amount, settled = settlements.len(), "transfer");
        Ok(TransferReceipt {
            from,
            to,
            amount,
            settlements,
        })
    }

    /// Issue `amount` of new credit to `account` at the current rate.
    ///
    /// Used for genesis allocations and for credit created by the credit-line
    /// collaborator. The receiving account is settled first.
    pub fn mint(&self, account: &AccountId, amount: u64) -> Result<MintReceipt, LedgerError> {
        let account = *account;
        let (_, settlements) = self.execute(&[account], |state, processor| {
            if amount == 0 {
                return Ok(((), Vec::new()));
            }
            let NetworkState {
                ledger,
                coordinator,
            } = state;
            let rates = coordinator.rates();
            let pos = ledger.position(&account);
            let plan = processor.plan(rates, account, pos);
            ledger.apply(&[(account, rates.credit(pos, amount)?)])?;
            Ok(((), plan.into_iter().collect()))
        })?;

        debug!(%account, amount, "credit issued");
        Ok(MintReceipt {
            account,
            amount,
            settlement: settlements.into_iter().next(),
        })
    }

    // ------------------------------------------------------------------
    // Extra reads
    // ------------------------------------------------------------------

    /// Raw shares held by an account.
    pub fn shares_of(&self, account: &AccountId) -> u64 {
        self.state.read().ledger.shares_of(account)
    }

    /// Total displayed supply across all holders.
    pub fn displayed_supply(&self) -> u64 {
        let state = self.state.read();
        state.coordinator.rates().displayed_supply(&state.ledger)
    }

    /// Number of accounts holding shares.
    pub fn holder_count(&self) -> usize {
        self.state.read().ledger.holder_count()
    }

    /// Active accounts with their displayed balances, sorted by account.
    pub fn holders(&self) -> Vec<(AccountId, u64)> {
        let state = self.state.read();
        let rates = state.coordinator.rates();
        let mut holders: Vec<(AccountId, u64)> = state
            .ledger
            .accounts()
            .map(|(id, pos)| (*id, rates.displayed_balance(pos)))
            .collect();
        holders.sort_by_key(|(id, _)| *id);
        holders
    }

    /// Aggregate status for reporting.
    pub fn status(&self) -> NetworkStatus {
        let state = self.state.read();
        let rates = state.coordinator.rates();
        let mut status = NetworkStatus {
            supply_basis: rates.basis(),
            conversion_rate: rates.rate().to_string(),
            total_supply: state.ledger.total_supply(),
            displayed_supply: rates.displayed_supply(&state.ledger),
            network_debt: state.coordinator.network_debt(),
            total_defaulted: state.coordinator.debt().total_defaulted(),
            cumulative_demurrage: rates.cumulative_demurrage(),
            nominal_supply: rates.nominal_supply(),
            holders: state.ledger.holder_count(),
            reserve_available: 0,
        };
        drop(state);
        // The reserve is never queried under the state lock.
        status.reserve_available = self.reserve.available();
        status
    }
}

impl CreditLedger for CreditNetwork {
    fn balance_of(&self, account: &AccountId) -> u64 {
        let state = self.state.read();
        state
            .ledger
            .position(account)
            .map_or(0, |p| state.coordinator.rates().displayed_balance(&p))
    }

    fn demurraged_balance_of(&self, account: &AccountId) -> u64 {
        let state = self.state.read();
        state
            .ledger
            .position(account)
            .map_or(0, |p| state.coordinator.rates().demurraged_loss(&p))
    }

    fn total_supply(&self) -> u64 {
        self.state.read().ledger.total_supply()
    }

    fn network_debt(&self) -> u64 {
        self.state.read().coordinator.network_debt()
    }

    fn conversion_rate(&self) -> Rate {
        self.state.read().coordinator.conversion_rate()
    }
}

impl DefaultReceiver for CreditNetwork {
    fn notify_default(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError> {
        self.record_default(account, amount).map(|_| ())
    }
}
