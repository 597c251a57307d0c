//! Trait interfaces for the Tally ledger.
//!
//! These traits define the contracts at the core's boundary:
//! - [`CreditLedger`]: read-only view of balances, supply, debt and rate
//!   (tally-ledger implements)
//! - [`DefaultReceiver`]: entry point for the Risk Manager collaborator
//!   (tally-ledger implements)
//! - [`ReservePool`]: reimbursement source for settled losses
//!   (external; tally-ledger ships an in-memory implementation)

use crate::error::LedgerError;
use crate::types::{AccountId, Rate};

/// Read-only view of the credit ledger. All methods are pure.
pub trait CreditLedger: Send + Sync {
    /// Displayed balance: the account's shares valued at the current rate.
    fn balance_of(&self, account: &AccountId) -> u64;

    /// Unrealised loss: the part of the account's shares discounted away by
    /// demurrage but not yet settled.
    fn demurraged_balance_of(&self, account: &AccountId) -> u64;

    /// Sum of raw shares across all accounts (pre-settlement).
    fn total_supply(&self) -> u64;

    /// Outstanding default losses awaiting distribution.
    fn network_debt(&self) -> u64;

    /// Current global conversion rate.
    fn conversion_rate(&self) -> Rate;
}

/// Receives validated defaults from the Risk Manager.
///
/// The amount is trusted; liquidating the defaulted credit line itself is the
/// caller's responsibility.
pub trait DefaultReceiver: Send + Sync {
    /// Record `amount` of defaulted credit as network debt.
    fn notify_default(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError>;
}

/// External fund reimbursing realised demurrage losses.
pub trait ReservePool: Send + Sync {
    /// Pay up to `requested` to `account` and return the amount actually paid.
    ///
    /// Never fails the caller: an empty reserve pays zero.
    fn reimburse(&self, account: &AccountId, requested: u64) -> u64;

    /// Funds currently available for reimbursement.
    fn available(&self) -> u64;
}
