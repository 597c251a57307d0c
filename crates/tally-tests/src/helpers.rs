//! Shared helpers for scenario and property tests.

use std::sync::Arc;

use tally_core::amount::parse_credits;
use tally_core::constants::CREDIT;
use tally_core::types::AccountId;
use tally_demurrage::SupplyBasis;
use tally_ledger::{CreditNetwork, MemoryReservePool};

/// Account id for a short label such as `"b"`.
pub fn acct(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// Parse a decimal credit string, panicking on malformed input.
pub fn credits(s: &str) -> u64 {
    parse_credits(s).unwrap_or_else(|e| panic!("bad credit literal {s:?}: {e}"))
}

/// A network plus a handle on its reserve.
pub struct Fixture {
    pub network: CreditNetwork,
    pub reserve: Arc<MemoryReservePool>,
}

/// Members B, D and F hold 10 credits each; A, C and E are debtors whose
/// credit lines back that supply.
pub fn genesis_network(basis: SupplyBasis, reserve_funds: u64) -> Fixture {
    let reserve = Arc::new(MemoryReservePool::with_funds(reserve_funds));
    let network = CreditNetwork::with_basis(basis, reserve.clone());
    for label in ["b", "d", "f"] {
        network
            .mint(&acct(label), 10 * CREDIT)
            .unwrap_or_else(|e| panic!("genesis mint failed: {e}"));
    }
    Fixture { network, reserve }
}

/// Default debtor `label` for 10 credits and demurrage the full amount.
pub fn default_and_demurrage(network: &CreditNetwork, label: &str) {
    network
        .record_default(&acct(label), 10 * CREDIT)
        .unwrap_or_else(|e| panic!("default failed: {e}"));
    network
        .demurrage_members(10 * CREDIT)
        .unwrap_or_else(|e| panic!("demurrage failed: {e}"));
}
