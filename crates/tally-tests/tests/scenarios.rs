//! End-to-end scenarios for default, demurrage, transfer and settlement.
//!
//! Every scenario starts from B, D and F holding 10 credits each, backed by
//! the credit lines of A, C and E. Expected figures are exact: balances
//! truncate toward zero and the rate keeps 18 decimals.

use tally_core::amount::format_credits;
use tally_core::constants::CREDIT;
use tally_core::error::LedgerError;
use tally_core::traits::{CreditLedger, DefaultReceiver, ReservePool};
use tally_demurrage::SupplyBasis;
use tally_tests::helpers::*;

fn fmt(units: u64) -> String {
    format_credits(units)
}

// ---------------------------------------------------------------------------
// Supply accounting
// ---------------------------------------------------------------------------

#[test]
fn burns_reduce_total_supply() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;
    assert_eq!(fmt(net.total_supply()), "30.0");

    net.notify_default(&acct("a"), 10 * CREDIT).unwrap();
    assert_eq!(fmt(net.network_debt()), "10.0");

    net.demurrage_members(credits("10")).unwrap();
    assert_eq!(fmt(net.total_supply()), "30.0");

    net.burn_demurraged(&acct("b")).unwrap();
    assert_eq!(fmt(net.total_supply()), "26.666666");

    net.burn_demurraged(&acct("d")).unwrap();
    assert_eq!(fmt(net.total_supply()), "23.333332");

    assert_eq!(fmt(net.balance_of(&acct("b"))), "6.666666");
    assert_eq!(fmt(net.balance_of(&acct("d"))), "6.666666");
}

#[test]
fn demurrage_consumes_network_debt() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;
    net.notify_default(&acct("a"), 10 * CREDIT).unwrap();
    assert_eq!(fmt(net.network_debt()), "10.0");

    net.demurrage_members(credits("10")).unwrap();
    assert_eq!(fmt(net.total_supply()), "30.0");
    assert_eq!(fmt(net.network_debt()), "0.0");
}

#[test]
fn demurrage_without_debt_is_rejected() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let before = f.network.snapshot();

    let err = f.network.demurrage_members(credits("10")).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientNetworkDebt {
            requested: 10 * CREDIT,
            available: 0
        }
    );
    assert_eq!(f.network.snapshot(), before);
}

// ---------------------------------------------------------------------------
// Proportional discount
// ---------------------------------------------------------------------------

#[test]
fn demurrage_discounts_balances_proportionally() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    default_and_demurrage(&f.network, "a");

    // The defaulted debtor never held a positive balance.
    assert_eq!(fmt(f.network.balance_of(&acct("a"))), "0.0");
    for label in ["b", "d", "f"] {
        assert_eq!(fmt(f.network.balance_of(&acct(label))), "6.666666");
    }
}

#[test]
fn demurraged_balance_is_the_discount() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    default_and_demurrage(&f.network, "a");
    assert_eq!(fmt(f.network.demurraged_balance_of(&acct("b"))), "3.333334");
}

#[test]
fn successive_demurrages_lower_the_rate() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;

    default_and_demurrage(net, "a");
    assert_eq!(net.conversion_rate().to_string(), "0.666666666666666667");

    default_and_demurrage(net, "c");
    assert_eq!(net.conversion_rate().to_string(), "0.333333333333333334");

    default_and_demurrage(net, "e");
    assert_eq!(net.conversion_rate().to_string(), "0.0");

    for label in ["b", "d", "f"] {
        assert_eq!(net.balance_of(&acct(label)), 0);
        assert_eq!(fmt(net.demurraged_balance_of(&acct(label))), "10.0");
    }
}

// ---------------------------------------------------------------------------
// Post-discount isolation
// ---------------------------------------------------------------------------

#[test]
fn credit_issued_after_demurrage_is_undiscounted() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;
    default_and_demurrage(net, "a");

    // E draws on its credit line to pay D.
    net.mint(&acct("d"), credits("10")).unwrap();

    assert_eq!(fmt(net.balance_of(&acct("b"))), "6.666666");
    assert_eq!(fmt(net.balance_of(&acct("d"))), "16.666666");
    assert_eq!(fmt(net.balance_of(&acct("f"))), "6.666666");
}

#[test]
fn transfers_after_demurrage_are_unaffected() {
    let f = genesis_network(SupplyBasis::Genesis, 100_000 * CREDIT);
    let net = &f.network;
    default_and_demurrage(net, "a");

    net.transfer(&acct("d"), &acct("b"), credits("6.666666"))
        .unwrap();

    assert_eq!(fmt(net.balance_of(&acct("b"))), "13.333332");
    assert_eq!(fmt(net.demurraged_balance_of(&acct("b"))), "0.0");
    assert_eq!(fmt(net.balance_of(&acct("d"))), "0.0");
    assert_eq!(fmt(net.demurraged_balance_of(&acct("d"))), "0.0");
    assert_eq!(fmt(net.balance_of(&acct("f"))), "6.666666");
}

#[test]
fn max_transfer_after_burn_leaves_others_alone() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;
    default_and_demurrage(net, "a");
    assert_eq!(fmt(net.balance_of(&acct("b"))), "6.666666");

    net.burn_demurraged(&acct("b")).unwrap();
    assert_eq!(fmt(net.balance_of(&acct("b"))), "6.666666");

    net.transfer(&acct("b"), &acct("e"), credits("6.666666"))
        .unwrap();
    assert_eq!(fmt(net.balance_of(&acct("b"))), "0.0");
    assert_eq!(fmt(net.balance_of(&acct("e"))), "6.666666");
    assert_eq!(fmt(net.balance_of(&acct("d"))), "6.666666");
}

#[test]
fn transfer_above_displayed_balance_fails() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;
    default_and_demurrage(net, "a");
    let before = net.snapshot();

    let err = net
        .transfer(&acct("b"), &acct("e"), credits("6.666667"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(net.snapshot(), before);
}

// ---------------------------------------------------------------------------
// Settlement and reimbursement
// ---------------------------------------------------------------------------

#[test]
fn burning_leaves_every_balance_unchanged() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    let net = &f.network;
    default_and_demurrage(net, "a");

    net.burn_demurraged(&acct("b")).unwrap();

    for label in ["b", "d", "f"] {
        assert_eq!(fmt(net.balance_of(&acct(label))), "6.666666");
    }
    assert_eq!(fmt(net.demurraged_balance_of(&acct("d"))), "3.333334");
}

#[test]
fn funded_reserve_reimburses_in_full() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    f.reserve.deposit_fees(credits("100000"));
    default_and_demurrage(&f.network, "a");
    assert_eq!(fmt(f.reserve.reimbursed_to(&acct("b"))), "0.0");

    let s = f.network.burn_demurraged(&acct("b")).unwrap();

    assert_eq!(fmt(f.network.balance_of(&acct("b"))), "6.666666");
    assert_eq!(fmt(f.reserve.reimbursed_to(&acct("b"))), "3.333334");
    assert_eq!(s.shortfall(), 0);
}

#[test]
fn thin_reserve_reimburses_partially() {
    let f = genesis_network(SupplyBasis::Genesis, 0);
    f.reserve.deposit_fees(credits("3.0"));
    default_and_demurrage(&f.network, "a");

    let s = f.network.burn_demurraged(&acct("b")).unwrap();

    assert_eq!(fmt(f.network.balance_of(&acct("b"))), "6.666666");
    assert_eq!(fmt(f.reserve.reimbursed_to(&acct("b"))), "3.0");
    assert_eq!(fmt(s.shortfall()), "0.333334");
    assert_eq!(f.reserve.available(), 0);
}

#[test]
fn burning_an_unaffected_account_is_a_noop() {
    let f = genesis_network(SupplyBasis::Genesis, 10 * CREDIT);
    let before = f.network.snapshot();
    let s = f.network.burn_demurraged(&acct("b")).unwrap();
    assert_eq!(s.loss, 0);
    assert_eq!(f.network.snapshot(), before);
    assert_eq!(f.reserve.total_reimbursed(), 0);
}

// ---------------------------------------------------------------------------
// Rolling basis
// ---------------------------------------------------------------------------

#[test]
fn rolling_basis_matches_genesis_for_a_single_event() {
    let f = genesis_network(SupplyBasis::Rolling, 0);
    default_and_demurrage(&f.network, "a");
    assert_eq!(f.network.conversion_rate().to_string(), "0.666666666666666667");
    assert_eq!(fmt(f.network.balance_of(&acct("b"))), "6.666666");
}

#[test]
fn rolling_basis_spreads_over_remaining_value() {
    let f = genesis_network(SupplyBasis::Rolling, 0);
    let net = &f.network;
    default_and_demurrage(net, "a");

    // 20 credits remain displayed; a second 10-credit loss halves them.
    net.record_default(&acct("c"), 10 * CREDIT).unwrap();
    net.demurrage_members(10 * CREDIT).unwrap();
    for label in ["b", "d", "f"] {
        let b = net.balance_of(&acct(label));
        assert!(b.abs_diff(3_333_333) <= 1, "{label}: {b}");
    }
    assert!(net.conversion_rate() > tally_core::types::Rate::ZERO);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn snapshot_file_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.bin");

    let f = genesis_network(SupplyBasis::Genesis, 0);
    default_and_demurrage(&f.network, "a");
    f.network.burn_demurraged(&acct("b")).unwrap();
    tally_ledger::snapshot::save_snapshot(&path, &f.network.snapshot()).unwrap();

    let snapshot = tally_ledger::snapshot::load_snapshot(&path)
        .unwrap()
        .unwrap();
    let restored = tally_ledger::CreditNetwork::from_snapshot(snapshot, f.reserve.clone()).unwrap();
    assert_eq!(fmt(restored.total_supply()), "26.666666");
    assert_eq!(fmt(restored.demurraged_balance_of(&acct("d"))), "3.333334");

    // A later demurrage under the genesis basis still divides by the first 30.
    default_and_demurrage(&restored, "c");
    assert_eq!(restored.conversion_rate().to_string(), "0.333333333333333334");
}
