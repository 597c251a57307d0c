//! Property-based tests for the credit network's conservation invariants.
//!
//! Random operation sequences are replayed against a fresh network and the
//! following are checked after every step:
//! - total supply equals the sum of raw shares
//! - no displayed balance exceeds the account's shares
//! - the conversion rate never rises
//! - settlement is idempotent and leaves displayed balances unchanged
//! - a failed operation changes nothing
//! - without settlement, displayed balances add up to supply times rate

use proptest::prelude::*;
use tally_core::constants::{CREDIT, RATE_PRECISION};
use tally_core::traits::CreditLedger;
use tally_core::types::Rate;
use tally_demurrage::SupplyBasis;
use tally_ledger::CreditNetwork;
use tally_tests::helpers::*;

const LABELS: [&str; 5] = ["b", "d", "f", "g", "h"];

#[derive(Clone, Debug)]
enum Op {
    Mint(usize, u64),
    Transfer(usize, usize, u64),
    Default(u64),
    Demurrage(u64),
    Burn(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 0..LABELS.len();
    let amount = 0..=20 * CREDIT;
    prop_oneof![
        (who.clone(), amount.clone()).prop_map(|(a, v)| Op::Mint(a, v)),
        (who.clone(), who.clone(), amount.clone()).prop_map(|(a, b, v)| Op::Transfer(a, b, v)),
        amount.clone().prop_map(Op::Default),
        amount.prop_map(Op::Demurrage),
        who.prop_map(Op::Burn),
    ]
}

/// Operations that never settle an existing position.
#[derive(Clone, Debug)]
enum UnsettledOp {
    Default(u64),
    Demurrage(u64),
    MintFresh(u64),
}

fn unsettled_op_strategy() -> impl Strategy<Value = UnsettledOp> {
    let amount = 0..=20 * CREDIT;
    prop_oneof![
        amount.clone().prop_map(UnsettledOp::Default),
        amount.clone().prop_map(UnsettledOp::Demurrage),
        amount.prop_map(UnsettledOp::MintFresh),
    ]
}

fn basis_strategy() -> impl Strategy<Value = SupplyBasis> {
    prop_oneof![Just(SupplyBasis::Genesis), Just(SupplyBasis::Rolling)]
}

fn apply(net: &CreditNetwork, op: &Op) -> bool {
    match *op {
        Op::Mint(a, v) => net.mint(&acct(LABELS[a]), v).is_ok(),
        Op::Transfer(a, b, v) => net.transfer(&acct(LABELS[a]), &acct(LABELS[b]), v).is_ok(),
        Op::Default(v) => net.record_default(&acct("debtor"), v).is_ok(),
        Op::Demurrage(v) => net.demurrage_members(v).is_ok(),
        Op::Burn(a) => net.burn_demurraged(&acct(LABELS[a])).is_ok(),
    }
}

fn check_invariants(net: &CreditNetwork) -> Result<(), TestCaseError> {
    let shares: u64 = LABELS.iter().map(|l| net.shares_of(&acct(l))).sum();
    prop_assert_eq!(net.total_supply(), shares);
    for label in LABELS {
        let id = acct(label);
        let displayed = net.balance_of(&id);
        prop_assert!(displayed <= net.shares_of(&id));
        prop_assert_eq!(displayed + net.demurraged_balance_of(&id), net.shares_of(&id));
    }
    prop_assert!(net.conversion_rate() <= Rate::ONE);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Supply bookkeeping holds across any operation sequence.
    #[test]
    fn conservation_under_random_ops(
        basis in basis_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let f = genesis_network(basis, 1_000 * CREDIT);
        let mut rate = f.network.conversion_rate();
        for op in &ops {
            apply(&f.network, op);
            check_invariants(&f.network)?;
            let now = f.network.conversion_rate();
            prop_assert!(now <= rate, "rate rose from {} to {}", rate, now);
            rate = now;
        }
    }

    /// Failed operations leave the network exactly as it was.
    #[test]
    fn failures_change_nothing(
        basis in basis_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let f = genesis_network(basis, 0);
        for op in &ops {
            let before = f.network.snapshot();
            if !apply(&f.network, op) {
                prop_assert_eq!(f.network.snapshot(), before);
            }
        }
    }

    /// Burning twice in a row realises nothing the second time, and the
    /// first burn does not change any displayed balance.
    #[test]
    fn burn_is_idempotent(
        basis in basis_strategy(),
        debt in 1..=30 * CREDIT,
        who in 0..3usize,
    ) {
        let f = genesis_network(basis, 0);
        let net = &f.network;
        net.record_default(&acct("a"), debt).unwrap();
        net.demurrage_members(debt).unwrap();

        let balances: Vec<u64> = LABELS.iter().map(|l| net.balance_of(&acct(l))).collect();
        let first = net.burn_demurraged(&acct(LABELS[who])).unwrap();
        let after: Vec<u64> = LABELS.iter().map(|l| net.balance_of(&acct(l))).collect();
        prop_assert_eq!(&balances, &after);
        prop_assert_eq!(net.demurraged_balance_of(&acct(LABELS[who])), 0);

        let before = net.snapshot();
        let second = net.burn_demurraged(&acct(LABELS[who])).unwrap();
        prop_assert_eq!(second.loss, 0);
        prop_assert_eq!(net.snapshot(), before);
        prop_assert!(first.loss <= 10 * CREDIT);
    }

    /// Demurrage shrinks displayed supply by at least the amount distributed,
    /// give or take truncation.
    #[test]
    fn demurrage_covers_the_debt(
        basis in basis_strategy(),
        amount in 1..=30 * CREDIT,
    ) {
        let f = genesis_network(basis, 0);
        let net = &f.network;
        let before = net.displayed_supply();
        net.record_default(&acct("a"), amount).unwrap();
        net.demurrage_members(amount).unwrap();
        let after = net.displayed_supply();
        prop_assert!(before - after + 1 >= amount, "{} -> {} for {}", before, after, amount);
        prop_assert_eq!(net.network_debt(), 0);
        prop_assert_eq!(net.total_supply(), 30 * CREDIT);
    }

    /// Credit received after a demurrage is held at full value.
    #[test]
    fn post_demurrage_credit_is_isolated(
        basis in basis_strategy(),
        debt in 1..30 * CREDIT,
        minted in 1..=50 * CREDIT,
    ) {
        let f = genesis_network(basis, 0);
        let net = &f.network;
        net.record_default(&acct("a"), debt).unwrap();
        net.demurrage_members(debt).unwrap();

        let b_before = net.balance_of(&acct("b"));
        let supply_before = net.total_supply();
        net.mint(&acct("g"), minted).unwrap();
        prop_assert_eq!(net.balance_of(&acct("g")), minted);
        prop_assert_eq!(net.total_supply(), supply_before + net.shares_of(&acct("g")));
        prop_assert_eq!(net.balance_of(&acct("b")), b_before);
    }

    /// Without settlement, the displayed supply implied by the rate matches
    /// the sum of displayed balances, short by at most one unit per holder.
    #[test]
    fn displayed_supply_is_conserved_without_settlement(
        basis in basis_strategy(),
        ops in prop::collection::vec(unsettled_op_strategy(), 1..40),
    ) {
        let f = genesis_network(basis, 0);
        let net = &f.network;
        let mut holders: Vec<String> = ["b", "d", "f"].iter().map(|l| l.to_string()).collect();
        for (i, op) in ops.iter().enumerate() {
            match *op {
                UnsettledOp::Default(v) => {
                    let _ = net.record_default(&acct("debtor"), v);
                }
                UnsettledOp::Demurrage(v) => {
                    let _ = net.demurrage_members(v);
                }
                UnsettledOp::MintFresh(v) => {
                    let label = format!("fresh-{i}");
                    if net.mint(&acct(&label), v).is_ok() {
                        holders.push(label);
                    }
                }
            }
            let rate = net.conversion_rate();
            if rate == Rate::ZERO {
                break;
            }
            let expected = net.total_supply() as u128 * rate.raw() / RATE_PRECISION;
            let held: u128 = holders.iter().map(|l| net.balance_of(&acct(l)) as u128).sum();
            prop_assert!(held <= expected, "held {} above {}", held, expected);
            prop_assert!(
                expected - held <= holders.len() as u128,
                "held {} short of {} by more than {} holders", held, expected, holders.len()
            );
        }
    }

    /// Distributing more than the outstanding debt is always rejected.
    #[test]
    fn over_debt_demurrage_rejected(
        debt in 0..=20 * CREDIT,
        extra in 1..=20 * CREDIT,
    ) {
        let f = genesis_network(SupplyBasis::Genesis, 0);
        let net = &f.network;
        net.record_default(&acct("a"), debt).unwrap();
        let before = net.snapshot();
        prop_assert!(net.demurrage_members(debt + extra).is_err());
        prop_assert_eq!(net.snapshot(), before);
    }
}
