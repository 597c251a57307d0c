//! Integration test suite for Tally.
//!
//! Drives a whole [`tally_ledger::CreditNetwork`] through the default,
//! demurrage, transfer and settlement flows and checks the conservation
//! invariants under randomized operation sequences.

pub mod helpers;
