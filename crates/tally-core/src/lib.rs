//! # tally-core
//! Foundation types, errors, traits and the share ledger for Tally.

pub mod amount;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod traits;
pub mod types;
