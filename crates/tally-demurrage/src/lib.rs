//! # tally-demurrage: Network-debt demurrage engine.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! This crate turns unrecoverable network debt into a proportional haircut
//! on every positive balance without iterating the holder set:
//! - **Conversion rate**: a single global fixed-point multiplier (18
//!   decimals) maps raw shares to displayed value. Demurrage only lowers it.
//! - **Network debt**: defaults accumulate debt; demurrage consumes it, never
//!   below zero.
//! - **Coordinator**: validates debt, consumes it and moves the rate as one
//!   atomic step.
//! - **Settlement**: realises an account's discounted loss by re-denominating
//!   its position at the current rate and shrinking total supply, then asks
//!   the reserve pool for reimbursement.

pub mod coordinator;
pub mod debt;
pub mod rate;
pub mod settlement;

pub use coordinator::{DemurrageCoordinator, DemurrageOutcome};
pub use debt::NetworkDebtTracker;
pub use rate::{ConversionRateEngine, RateUpdate, SupplyBasis};
pub use settlement::{Settlement, SettlementPlan, SettlementProcessor};
