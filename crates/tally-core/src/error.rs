//! Error types for the Tally ledger.
use thiserror::Error;

use crate::types::AccountId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient network debt: requested {requested}, available {available}")] InsufficientNetworkDebt { requested: u64, available: u64 },
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("reentrant call on account {0} while its settlement is in flight")] Reentrant(AccountId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")] Empty,
    #[error("invalid amount: {0}")] Invalid(String),
    #[error("too many decimals: {got} > {max}")] TooManyDecimals { got: usize, max: u32 },
    #[error("amount overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountIdError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: {got} bytes, expected {expected}")] InvalidLength { got: usize, expected: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("encode: {0}")] Encode(String),
    #[error("decode: {0}")] Decode(String),
    #[error("inconsistent snapshot: {0}")] Inconsistent(String),
}

#[derive(Error, Debug)]
pub enum TallyError {
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Amount(#[from] AmountError),
    #[error(transparent)] AccountId(#[from] AccountIdError),
    #[error(transparent)] Snapshot(#[from] SnapshotError),
    #[error("config: {0}")] Config(String),
    #[error("io: {0}")] Io(#[from] std::io::Error),
}
