//! Protocol constants. All credit amounts are in micro-credits
//! (1 credit = 10^6 units).

/// Number of decimal places carried by credit amounts.
pub const CREDIT_DECIMALS: u32 = 6;

/// One whole credit expressed in ledger units.
pub const CREDIT: u64 = 1_000_000;

/// Number of decimal places carried by the conversion rate.
pub const RATE_DECIMALS: u32 = 18;

/// Fixed-point denominator of the conversion rate (`1.0`).
///
/// Held as `u128` so that `shares * rate` never overflows for any `u64`
/// share amount: `u64::MAX * 10^18 < u128::MAX`.
pub const RATE_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Length in bytes of an account identifier.
pub const ACCOUNT_ID_LEN: usize = 20;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TALLY";

/// Default state file name inside the data directory.
pub const DEFAULT_STATE_FILE: &str = "ledger.bin";
