//! Core ledger types: account identifiers, the fixed-point conversion rate,
//! and per-account share positions.
//!
//! Credit amounts are plain `u64` micro-credits throughout the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::format_fixed;
use crate::constants::{ACCOUNT_ID_LEN, RATE_DECIMALS, RATE_PRECISION};
use crate::error::AccountIdError;

/// A 20-byte, address-like account identifier.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    /// The all-zero identifier.
    pub const ZERO: Self = Self([0u8; ACCOUNT_ID_LEN]);

    /// Derive a deterministic identifier from a human-readable label.
    ///
    /// Takes the first 20 bytes of the BLAKE3 hash of the label, so the same
    /// label always maps to the same account.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_core::types::AccountId;
    /// assert_eq!(AccountId::from_label("alice"), AccountId::from_label("alice"));
    /// assert_ne!(AccountId::from_label("alice"), AccountId::from_label("bob"));
    /// ```
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..ACCOUNT_ID_LEN]);
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    /// Parse a hex identifier, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let raw = hex::decode(digits).map_err(|e| AccountIdError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ACCOUNT_ID_LEN] =
            raw.as_slice()
                .try_into()
                .map_err(|_| AccountIdError::InvalidLength {
                    got: raw.len(),
                    expected: ACCOUNT_ID_LEN,
                })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ACCOUNT_ID_LEN]> for AccountId {
    fn from(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

/// Fixed-point conversion rate with 18 decimals, in `[0, 1]`.
///
/// `Rate::ONE` honours shares at full nominal value; `Rate::ZERO` honours
/// nothing.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct Rate(u128);

impl Rate {
    /// Full value (`1.0`).
    pub const ONE: Self = Self(RATE_PRECISION);
    /// Nothing honoured (`0.0`).
    pub const ZERO: Self = Self(0);

    /// Build a rate from its raw fixed-point representation, clamped to `1.0`.
    pub fn from_raw(raw: u128) -> Self {
        Self(raw.min(RATE_PRECISION))
    }

    /// Raw fixed-point value (`RATE_PRECISION` means `1.0`).
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Whether the rate has reached zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `value * rate`, truncated to whole ledger units.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_core::types::Rate;
    /// use tally_core::constants::RATE_PRECISION;
    /// let half = Rate::from_raw(RATE_PRECISION / 2);
    /// assert_eq!(half.apply(7), 3);
    /// assert_eq!(Rate::ONE.apply(7), 7);
    /// ```
    pub fn apply(&self, value: u64) -> u64 {
        // value <= u64::MAX and rate <= 10^18, so the result is <= value.
        (value as u128 * self.0 / RATE_PRECISION) as u64
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed(self.0, RATE_DECIMALS))
    }
}

/// An account's raw holding.
///
/// `shares` is the nominal amount counted in total supply. `checkpoint` is
/// the conversion rate at which the position was last settled or first
/// credited; the displayed value scales with `rate / checkpoint`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Position {
    /// Raw ledger units counted in total supply.
    pub shares: u64,
    /// Conversion rate at the last settlement.
    pub checkpoint: Rate,
}

impl Position {
    /// An empty position opened at the given rate.
    pub fn empty(rate: Rate) -> Self {
        Self {
            shares: 0,
            checkpoint: rate,
        }
    }

    /// Whether the position holds no shares.
    pub fn is_empty(&self) -> bool {
        self.shares == 0
    }

    /// Shares normalised to a checkpoint of `1.0`: `shares / checkpoint`.
    ///
    /// The sum of weights times the current rate is the network's total
    /// displayed supply. A position checkpointed at a zero rate carries no
    /// weight: the rate can never rise again, so nothing it holds is ever
    /// discounted.
    pub fn weight(&self) -> u128 {
        if self.checkpoint.is_zero() {
            return 0;
        }
        self.shares as u128 * RATE_PRECISION / self.checkpoint.raw()
    }
}
