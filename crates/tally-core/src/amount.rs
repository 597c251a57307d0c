//! Decimal formatting and parsing of fixed-point amounts.
//!
//! Output follows the usual ledger convention: trailing zeros are trimmed but
//! at least one fractional digit is kept (`30.0`, `6.666666`).

use crate::constants::CREDIT_DECIMALS;
use crate::error::AmountError;

/// Format a fixed-point value with `decimals` fractional digits.
pub fn format_fixed(value: u128, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let int_part = value / scale;
    let frac_part = value % scale;
    let frac = format!("{frac_part:0width$}", width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{int_part}.0")
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Format a credit amount given in ledger units.
///
/// # Examples
///
/// ```
/// use tally_core::amount::format_credits;
/// assert_eq!(format_credits(30_000_000), "30.0");
/// assert_eq!(format_credits(6_666_666), "6.666666");
/// assert_eq!(format_credits(0), "0.0");
/// ```
pub fn format_credits(units: u64) -> String {
    format_fixed(units as u128, CREDIT_DECIMALS)
}

/// Parse a decimal credit amount (e.g. `"6.666666"`) into ledger units.
///
/// # Examples
///
/// ```
/// use tally_core::amount::parse_credits;
/// assert_eq!(parse_credits("10").unwrap(), 10_000_000);
/// assert_eq!(parse_credits("6.666666").unwrap(), 6_666_666);
/// assert!(parse_credits("0.0000001").is_err());
/// ```
pub fn parse_credits(s: &str) -> Result<u64, AmountError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_str, frac_str) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_str.is_empty() && frac_str.is_empty() {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if !int_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if frac_str.len() > CREDIT_DECIMALS as usize {
        return Err(AmountError::TooManyDecimals {
            got: frac_str.len(),
            max: CREDIT_DECIMALS,
        });
    }

    let int_value: u64 = if int_str.is_empty() {
        0
    } else {
        int_str.parse().map_err(|_| AmountError::Overflow)?
    };
    let frac_value: u64 = if frac_str.is_empty() {
        0
    } else {
        let padded = format!("{frac_str:0<width$}", width = CREDIT_DECIMALS as usize);
        padded
            .parse()
            .map_err(|_| AmountError::Invalid(s.to_string()))?
    };

    int_value
        .checked_mul(10u64.pow(CREDIT_DECIMALS))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(AmountError::Overflow)
}
