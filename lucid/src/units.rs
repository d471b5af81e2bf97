//! Lossless conversion between human readable decimal amounts and raw
//! base unit integer strings.
//!
//! Token amounts routinely exceed what an IEEE-754 double can hold, so
//! everything in here is plain string surgery plus `Uint256`, floating
//! point is never involved.

use crate::Error;
use num256::Uint256;
use std::str::FromStr;

fn check_digits(value: &str, what: &str) -> Result<(), Error> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidArgument(format!(
            "{what} must be a base 10 number, got {value:?}"
        )));
    }
    Ok(())
}

fn strip_leading_zeros(value: &str) -> &str {
    let stripped = value.trim_start_matches('0');
    if stripped.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Converts a decimal string into the raw base unit amount for a token
/// with the given number of `decimals`.
///
/// The fractional part is truncated, never rounded, so
/// `parse_units("1.23456789", 6)` is `"1234567"`.
pub fn parse_units(value: &str, decimals: u32) -> Result<String, Error> {
    let decimals = decimals as usize;
    let (integer, fraction) = match value.split_once('.') {
        Some((integer, fraction)) => {
            if fraction.contains('.') {
                return Err(Error::InvalidArgument(format!(
                    "More than one decimal point in {value:?}"
                )));
            }
            (integer, fraction)
        }
        None => (value, ""),
    };
    // "" and "." carry no digits at all, only one side may be empty
    if integer.is_empty() && fraction.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "Amount must be a base 10 number, got {value:?}"
        )));
    }
    let integer = if integer.is_empty() { "0" } else { integer };
    check_digits(integer, "Amount")?;
    if !fraction.is_empty() {
        check_digits(fraction, "Amount")?;
    }

    // truncate, then right pad with zeros to exactly `decimals` digits
    let mut fraction = fraction.to_string();
    fraction.truncate(decimals);
    while fraction.len() < decimals {
        fraction.push('0');
    }

    let combined = format!("{integer}{fraction}");
    Ok(strip_leading_zeros(&combined).to_string())
}

/// Renders a raw base unit integer string as a decimal amount for a token
/// with the given number of `decimals`.
///
/// Trailing zeros of the fractional part are stripped and a bare integer
/// is returned when nothing of it remains.
pub fn format_units(value: &str, decimals: u32) -> Result<String, Error> {
    let decimals = decimals as usize;
    check_digits(value, "Base unit amount")?;

    let padded = if value.len() <= decimals {
        format!("{}{value}", "0".repeat(decimals + 1 - value.len()))
    } else {
        value.to_string()
    };
    let split_at = padded.len() - decimals;
    let integer = strip_leading_zeros(&padded[..split_at]);
    let fraction = padded[split_at..].trim_end_matches('0');

    if fraction.is_empty() {
        Ok(integer.to_string())
    } else {
        Ok(format!("{integer}.{fraction}"))
    }
}

/// `parse_units` straight into a `Uint256`.
pub fn parse_units_uint256(value: &str, decimals: u32) -> Result<Uint256, Error> {
    let raw = parse_units(value, decimals)?;
    Uint256::from_str(&raw)
        .map_err(|_| Error::InvalidArgument(format!("Amount {raw} does not fit in a uint256")))
}

/// `format_units` over an existing `Uint256` amount, infallible since the
/// decimal rendering is digits by construction.
pub fn format_units_uint256(value: Uint256, decimals: u32) -> String {
    format_units(&value.to_string(), decimals).unwrap()
}

#[test]
fn parse_truncates_not_rounds() {
    assert_eq!(parse_units("1.23456789", 6).unwrap(), "1234567");
    assert_eq!(parse_units("1.999999999", 0).unwrap(), "1");
}

#[test]
fn parse_pads_fraction() {
    assert_eq!(parse_units("1.5", 18).unwrap(), "1500000000000000000");
    assert_eq!(parse_units("0.000001", 6).unwrap(), "1");
    assert_eq!(parse_units(".5", 6).unwrap(), "500000");
}

#[test]
fn parse_whole_numbers() {
    assert_eq!(parse_units("123", 0).unwrap(), "123");
    assert_eq!(parse_units("123", 6).unwrap(), "123000000");
    assert_eq!(parse_units("0", 18).unwrap(), "0");
    assert_eq!(parse_units("0.0", 18).unwrap(), "0");
}

#[test]
fn parse_beyond_f64_precision() {
    // 2^64 ether in wei, hopeless for floating point
    assert_eq!(
        parse_units("18446744073709551616.000000000000000001", 18).unwrap(),
        "18446744073709551616000000000000000001"
    );
}

#[test]
fn parse_rejects_garbage() {
    assert!(parse_units("abc", 6).is_err());
    assert!(parse_units("1.2.3", 6).is_err());
    assert!(parse_units("", 6).is_err());
    assert!(parse_units(".", 6).is_err());
    assert!(parse_units("-1", 6).is_err());
    assert!(parse_units("1e18", 6).is_err());
}

#[test]
fn format_splits_at_decimals() {
    assert_eq!(format_units("1234567", 6).unwrap(), "1.234567");
    assert_eq!(format_units("1500000000000000000", 18).unwrap(), "1.5");
    assert_eq!(format_units("1000000", 6).unwrap(), "1");
    assert_eq!(format_units("1", 6).unwrap(), "0.000001");
    assert_eq!(format_units("0", 18).unwrap(), "0");
    assert_eq!(format_units("42", 0).unwrap(), "42");
}

#[test]
fn format_rejects_garbage() {
    assert!(format_units("12a", 6).is_err());
    assert!(format_units("", 18).is_err());
    assert!(format_units("1.5", 18).is_err());
}

#[test]
fn round_trips_up_to_trailing_zeros() {
    for decimals in [0u32, 6, 18] {
        for value in ["1", "42", "1000000"] {
            let raw = parse_units(value, decimals).unwrap();
            assert_eq!(format_units(&raw, decimals).unwrap(), value);
        }
    }
    // trailing zero normalization
    let raw = parse_units("1.500000", 6).unwrap();
    assert_eq!(format_units(&raw, 6).unwrap(), "1.5");
}

#[test]
fn uint256_wrappers() {
    let raw = parse_units_uint256("1.5", 18).unwrap();
    assert_eq!(raw, Uint256::from(1_500_000_000_000_000_000u64));
    assert_eq!(format_units_uint256(raw, 18), "1.5");
}
