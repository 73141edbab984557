use alloy_primitives::U256;

use crate::error::CoreError;

/// Decimals of ether.
pub const ETHER_DECIMALS: u8 = 18;

/// Decimals of gwei.
pub const GWEI_DECIMALS: u8 = 9;

/// Multiplies a decimal string by `10^decimals`.
///
/// Extra fractional digits are rounded half up, so `parse_units("1.25", 1)`
/// is 13.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256, CoreError> {
    let invalid = |reason| CoreError::InvalidDecimal { value: value.to_string(), reason };
    let decimals = usize::from(decimals);

    let trimmed = value.trim();
    let (integer, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid("empty value"));
    }
    if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected digits and at most one decimal point"));
    }

    let (kept, round_up) = if fraction.len() > decimals {
        (&fraction[..decimals], fraction.as_bytes()[decimals] >= b'5')
    } else {
        (fraction, false)
    };

    let mut digits = format!("{integer}{kept:0<decimals$}");
    if digits.is_empty() {
        digits.push('0');
    }
    let scaled = U256::from_str_radix(&digits, 10).map_err(|_| invalid("value overflows 256 bits"))?;
    if round_up {
        return scaled.checked_add(U256::from(1)).ok_or_else(|| invalid("value overflows 256 bits"));
    }
    Ok(scaled)
}

/// Divides `value` by `10^decimals` and renders it without trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = usize::from(decimals);
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() { integer.to_string() } else { format!("{integer}.{fraction}") }
}

/// `parse_units(value, 18)`.
pub fn parse_ether(value: &str) -> Result<U256, CoreError> {
    parse_units(value, ETHER_DECIMALS)
}

/// `format_units(value, 18)`.
pub fn format_ether(value: U256) -> String {
    format_units(value, ETHER_DECIMALS)
}

/// `parse_units(value, 9)`.
pub fn parse_gwei(value: &str) -> Result<U256, CoreError> {
    parse_units(value, GWEI_DECIMALS)
}

/// `format_units(value, 9)`.
pub fn format_gwei(value: U256) -> String {
    format_units(value, GWEI_DECIMALS)
}
