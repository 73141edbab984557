//! Hex helpers. Inputs may carry a `0x` prefix or not; outputs always do.

use alloy_primitives::{Address, B256, U256};

use crate::error::CoreError;

fn strip_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Hex encodes `bytes` with a `0x` prefix.
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Hex encodes a quantity without leading zeros, e.g. `0x0` or `0x5208`.
pub fn to_quantity(value: U256) -> String {
    format!("{value:#x}")
}

/// Decodes a hex string. Odd-length input is left padded with a zero nibble.
pub fn hex_to_bytes(value: &str) -> Result<Vec<u8>, CoreError> {
    let digits = strip_prefix(value.trim());
    let decoded = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    };
    decoded.map_err(|_| CoreError::InvalidHex(value.to_string()))
}

/// Parses a hex quantity into a [`U256`].
pub fn hex_to_u256(value: &str) -> Result<U256, CoreError> {
    let digits = strip_prefix(value.trim());
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|_| CoreError::InvalidHex(value.to_string()))
}

/// Whether `value` consists of hex digits, with or without a `0x` prefix.
pub fn is_hex(value: &str) -> bool {
    strip_prefix(value).chars().all(|c| c.is_ascii_hexdigit())
}

/// Whether `value` is a 20-byte hex address.
pub fn is_address(value: &str) -> bool {
    let digits = strip_prefix(value);
    digits.len() == 40 && is_hex(digits)
}

/// Parses an address, accepting input without a `0x` prefix.
pub fn parse_address(value: &str) -> Result<Address, CoreError> {
    if !is_address(value) {
        return Err(CoreError::InvalidAddress(value.to_string()));
    }
    hex_to_bytes(value)
        .map(|bytes| Address::from_slice(&bytes))
        .map_err(|_| CoreError::InvalidAddress(value.to_string()))
}

/// Left pads up to 32 bytes into a word. Longer input is rejected.
pub fn pad_left_32(bytes: &[u8]) -> Result<B256, CoreError> {
    if bytes.len() > 32 {
        return Err(CoreError::InvalidHex(to_hex(bytes)));
    }
    Ok(B256::left_padding_from(bytes))
}
