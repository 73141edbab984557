use alloy_primitives::{Address, B256, Bytes, I256, U256};
use serde_json::Value;

use crate::{
    error::{AbiError, Result},
    types::AbiType,
};

/// A dynamically typed ABI value.
///
/// Integers are not tagged with a width; the width comes from the [`AbiType`]
/// the value is encoded against and is range checked at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// Unsigned integer of any width.
    Uint(U256),
    /// Signed integer of any width.
    Int(I256),
    /// 20-byte address.
    Address(Address),
    /// Boolean.
    Bool(bool),
    /// `bytesN` payload, exactly N bytes long.
    FixedBytes(Bytes),
    /// Dynamic `bytes`.
    Bytes(Bytes),
    /// UTF-8 `string`.
    String(String),
    /// Elements of `T[]` or `T[k]`.
    Array(Vec<AbiValue>),
    /// Components of a tuple.
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Returns the unsigned integer if this is a [`AbiValue::Uint`].
    pub const fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the address if this is a [`AbiValue::Address`].
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(*address),
            _ => None,
        }
    }

    /// Returns the raw bytes of a `bytes` or `bytesN` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) | Self::FixedBytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the string if this is a [`AbiValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of an array or the components of a tuple.
    pub fn as_slice(&self) -> Option<&[Self]> {
        match self {
            Self::Array(values) | Self::Tuple(values) => Some(values),
            _ => None,
        }
    }

    /// Converts a JSON value into an [`AbiValue`] of the given type.
    ///
    /// Integers may be JSON numbers, decimal strings or `0x` hex strings.
    /// Byte values are hex strings, arrays and tuples are JSON arrays.
    pub fn from_json(ty: &AbiType, value: &Value) -> Result<Self> {
        let invalid = |reason: &str| AbiError::InvalidJsonValue {
            ty: ty.canonical(),
            reason: reason.to_string(),
        };

        match ty {
            AbiType::Uint(_) => match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(|n| Self::Uint(U256::from(n)))
                    .ok_or_else(|| invalid("expected a non-negative integer")),
                Value::String(s) => s
                    .parse::<U256>()
                    .map(Self::Uint)
                    .map_err(|_| invalid("expected a decimal or hex integer")),
                _ => Err(invalid("expected a number or string")),
            },
            AbiType::Int(_) => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(|n| Self::Int(I256::try_from(n).unwrap_or_default()))
                    .ok_or_else(|| invalid("expected an integer")),
                Value::String(s) => parse_i256(s)
                    .map(Self::Int)
                    .ok_or_else(|| invalid("expected a decimal or hex integer")),
                _ => Err(invalid("expected a number or string")),
            },
            AbiType::Address => value
                .as_str()
                .and_then(|s| s.parse::<Address>().ok())
                .map(Self::Address)
                .ok_or_else(|| invalid("expected a 20-byte hex address")),
            AbiType::Bool => value
                .as_bool()
                .map(Self::Bool)
                .ok_or_else(|| invalid("expected a boolean")),
            AbiType::FixedBytes(_) => value
                .as_str()
                .and_then(|s| s.parse::<Bytes>().ok())
                .map(Self::FixedBytes)
                .ok_or_else(|| invalid("expected a hex string")),
            AbiType::Bytes => value
                .as_str()
                .and_then(|s| s.parse::<Bytes>().ok())
                .map(Self::Bytes)
                .ok_or_else(|| invalid("expected a hex string")),
            AbiType::String => value
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(|| invalid("expected a string")),
            AbiType::Array(inner) | AbiType::FixedArray(inner, _) => {
                let items = value.as_array().ok_or_else(|| invalid("expected an array"))?;
                items
                    .iter()
                    .map(|item| Self::from_json(inner, item))
                    .collect::<Result<Vec<_>>>()
                    .map(Self::Array)
            }
            AbiType::Tuple(components) => {
                let items = value.as_array().ok_or_else(|| invalid("expected an array"))?;
                if items.len() != components.len() {
                    return Err(AbiError::LengthMismatch {
                        expected: components.len(),
                        given: items.len(),
                    });
                }
                components
                    .iter()
                    .zip(items)
                    .map(|(component, item)| Self::from_json(component, item))
                    .collect::<Result<Vec<_>>>()
                    .map(Self::Tuple)
            }
        }
    }
}

fn parse_i256(s: &str) -> Option<I256> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = digits.parse::<U256>().ok()?;
    let value = I256::checked_from_sign_and_abs(
        if negative { alloy_primitives::Sign::Negative } else { alloy_primitives::Sign::Positive },
        magnitude,
    )?;
    Some(value)
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<u64> for AbiValue {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<u8> for AbiValue {
    fn from(value: u8) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<I256> for AbiValue {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<Address> for AbiValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<bool> for AbiValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<B256> for AbiValue {
    fn from(value: B256) -> Self {
        Self::FixedBytes(Bytes::copy_from_slice(value.as_slice()))
    }
}

impl From<Bytes> for AbiValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for AbiValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<String> for AbiValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AbiValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vec<Self>> for AbiValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn converts_json_integers() {
        let ty = AbiType::Uint(256);
        assert_eq!(AbiValue::from_json(&ty, &json!(42)).unwrap(), AbiValue::from(42u64));
        assert_eq!(AbiValue::from_json(&ty, &json!("42")).unwrap(), AbiValue::from(42u64));
        assert_eq!(AbiValue::from_json(&ty, &json!("0x2a")).unwrap(), AbiValue::from(42u64));
        assert!(AbiValue::from_json(&ty, &json!(-1)).is_err());

        let ty = AbiType::Int(32);
        assert_eq!(
            AbiValue::from_json(&ty, &json!("-5")).unwrap(),
            AbiValue::Int(I256::try_from(-5i64).unwrap())
        );
        assert_eq!(
            AbiValue::from_json(&ty, &json!(-5)).unwrap(),
            AbiValue::Int(I256::try_from(-5i64).unwrap())
        );
    }

    #[test]
    fn converts_json_tuples() {
        let ty = AbiType::parse("(address,uint256,bytes)[]").unwrap();
        let value = json!([["0x000000000000000000000000000000000000dEaD", "1", "0x1234"]]);
        let parsed = AbiValue::from_json(&ty, &value).unwrap();
        assert_eq!(
            parsed,
            AbiValue::Array(vec![AbiValue::Tuple(vec![
                AbiValue::Address(address!("0x000000000000000000000000000000000000dEaD")),
                AbiValue::from(1u64),
                AbiValue::Bytes(Bytes::from(vec![0x12, 0x34])),
            ])])
        );

        let err = AbiValue::from_json(&AbiType::parse("(bool,bool)").unwrap(), &json!([true]))
            .unwrap_err();
        assert_eq!(err, AbiError::LengthMismatch { expected: 2, given: 1 });
    }

    #[test]
    fn rejects_wrong_json_shapes() {
        assert!(AbiValue::from_json(&AbiType::Bool, &json!("true")).is_err());
        assert!(AbiValue::from_json(&AbiType::Address, &json!("0x1234")).is_err());
        assert!(AbiValue::from_json(&AbiType::Bytes, &json!("zz")).is_err());
    }
}
