//! Standard (`abi.encode`) and packed (`abi.encodePacked`) encoders.

use alloy_primitives::{I256, U256};

use crate::{
    error::{AbiError, Result},
    types::{AbiType, WORD},
    value::AbiValue,
};

/// Encodes `values` against `types` with the standard head/tail layout.
pub fn encode_abi_parameters(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(AbiError::LengthMismatch { expected: types.len(), given: values.len() });
    }
    encode_sequence(types.iter().zip(values))
}

/// Encodes `values` against `types` the way `abi.encodePacked` does.
///
/// Elementary types take their natural width, dynamic `bytes`/`string` are
/// emitted raw without a length prefix, and array elements are padded to a
/// full word. Tuples cannot be packed.
pub fn encode_packed(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(AbiError::LengthMismatch { expected: types.len(), given: values.len() });
    }
    let mut out = Vec::new();
    for (ty, value) in types.iter().zip(values) {
        encode_packed_value(ty, value, false, &mut out)?;
    }
    Ok(out)
}

/// Encodes a single value as a standalone word sequence.
pub fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>> {
    encode_abi_parameters(std::slice::from_ref(ty), std::slice::from_ref(value))
}

fn encode_sequence<'a, I>(items: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a AbiType, &'a AbiValue)>,
{
    let items: Vec<_> = items.into_iter().collect();
    let head_len: usize = items.iter().map(|(ty, _)| ty.head_size()).sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (ty, value) in items {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            encode_into(ty, value, &mut tail)?;
        } else {
            encode_into(ty, value, &mut head)?;
        }
    }
    head.extend_from_slice(&tail);
    Ok(head)
}

fn encode_into(ty: &AbiType, value: &AbiValue, out: &mut Vec<u8>) -> Result<()> {
    match (ty, value) {
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            check_uint(ty, *bits, *v)?;
            out.extend_from_slice(&v.to_be_bytes::<32>());
        }
        (AbiType::Int(bits), AbiValue::Int(v)) => {
            check_int(ty, *bits, *v)?;
            out.extend_from_slice(&v.into_raw().to_be_bytes::<32>());
        }
        (AbiType::Address, AbiValue::Address(address)) => {
            out.extend_from_slice(&[0u8; 12]);
            out.extend_from_slice(address.as_slice());
        }
        (AbiType::Bool, AbiValue::Bool(b)) => {
            out.extend_from_slice(&usize_word(usize::from(*b)));
        }
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes)) => {
            check_fixed_bytes(ty, *size, bytes.len())?;
            out.extend_from_slice(bytes);
            out.resize(out.len() + WORD - size, 0);
        }
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => encode_dynamic_bytes(bytes, out),
        (AbiType::String, AbiValue::String(s)) => encode_dynamic_bytes(s.as_bytes(), out),
        (AbiType::Array(inner), AbiValue::Array(values)) => {
            out.extend_from_slice(&usize_word(values.len()));
            out.extend(encode_sequence(std::iter::repeat_n(inner.as_ref(), values.len()).zip(values))?);
        }
        (AbiType::FixedArray(inner, size), AbiValue::Array(values)) => {
            if values.len() != *size {
                return Err(AbiError::InvalidArrayLength {
                    ty: ty.canonical(),
                    expected: *size,
                    given: values.len(),
                });
            }
            out.extend(encode_sequence(std::iter::repeat_n(inner.as_ref(), *size).zip(values))?);
        }
        (AbiType::Tuple(components), AbiValue::Tuple(values)) => {
            if values.len() != components.len() {
                return Err(AbiError::LengthMismatch {
                    expected: components.len(),
                    given: values.len(),
                });
            }
            out.extend(encode_sequence(components.iter().zip(values))?);
        }
        _ => return Err(mismatch(ty, value)),
    }
    Ok(())
}

fn encode_packed_value(
    ty: &AbiType,
    value: &AbiValue,
    in_array: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    match (ty, value) {
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            check_uint(ty, *bits, *v)?;
            let width = if in_array { WORD } else { bits / 8 };
            out.extend_from_slice(&v.to_be_bytes::<32>()[WORD - width..]);
        }
        (AbiType::Int(bits), AbiValue::Int(v)) => {
            check_int(ty, *bits, *v)?;
            let width = if in_array { WORD } else { bits / 8 };
            out.extend_from_slice(&v.into_raw().to_be_bytes::<32>()[WORD - width..]);
        }
        (AbiType::Address, AbiValue::Address(address)) => {
            if in_array {
                out.extend_from_slice(&[0u8; 12]);
            }
            out.extend_from_slice(address.as_slice());
        }
        (AbiType::Bool, AbiValue::Bool(b)) => {
            if in_array {
                out.extend_from_slice(&[0u8; WORD - 1]);
            }
            out.push(u8::from(*b));
        }
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes)) => {
            check_fixed_bytes(ty, *size, bytes.len())?;
            out.extend_from_slice(bytes);
            if in_array {
                out.resize(out.len() + WORD - size, 0);
            }
        }
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => out.extend_from_slice(bytes),
        (AbiType::String, AbiValue::String(s)) => out.extend_from_slice(s.as_bytes()),
        (AbiType::Array(inner), AbiValue::Array(values)) => {
            for item in values {
                encode_packed_value(inner, item, true, out)?;
            }
        }
        (AbiType::FixedArray(inner, size), AbiValue::Array(values)) => {
            if values.len() != *size {
                return Err(AbiError::InvalidArrayLength {
                    ty: ty.canonical(),
                    expected: *size,
                    given: values.len(),
                });
            }
            for item in values {
                encode_packed_value(inner, item, true, out)?;
            }
        }
        (AbiType::Tuple(_), _) => return Err(AbiError::UnsupportedPackedType(ty.canonical())),
        _ => return Err(mismatch(ty, value)),
    }
    Ok(())
}

fn encode_dynamic_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.resize(out.len() + padding, 0);
}

pub(crate) fn usize_word(value: usize) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

fn check_uint(ty: &AbiType, bits: usize, value: U256) -> Result<()> {
    if value.bit_len() > bits {
        return Err(AbiError::IntegerOutOfRange { ty: ty.canonical(), value: value.to_string() });
    }
    Ok(())
}

/// An `intN` fits when every bit above `N - 1` is a copy of the sign bit.
pub(crate) fn int_fits(bits: usize, raw: U256) -> bool {
    if bits >= 256 {
        return true;
    }
    let high = raw >> (bits - 1);
    high.is_zero() || high == U256::MAX >> (bits - 1)
}

fn check_int(ty: &AbiType, bits: usize, value: I256) -> Result<()> {
    if !int_fits(bits, value.into_raw()) {
        return Err(AbiError::IntegerOutOfRange { ty: ty.canonical(), value: value.to_string() });
    }
    Ok(())
}

fn check_fixed_bytes(ty: &AbiType, size: usize, given: usize) -> Result<()> {
    if size != given {
        return Err(AbiError::InvalidBytesSize { ty: ty.canonical(), expected: size, given });
    }
    Ok(())
}

fn mismatch(ty: &AbiType, value: &AbiValue) -> AbiError {
    AbiError::TypeMismatch { ty: ty.canonical(), value: format!("{value:?}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, address, hex};

    fn word(n: u64) -> [u8; 32] {
        U256::from(n).to_be_bytes::<32>()
    }

    #[test]
    fn encodes_static_values_in_place() {
        let types = [AbiType::Uint(256), AbiType::Bool, AbiType::Address];
        let values = [
            AbiValue::from(1u64),
            AbiValue::from(true),
            AbiValue::from(address!("0x000000000000000000000000000000000000dEaD")),
        ];
        let encoded = encode_abi_parameters(&types, &values).unwrap();
        assert_eq!(encoded.len(), 96);
        assert_eq!(&encoded[..32], &word(1));
        assert_eq!(&encoded[32..64], &word(1));
        assert_eq!(&encoded[76..], &hex!("000000000000000000000000000000000000dEaD"));
    }

    #[test]
    fn encodes_dynamic_values_through_offsets() {
        let types = [AbiType::Bytes, AbiType::Uint(8)];
        let values = [AbiValue::Bytes(Bytes::from(vec![0xab; 33])), AbiValue::from(7u8)];
        let encoded = encode_abi_parameters(&types, &values).unwrap();
        assert_eq!(&encoded[..32], &word(64));
        assert_eq!(&encoded[32..64], &word(7));
        assert_eq!(&encoded[64..96], &word(33));
        assert_eq!(encoded.len(), 96 + 64);
        assert!(encoded[96 + 33..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_batch_call_arguments() {
        let ty = AbiType::parse("(address,uint256,bytes)[]").unwrap();
        let encoded = encode_value(&ty, &AbiValue::Array(vec![])).unwrap();
        let mut expected = word(32).to_vec();
        expected.extend_from_slice(&word(0));
        assert_eq!(encoded, expected);
    }

    #[test]
    fn rejects_out_of_range_integers() {
        let err = encode_value(&AbiType::Uint(8), &AbiValue::from(256u64)).unwrap_err();
        assert!(matches!(err, AbiError::IntegerOutOfRange { .. }));

        let min = I256::try_from(-128i64).unwrap();
        assert!(encode_value(&AbiType::Int(8), &AbiValue::Int(min)).is_ok());
        let below = I256::try_from(-129i64).unwrap();
        assert!(encode_value(&AbiType::Int(8), &AbiValue::Int(below)).is_err());
        let above = I256::try_from(128i64).unwrap();
        assert!(encode_value(&AbiType::Int(8), &AbiValue::Int(above)).is_err());
    }

    #[test]
    fn rejects_wrong_sizes_and_types() {
        let err = encode_value(&AbiType::FixedBytes(4), &AbiValue::FixedBytes(Bytes::from(vec![1, 2])))
            .unwrap_err();
        assert_eq!(err, AbiError::InvalidBytesSize { ty: "bytes4".into(), expected: 4, given: 2 });

        let ty = AbiType::parse("uint256[2]").unwrap();
        let err = encode_value(&ty, &AbiValue::Array(vec![AbiValue::from(1u64)])).unwrap_err();
        assert!(matches!(err, AbiError::InvalidArrayLength { expected: 2, given: 1, .. }));

        let err = encode_value(&AbiType::Bool, &AbiValue::from(1u64)).unwrap_err();
        assert!(matches!(err, AbiError::TypeMismatch { .. }));

        let err = encode_abi_parameters(&[AbiType::Bool], &[]).unwrap_err();
        assert_eq!(err, AbiError::LengthMismatch { expected: 1, given: 0 });
    }

    #[test]
    fn packs_at_natural_width() {
        let types = [
            AbiType::Uint(8),
            AbiType::Int(16),
            AbiType::Address,
            AbiType::Bool,
            AbiType::FixedBytes(2),
            AbiType::String,
        ];
        let values = [
            AbiValue::from(1u8),
            AbiValue::Int(I256::try_from(-2i64).unwrap()),
            AbiValue::from(address!("0x000000000000000000000000000000000000dEaD")),
            AbiValue::from(true),
            AbiValue::FixedBytes(Bytes::from(vec![0xbe, 0xef])),
            AbiValue::from("hi"),
        ];
        let packed = encode_packed(&types, &values).unwrap();
        assert_eq!(
            hex::encode(packed),
            "01fffe000000000000000000000000000000000000dead01beef6869"
        );
    }

    #[test]
    fn packs_array_elements_padded() {
        let ty = AbiType::parse("uint8[]").unwrap();
        let packed =
            encode_packed(&[ty], &[AbiValue::Array(vec![AbiValue::from(1u8), AbiValue::from(2u8)])])
                .unwrap();
        let mut expected = word(1).to_vec();
        expected.extend_from_slice(&word(2));
        assert_eq!(packed, expected);
    }

    #[test]
    fn rejects_packed_tuples() {
        let ty = AbiType::parse("(uint256)").unwrap();
        let err = encode_packed(&[ty], &[AbiValue::Tuple(vec![AbiValue::from(1u64)])]).unwrap_err();
        assert_eq!(err, AbiError::UnsupportedPackedType("(uint256)".into()));
    }
}
