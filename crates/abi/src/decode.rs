use alloy_primitives::{Address, Bytes, I256, U256};

use crate::{
    encode::int_fits,
    error::{AbiError, Result},
    types::{AbiType, WORD},
    value::AbiValue,
};

/// Decodes standard ABI encoded `data` into one value per type.
pub fn decode_abi_parameters(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>> {
    if data.is_empty() && !types.is_empty() {
        let needed = types.iter().map(AbiType::head_size).sum();
        return Err(AbiError::DataTooShort { ty: tuple_name(types), needed, given: 0 });
    }
    decode_sequence(types.iter(), data)
}

fn decode_sequence<'a, I>(types: I, data: &[u8]) -> Result<Vec<AbiValue>>
where
    I: IntoIterator<Item = &'a AbiType>,
{
    let mut values = Vec::new();
    let mut pos = 0;
    for ty in types {
        if ty.is_dynamic() {
            let offset = read_usize(ty, data, pos)?;
            if offset > data.len() {
                return Err(AbiError::InvalidOffset { offset: offset.to_string(), len: data.len() });
            }
            values.push(decode_value(ty, &data[offset..])?);
        } else {
            values.push(decode_value(ty, &data[pos.min(data.len())..])?);
        }
        pos += ty.head_size();
    }
    Ok(values)
}

fn decode_value(ty: &AbiType, data: &[u8]) -> Result<AbiValue> {
    match ty {
        AbiType::Uint(bits) => {
            let value = U256::from_be_bytes(read_word(ty, data, 0)?);
            if value.bit_len() > *bits {
                return Err(invalid(ty, "value exceeds declared width"));
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::Int(bits) => {
            let raw = U256::from_be_bytes(read_word(ty, data, 0)?);
            if !int_fits(*bits, raw) {
                return Err(invalid(ty, "value is not sign extended"));
            }
            Ok(AbiValue::Int(I256::from_raw(raw)))
        }
        AbiType::Address => {
            let word = read_word(ty, data, 0)?;
            if word[..12].iter().any(|b| *b != 0) {
                return Err(invalid(ty, "dirty high bytes"));
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiType::Bool => match read_word(ty, data, 0)? {
            word if word[..31].iter().all(|b| *b == 0) && word[31] <= 1 => {
                Ok(AbiValue::Bool(word[31] == 1))
            }
            _ => Err(invalid(ty, "expected 0 or 1")),
        },
        AbiType::FixedBytes(size) => {
            let word = read_word(ty, data, 0)?;
            Ok(AbiValue::FixedBytes(Bytes::copy_from_slice(&word[..*size])))
        }
        AbiType::Bytes => Ok(AbiValue::Bytes(Bytes::copy_from_slice(read_dynamic(ty, data)?))),
        AbiType::String => {
            let raw = read_dynamic(ty, data)?;
            let s = std::str::from_utf8(raw).map_err(|_| invalid(ty, "invalid utf-8"))?;
            Ok(AbiValue::String(s.to_string()))
        }
        AbiType::Array(inner) => {
            let len = read_usize(ty, data, 0)?;
            let body = &data[WORD..];
            let needed = len.saturating_mul(inner.head_size());
            if needed > body.len() {
                return Err(AbiError::DataTooShort { ty: ty.canonical(), needed, given: body.len() });
            }
            decode_sequence(std::iter::repeat_n(inner.as_ref(), len), body).map(AbiValue::Array)
        }
        AbiType::FixedArray(inner, size) => {
            decode_sequence(std::iter::repeat_n(inner.as_ref(), *size), data).map(AbiValue::Array)
        }
        AbiType::Tuple(components) => {
            decode_sequence(components.iter(), data).map(AbiValue::Tuple)
        }
    }
}

fn read_word(ty: &AbiType, data: &[u8], pos: usize) -> Result<[u8; 32]> {
    data.get(pos..pos + WORD)
        .and_then(|slice| <[u8; 32]>::try_from(slice).ok())
        .ok_or_else(|| AbiError::DataTooShort {
            ty: ty.canonical(),
            needed: pos + WORD,
            given: data.len(),
        })
}

fn read_usize(ty: &AbiType, data: &[u8], pos: usize) -> Result<usize> {
    let word = U256::from_be_bytes(read_word(ty, data, pos)?);
    usize::try_from(word)
        .map_err(|_| AbiError::InvalidOffset { offset: word.to_string(), len: data.len() })
}

fn read_dynamic<'a>(ty: &AbiType, data: &'a [u8]) -> Result<&'a [u8]> {
    let len = read_usize(ty, data, 0)?;
    let end = WORD.checked_add(len).filter(|end| *end <= data.len()).ok_or_else(|| {
        AbiError::DataTooShort { ty: ty.canonical(), needed: WORD.saturating_add(len), given: data.len() }
    })?;
    Ok(&data[WORD..end])
}

fn invalid(ty: &AbiType, reason: &str) -> AbiError {
    AbiError::InvalidEncoding { ty: ty.canonical(), reason: reason.to_string() }
}

fn tuple_name(types: &[AbiType]) -> String {
    AbiType::Tuple(types.to_vec()).canonical()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_abi_parameters;
    use alloy_primitives::address;

    #[test]
    fn round_trips_mixed_parameters() {
        let types: Vec<AbiType> = ["address", "uint96", "int24", "bytes", "string", "bytes3", "(bool,uint256[])[2]"]
            .into_iter()
            .map(|ty| AbiType::parse(ty).unwrap())
            .collect();
        let values = vec![
            AbiValue::from(address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032")),
            AbiValue::from(u64::MAX),
            AbiValue::Int(I256::try_from(-8_388_608i64).unwrap()),
            AbiValue::Bytes(Bytes::from(vec![7u8; 70])),
            AbiValue::from("passkey"),
            AbiValue::FixedBytes(Bytes::from(vec![1, 2, 3])),
            AbiValue::Array(vec![
                AbiValue::Tuple(vec![AbiValue::from(true), AbiValue::Array(vec![AbiValue::from(9u64)])]),
                AbiValue::Tuple(vec![AbiValue::from(false), AbiValue::Array(vec![])]),
            ]),
        ];

        let encoded = encode_abi_parameters(&types, &values).unwrap();
        assert_eq!(decode_abi_parameters(&types, &encoded).unwrap(), values);
    }

    #[test]
    fn rejects_short_data() {
        let err = decode_abi_parameters(&[AbiType::Uint(256)], &[0u8; 31]).unwrap_err();
        assert!(matches!(err, AbiError::DataTooShort { needed: 32, given: 31, .. }));

        let err = decode_abi_parameters(&[AbiType::Uint(256)], &[]).unwrap_err();
        assert!(matches!(err, AbiError::DataTooShort { given: 0, .. }));
    }

    #[test]
    fn rejects_out_of_bounds_offsets() {
        let mut data = U256::from(4096u64).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&[0u8; 32]);
        let err = decode_abi_parameters(&[AbiType::Bytes], &data).unwrap_err();
        assert!(matches!(err, AbiError::InvalidOffset { .. }));
    }

    #[test]
    fn rejects_huge_array_lengths_before_allocating() {
        let mut data = U256::from(32u64).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&U256::from(u64::MAX).to_be_bytes::<32>());
        let ty = AbiType::parse("uint256[]").unwrap();
        let err = decode_abi_parameters(&[ty], &data).unwrap_err();
        assert!(matches!(err, AbiError::DataTooShort { .. }));
    }

    #[test]
    fn rejects_dirty_words() {
        let mut word = [0u8; 32];
        word[31] = 2;
        assert!(decode_abi_parameters(&[AbiType::Bool], &word).is_err());
        word[31] = 0;
        word[0] = 1;
        assert!(decode_abi_parameters(&[AbiType::Address], &word).is_err());
        assert!(decode_abi_parameters(&[AbiType::Uint(8)], &word).is_err());
    }
}
