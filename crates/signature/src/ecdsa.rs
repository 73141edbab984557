use alloy_primitives::{Bytes, Signature, U256};

use crate::error::{Result, SignatureError};

/// Serializes `r || s || v` into 65 bytes. `v` may be a parity (0/1) or 27/28.
pub fn serialize_signature(r: U256, s: U256, v: u8) -> Bytes {
    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&r.to_be_bytes::<32>());
    out.extend_from_slice(&s.to_be_bytes::<32>());
    out.push(if v < 27 { v + 27 } else { v });
    Bytes::from(out)
}

/// Parses a 65-byte `r || s || v` secp256k1 signature.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature> {
    if bytes.len() != 65 {
        return Err(SignatureError::InvalidLength { expected: "65", given: bytes.len() });
    }
    let y_parity = match bytes[64] {
        0 | 27 => false,
        1 | 28 => true,
        v => return Err(SignatureError::InvalidSignature(format!("invalid recovery id {v}"))),
    };
    Ok(Signature::new(
        U256::from_be_slice(&bytes[..32]),
        U256::from_be_slice(&bytes[32..64]),
        y_parity,
    ))
}

/// `27 + y_parity`.
pub fn signature_v(signature: &Signature) -> u8 {
    27 + u8::from(signature.v())
}
