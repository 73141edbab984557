//! P-256 point and signature helpers used for passkey owners.

use alloy_primitives::{B256, U256, keccak256, uint};
use p256::ecdsa::Signature as P256EcdsaSignature;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignatureError};

/// Order of the P-256 base point.
pub const P256_N: U256 =
    uint!(0xFFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551_U256);

/// `P256_N / 2`; signatures with a larger `s` are malleable.
pub const P256_N_DIV_2: U256 =
    uint!(0x7FFFFFFF800000007FFFFFFFFFFFFFFFDE737D56D38BCF4279DCE5617E3192A8_U256);

/// Splits a 64-byte `a || b` blob, or a 65-byte one carrying a leading
/// prefix byte, into two big-endian integers.
///
/// Public keys yield `(x, y)` and signatures yield `(r, s)`; callers know
/// which one they passed in.
pub fn parse_p256_signature(bytes: &[u8]) -> Result<(U256, U256)> {
    let body = match bytes.len() {
        64 => bytes,
        65 => &bytes[1..],
        given => return Err(SignatureError::InvalidLength { expected: "64 or 65", given }),
    };
    Ok((U256::from_be_slice(&body[..32]), U256::from_be_slice(&body[32..])))
}

/// Affine coordinates of a P-256 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct P256PublicKey {
    /// Affine x.
    pub x: U256,
    /// Affine y.
    pub y: U256,
}

impl P256PublicKey {
    /// Parses a raw `x || y` key or an uncompressed SEC1 `0x04 || x || y` key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() == 65 && bytes[0] != 0x04 {
            return Err(SignatureError::InvalidPublicKey(format!(
                "unsupported SEC1 prefix {:#04x}",
                bytes[0]
            )));
        }
        let (x, y) = parse_p256_signature(bytes)
            .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { x, y })
    }

    /// Raw 64-byte `x || y`.
    pub fn to_raw(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.x.to_be_bytes::<32>());
        out[32..].copy_from_slice(&self.y.to_be_bytes::<32>());
        out
    }

    /// `keccak256(abi.encode(x, y))`, the key's identity inside the multisig plugin.
    pub fn sender(&self) -> B256 {
        keccak256(self.to_raw())
    }
}

/// A P-256 ECDSA signature as two integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct P256Signature {
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

impl P256Signature {
    /// Parses raw 64-byte `r || s`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let (r, s) = parse_p256_signature(bytes)?;
        Ok(Self { r, s })
    }

    /// Parses an ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let signature =
            P256EcdsaSignature::from_der(der).map_err(|e| SignatureError::InvalidDer(e.to_string()))?;
        let (r, s) = signature.split_bytes();
        Ok(Self { r: U256::from_be_slice(&r), s: U256::from_be_slice(&s) })
    }

    /// Canonical DER encoding, minimal integers with a zero byte where the high bit is set.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let signature = P256EcdsaSignature::from_scalars(
            self.r.to_be_bytes::<32>(),
            self.s.to_be_bytes::<32>(),
        )
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// Raw 64-byte `r || s`.
    pub fn to_raw(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        out[32..].copy_from_slice(&self.s.to_be_bytes::<32>());
        out
    }

    /// Low-S form. The on-chain verifier rejects `s > n / 2`.
    pub fn normalize(self) -> Self {
        Self { r: self.r, s: normalize_s(self.s) }
    }

    /// Whether `s` is already in low-S form.
    pub fn is_normalized(&self) -> bool {
        self.s <= P256_N_DIV_2
    }
}

/// Replaces `s` with `n - s` when `s > n / 2`.
pub fn normalize_s(s: U256) -> U256 {
    if s > P256_N_DIV_2 { P256_N - s } else { s }
}

/// Converts a DER signature to raw `r || s`.
pub fn der_to_raw(der: &[u8]) -> Result<[u8; 64]> {
    P256Signature::from_der(der).map(|signature| signature.to_raw())
}

/// Converts raw `r || s` to DER.
pub fn raw_to_der(raw: &[u8]) -> Result<Vec<u8>> {
    P256Signature::from_slice(raw)?.to_der()
}
