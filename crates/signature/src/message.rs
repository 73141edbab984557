use alloy_primitives::{B256, keccak256};

/// Prefix of EIP-191 personal messages.
pub const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// `"\x19Ethereum Signed Message:\n" ++ len(message) ++ message`.
pub fn to_prefixed_message(message: impl AsRef<[u8]>) -> Vec<u8> {
    let message = message.as_ref();
    let mut out = Vec::with_capacity(EIP191_PREFIX.len() + 20 + message.len());
    out.extend_from_slice(EIP191_PREFIX.as_bytes());
    out.extend_from_slice(message.len().to_string().as_bytes());
    out.extend_from_slice(message);
    out
}

/// EIP-191 hash of raw message bytes. String messages must be UTF-8 encoded first.
pub fn hash_message(message: impl AsRef<[u8]>) -> B256 {
    keccak256(to_prefixed_message(message))
}
