use mw_abi::AbiError;
use thiserror::Error;

/// Result of signature helpers.
pub type Result<T, E = SignatureError> = std::result::Result<T, E>;

/// Errors raised while parsing, normalising or hashing signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("expected {expected} bytes, got {given}")]
    InvalidLength { expected: &'static str, given: usize },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid DER signature: {0}")]
    InvalidDer(String),

    #[error("invalid P-256 public key: {0}")]
    InvalidPublicKey(String),

    #[error("`{field}` is not valid base64url")]
    InvalidBase64 { field: &'static str },

    #[error("invalid clientDataJSON: {0}")]
    InvalidClientData(String),

    #[error("invalid typed data: {0}")]
    InvalidTypedData(String),

    #[error(transparent)]
    Abi(#[from] AbiError),
}
