use mw_abi::AbiError;
use mw_core::CoreError;
use mw_rpc::TransportError;
use mw_signature::SignatureError;
use thiserror::Error;

/// Result of account operations.
pub type Result<T, E = AccountError> = std::result::Result<T, E>;

/// Failures of account resolution, nonce reads and signing.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The local key could not sign.
    #[error("signer failed: {0}")]
    Signer(String),

    /// The passkey authenticator failed or answered a different challenge.
    #[error("authenticator failed: {0}")]
    Authenticator(String),

    /// Malformed passkey public key.
    #[error("invalid WebAuthn credential: {0}")]
    InvalidCredential(String),

    /// An owner was asked to pack another owner kind's signature.
    #[error("{owner} owner cannot pack a {signature} signature")]
    SignatureMismatch { owner: &'static str, signature: &'static str },

    /// A contract read returned something unexpected.
    #[error("unexpected `{function}` return data: {reason}")]
    InvalidReturnData { function: &'static str, reason: String },

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<alloy_signer::Error> for AccountError {
    fn from(err: alloy_signer::Error) -> Self {
        Self::Signer(err.to_string())
    }
}
