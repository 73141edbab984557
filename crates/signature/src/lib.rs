//! Signature parsing, normalization and hashing for Circle modular wallet owners.

pub mod ecdsa;
pub mod error;
pub mod message;
pub mod replay_safe;
pub mod secp256r1;
pub mod typed_data;
pub mod webauthn;

pub use ecdsa::{parse_signature, serialize_signature};
pub use error::{Result, SignatureError};
pub use message::hash_message;
pub use replay_safe::{replay_safe_hash, replay_safe_typed_data};
pub use secp256r1::{P256PublicKey, P256Signature, parse_p256_signature};
pub use typed_data::{StructuredDataEncoder, TypedData, TypedDataDomain, hash_typed_data};
pub use webauthn::{
    AuthenticatorAssertion, WebAuthnData, WebAuthnSignResult, challenge_for, process_assertion,
};
