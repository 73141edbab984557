//! Account owners and the signature layouts the multisig plugin verifies.
//!
//! A local key signs with secp256k1 and is packed as `r || s || sigType`.
//! A passkey signs through a [`WebAuthnAuthenticator`] and is packed as
//! `sender || uint256(65) || sigType || uint256(len) || payload`, where the
//! payload is the ABI encoded assertion. Signatures over a user operation
//! hash carry the digest flag (`+32`) in `sigType`.

use std::{fmt::Debug, sync::Arc};

use alloy_primitives::{Address, B256, Bytes, Signature, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use mw_abi::{AbiType, AbiValue, encode_packed};
use mw_core::constants::{ECDSA_STUB_SIGNATURE, STUB_SIGNATURE};
use mw_signature::{
    AuthenticatorAssertion, P256PublicKey, WebAuthnSignResult, challenge_for, ecdsa::signature_v,
    hash_message, process_assertion,
};
use tracing::debug;

use crate::error::{AccountError, Result};

/// Added to `sigType` when the signed hash is a user operation hash.
pub const DIGEST_FLAG: u8 = 32;

/// `sigType` of a WebAuthn owner signature.
pub const WEBAUTHN_SIG_TYPE: u8 = 2;

/// Offset of the dynamic payload inside a packed WebAuthn signature.
const WEBAUTHN_DYNAMIC_OFFSET: u64 = 65;

/// How the plugin identifies an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerIdentity {
    /// A secp256k1 key, identified by its address.
    Eoa(Address),
    /// A passkey, identified by its P-256 public key.
    WebAuthn(P256PublicKey),
}

impl OwnerIdentity {
    /// The owner's 32-byte identity: the left padded address or `keccak256(x || y)`.
    pub fn sender(&self) -> B256 {
        match self {
            Self::Eoa(address) => address.into_word(),
            Self::WebAuthn(public_key) => public_key.sender(),
        }
    }
}

/// A raw owner signature, before packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSignature {
    /// secp256k1 signature from a local key.
    Ecdsa(Signature),
    /// Passkey assertion with its normalized P-256 signature.
    WebAuthn(WebAuthnSignResult),
}

impl OwnerSignature {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Ecdsa(_) => "ECDSA",
            Self::WebAuthn(_) => "WebAuthn",
        }
    }
}

/// The signing capability of a smart account owner.
#[async_trait]
pub trait Owner: Send + Sync + Debug {
    /// How the plugin refers to this owner.
    fn identity(&self) -> OwnerIdentity;

    /// Signs a 32-byte hash as is.
    async fn sign(&self, hash: B256) -> Result<OwnerSignature>;

    /// Signs the EIP-191 digest of `message`.
    async fn sign_message(&self, message: &[u8]) -> Result<OwnerSignature> {
        self.sign(hash_message(message)).await
    }

    /// Packs a signature produced by this owner into the plugin layout.
    fn pack_signature(&self, signature: &OwnerSignature, user_operation: bool) -> Result<Bytes>;

    /// A correctly sized placeholder used for gas estimation.
    fn stub_signature(&self) -> Bytes;
}

/// `r || s || v`, with [`DIGEST_FLAG`] added to `v` for user operation hashes.
pub fn pack_ecdsa_signature(signature: &Signature, user_operation: bool) -> Result<Bytes> {
    let v = signature_v(signature);
    let sig_type = if user_operation { v + DIGEST_FLAG } else { v };
    let packed = encode_packed(
        &[AbiType::FixedBytes(32), AbiType::FixedBytes(32), AbiType::Uint(8)],
        &[
            AbiValue::from(B256::from(signature.r())),
            AbiValue::from(B256::from(signature.s())),
            AbiValue::from(sig_type),
        ],
    )?;
    Ok(packed.into())
}

/// `sender || uint256(65) || sigType || uint256(len) || payload` for a passkey signature.
pub fn pack_webauthn_signature(
    public_key: &P256PublicKey,
    result: &WebAuthnSignResult,
    user_operation: bool,
) -> Result<Bytes> {
    let payload = result.encode()?;
    let sig_type =
        if user_operation { WEBAUTHN_SIG_TYPE + DIGEST_FLAG } else { WEBAUTHN_SIG_TYPE };
    let packed = encode_packed(
        &[
            AbiType::FixedBytes(32),
            AbiType::Uint(256),
            AbiType::Uint(8),
            AbiType::Uint(256),
            AbiType::Bytes,
        ],
        &[
            AbiValue::from(public_key.sender()),
            AbiValue::from(WEBAUTHN_DYNAMIC_OFFSET),
            AbiValue::from(sig_type),
            AbiValue::Uint(U256::from(payload.len())),
            AbiValue::from(payload),
        ],
    )?;
    Ok(packed.into())
}

/// An owner backed by a secp256k1 private key held in memory.
#[derive(Debug, Clone)]
pub struct LocalOwner {
    signer: PrivateKeySigner,
}

impl LocalOwner {
    /// Wraps an existing signer.
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Parses a hex private key, with or without `0x`.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let signer = private_key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| AccountError::Signer(e.to_string()))?;
        Ok(Self::new(signer))
    }

    /// Address of the key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl Owner for LocalOwner {
    fn identity(&self) -> OwnerIdentity {
        OwnerIdentity::Eoa(self.signer.address())
    }

    async fn sign(&self, hash: B256) -> Result<OwnerSignature> {
        Ok(OwnerSignature::Ecdsa(self.signer.sign_hash_sync(&hash)?))
    }

    fn pack_signature(&self, signature: &OwnerSignature, user_operation: bool) -> Result<Bytes> {
        match signature {
            OwnerSignature::Ecdsa(signature) => pack_ecdsa_signature(signature, user_operation),
            other => Err(AccountError::SignatureMismatch { owner: "local", signature: other.kind() }),
        }
    }

    fn stub_signature(&self) -> Bytes {
        Bytes::from_static(&ECDSA_STUB_SIGNATURE)
    }
}

/// A registered passkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthnCredential {
    /// Base64url credential id.
    pub id: String,
    /// Credential public key.
    pub public_key: P256PublicKey,
    /// Relying party the credential is scoped to.
    pub rp_id: String,
}

impl WebAuthnCredential {
    /// `public_key` is raw `x || y` or SEC1 uncompressed `0x04 || x || y`.
    pub fn new(id: impl Into<String>, public_key: &[u8], rp_id: impl Into<String>) -> Result<Self> {
        let public_key = P256PublicKey::from_slice(public_key)
            .map_err(|e| AccountError::InvalidCredential(e.to_string()))?;
        Ok(Self { id: id.into(), public_key, rp_id: rp_id.into() })
    }
}

/// The platform capability that produces WebAuthn assertions, e.g. a
/// browser bridge or a hardware key.
#[async_trait]
pub trait WebAuthnAuthenticator: Send + Sync + Debug {
    /// Asks the credential to sign `challenge`, the base64url challenge string.
    async fn get_assertion(
        &self,
        rp_id: &str,
        credential_id: &str,
        challenge: &str,
    ) -> Result<AuthenticatorAssertion>;
}

/// An owner backed by a passkey.
#[derive(Debug, Clone)]
pub struct WebAuthnOwner {
    credential: WebAuthnCredential,
    authenticator: Arc<dyn WebAuthnAuthenticator>,
}

impl WebAuthnOwner {
    /// An owner that signs with `credential` through `authenticator`.
    pub fn new(credential: WebAuthnCredential, authenticator: Arc<dyn WebAuthnAuthenticator>) -> Self {
        Self { credential, authenticator }
    }

    /// The passkey this owner signs with.
    pub const fn credential(&self) -> &WebAuthnCredential {
        &self.credential
    }
}

#[async_trait]
impl Owner for WebAuthnOwner {
    fn identity(&self) -> OwnerIdentity {
        OwnerIdentity::WebAuthn(self.credential.public_key)
    }

    async fn sign(&self, hash: B256) -> Result<OwnerSignature> {
        let challenge = challenge_for(hash);
        debug!(message = "requesting WebAuthn assertion", credential = %self.credential.id);
        let assertion = self
            .authenticator
            .get_assertion(&self.credential.rp_id, &self.credential.id, &challenge)
            .await?;
        let result = process_assertion(&assertion)?;
        if result.webauthn.challenge() != Some(challenge.as_str()) {
            return Err(AccountError::Authenticator(
                "assertion was produced for a different challenge".into(),
            ));
        }
        Ok(OwnerSignature::WebAuthn(result))
    }

    fn pack_signature(&self, signature: &OwnerSignature, user_operation: bool) -> Result<Bytes> {
        match signature {
            OwnerSignature::WebAuthn(result) => {
                pack_webauthn_signature(&self.credential.public_key, result, user_operation)
            }
            other => {
                Err(AccountError::SignatureMismatch { owner: "WebAuthn", signature: other.kind() })
            }
        }
    }

    fn stub_signature(&self) -> Bytes {
        Bytes::from_static(&STUB_SIGNATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{U256, hex, uint};
    use mw_signature::{P256Signature, WebAuthnData};

    const G_X: U256 = uint!(0x6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296_U256);
    const G_Y: U256 = uint!(0x4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5_U256);

    fn stub_vector() -> (P256PublicKey, WebAuthnSignResult) {
        let client_data_json = r#"{"type":"webauthn.get","challenge":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA","origin":"https://localhost","crossOrigin":false}"#;
        let webauthn = WebAuthnData::new(
            hex!("49960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d97630500000000")
                .to_vec(),
            client_data_json.to_string(),
        )
        .unwrap();
        let signature = P256Signature {
            r: U256::from_be_bytes([0x11; 32]),
            s: U256::from_be_bytes([0x22; 32]),
        };
        (P256PublicKey { x: G_X, y: G_Y }, WebAuthnSignResult { signature, webauthn })
    }

    #[test]
    fn webauthn_packing_matches_stub_vector() {
        let (public_key, result) = stub_vector();
        assert_eq!(
            public_key.sender(),
            B256::from(hex!("a000ddb94882f9f9cd0a859ed3a9f047ad43d7e2e4e7e491f1fe2e657a2651b6"))
        );

        let packed = pack_webauthn_signature(&public_key, &result, true).unwrap();
        assert_eq!(packed.as_ref(), STUB_SIGNATURE.as_slice());

        let raw = pack_webauthn_signature(&public_key, &result, false).unwrap();
        assert_eq!(raw[64], WEBAUTHN_SIG_TYPE);
        assert_eq!(raw[..64], packed[..64]);
        assert_eq!(raw[65..], packed[65..]);
    }

    #[test]
    fn ecdsa_packing_sets_digest_flag() {
        let signature = Signature::new(U256::from(1), U256::from(2), true);
        let plain = pack_ecdsa_signature(&signature, false).unwrap();
        let flagged = pack_ecdsa_signature(&signature, true).unwrap();

        assert_eq!(plain.len(), 65);
        assert_eq!(plain[31], 1);
        assert_eq!(plain[63], 2);
        assert_eq!(plain[64], 28);
        assert_eq!(flagged[64], 60);
    }

    #[tokio::test]
    async fn local_owner_signs_raw_hashes() {
        let owner = LocalOwner::from_private_key(
            "0x4242424242424242424242424242424242424242424242424242424242424242",
        )
        .unwrap();
        let hash = B256::repeat_byte(0x07);
        let OwnerSignature::Ecdsa(signature) = owner.sign(hash).await.unwrap() else {
            panic!("local owners produce ECDSA signatures");
        };
        assert_eq!(signature.recover_address_from_prehash(&hash).unwrap(), owner.address());
        assert_eq!(owner.identity().sender(), owner.address().into_word());
        assert_eq!(owner.stub_signature().len(), 65);
    }

    #[test]
    fn owners_reject_foreign_signatures() {
        let owner = LocalOwner::new(PrivateKeySigner::from_bytes(&B256::repeat_byte(1)).unwrap());
        let (_, result) = stub_vector();
        let err = owner.pack_signature(&OwnerSignature::WebAuthn(result), false).unwrap_err();
        assert!(matches!(err, AccountError::SignatureMismatch { owner: "local", .. }));
    }

    #[test]
    fn credential_accepts_sec1_keys() {
        let mut sec1 = vec![0x04];
        sec1.extend_from_slice(&G_X.to_be_bytes::<32>());
        sec1.extend_from_slice(&G_Y.to_be_bytes::<32>());
        let credential = WebAuthnCredential::new("id", &sec1, "localhost").unwrap();
        assert_eq!(credential.public_key, P256PublicKey { x: G_X, y: G_Y });

        assert!(matches!(
            WebAuthnCredential::new("id", &sec1[..40], "localhost"),
            Err(AccountError::InvalidCredential(_))
        ));
    }
}
