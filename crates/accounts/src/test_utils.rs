//! A software passkey and fixtures for exercising WebAuthn owners without a browser.

use alloy_primitives::B256;
use async_trait::async_trait;
use mw_signature::{
    AuthenticatorAssertion,
    webauthn::{encode_base64url, webauthn_message_hash},
};
use p256::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
use sha2::{Digest, Sha256};

use crate::{
    error::{AccountError, Result},
    owner::{WebAuthnAuthenticator, WebAuthnCredential},
};

/// User present and user verified.
const AUTHENTICATOR_FLAGS: u8 = 0x05;

/// Signs assertions with an in-memory P-256 key.
#[derive(Debug, Clone)]
pub struct SoftwareAuthenticator {
    signing_key: SigningKey,
    credential_id: String,
}

impl SoftwareAuthenticator {
    /// A deterministic key whose scalar is `seed` repeated 32 times.
    pub fn from_seed(seed: u8) -> Self {
        let signing_key =
            SigningKey::from_slice(&[seed; 32]).expect("seed is a valid P-256 scalar");
        let compressed = signing_key.verifying_key().to_encoded_point(true);
        let credential_id = encode_base64url(Sha256::digest(compressed.as_bytes()));
        Self { signing_key, credential_id }
    }

    /// The credential for this key, scoped to `rp_id`.
    pub fn credential(&self, rp_id: &str) -> WebAuthnCredential {
        let public_key = self.signing_key.verifying_key().to_encoded_point(false);
        WebAuthnCredential::new(self.credential_id.clone(), public_key.as_bytes(), rp_id)
            .expect("uncompressed SEC1 point")
    }

    /// The P-256 key behind the credential.
    pub const fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// `rpIdHash || flags || signCount`.
    pub fn authenticator_data(rp_id: &str) -> Vec<u8> {
        let mut data = Sha256::digest(rp_id.as_bytes()).to_vec();
        data.push(AUTHENTICATOR_FLAGS);
        data.extend_from_slice(&[0; 4]);
        data
    }
}

#[async_trait]
impl WebAuthnAuthenticator for SoftwareAuthenticator {
    async fn get_assertion(
        &self,
        rp_id: &str,
        credential_id: &str,
        challenge: &str,
    ) -> Result<AuthenticatorAssertion> {
        if credential_id != self.credential_id {
            return Err(AccountError::Authenticator(format!(
                "unknown credential `{credential_id}`"
            )));
        }
        let authenticator_data = Self::authenticator_data(rp_id);
        let client_data_json = format!(
            r#"{{"type":"webauthn.get","challenge":"{challenge}","origin":"https://{rp_id}","crossOrigin":false}}"#
        );
        let digest: B256 = webauthn_message_hash(&authenticator_data, client_data_json.as_bytes());
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest.as_slice())
            .map_err(|e| AccountError::Authenticator(e.to_string()))?;

        Ok(AuthenticatorAssertion {
            id: self.credential_id.clone(),
            authenticator_data: encode_base64url(&authenticator_data),
            client_data_json: encode_base64url(client_data_json.as_bytes()),
            signature: encode_base64url(signature.to_der().as_bytes()),
            user_handle: None,
        })
    }
}
