//! WebAuthn assertion processing.
//!
//! A platform authenticator signs `sha256(authenticatorData || sha256(clientDataJSON))`
//! with a P-256 key and returns the signature DER encoded. The on-chain verifier
//! needs the raw low-S `(r, s)` pair together with the authenticator data, the
//! client data JSON and the offsets of its `challenge` and `type` members.

use alloy_primitives::{B256, Bytes, U256};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use mw_abi::{AbiType, AbiValue, encode_abi_parameters};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{Result, SignatureError},
    secp256r1::P256Signature,
};

const CHALLENGE_MARKER: &str = "\"challenge\":\"";
const TYPE_MARKER: &str = "\"type\":\"";

/// Assertion response as returned by `navigator.credentials.get`, binary
/// members base64url encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertion {
    /// Credential id.
    pub id: String,
    /// `authenticatorData`.
    pub authenticator_data: String,
    /// `clientDataJSON`.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// DER encoded P-256 signature.
    pub signature: String,
    /// User handle, when the authenticator returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

/// Assertion metadata the verifier needs alongside the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnData {
    /// Raw authenticator data.
    pub authenticator_data: Bytes,
    /// Client data JSON exactly as signed.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// Byte offset of `"challenge":"`.
    pub challenge_index: usize,
    /// Byte offset of `"type":"`.
    pub type_index: usize,
    /// Whether the verifier requires the UV flag.
    pub user_verification_required: bool,
}

impl WebAuthnData {
    /// Builds the metadata for a client data JSON, locating its `challenge` and `type` members.
    pub fn new(authenticator_data: impl Into<Bytes>, client_data_json: String) -> Result<Self> {
        let challenge_index = client_data_json
            .find(CHALLENGE_MARKER)
            .ok_or_else(|| SignatureError::InvalidClientData("missing `challenge`".into()))?;
        let type_index = client_data_json
            .find(TYPE_MARKER)
            .ok_or_else(|| SignatureError::InvalidClientData("missing `type`".into()))?;
        Ok(Self {
            authenticator_data: authenticator_data.into(),
            client_data_json,
            challenge_index,
            type_index,
            user_verification_required: true,
        })
    }

    /// The base64url challenge embedded in the client data.
    pub fn challenge(&self) -> Option<&str> {
        let rest = self.client_data_json.get(self.challenge_index + CHALLENGE_MARKER.len()..)?;
        rest.split('"').next()
    }

    /// The digest the authenticator signed.
    pub fn signed_hash(&self) -> B256 {
        webauthn_message_hash(&self.authenticator_data, self.client_data_json.as_bytes())
    }
}

/// A normalized WebAuthn signature with its assertion metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnSignResult {
    /// Low-S signature.
    pub signature: P256Signature,
    /// Assertion metadata.
    pub webauthn: WebAuthnData,
}

impl WebAuthnSignResult {
    /// `abi.encode(((bytes,string,uint256,uint256,bool),uint256,uint256))` of the
    /// assertion metadata and signature, the dynamic part of a packed owner signature.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_webauthn_signature(self)
    }
}

/// Decodes base64url with or without padding; `field` names the input in errors.
pub fn decode_base64url(field: &'static str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|_| SignatureError::InvalidBase64 { field })
}

/// Unpadded base64url.
pub fn encode_base64url(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The WebAuthn challenge for a hash: its unpadded base64url encoding.
pub fn challenge_for(hash: B256) -> String {
    encode_base64url(hash)
}

/// `sha256(authenticatorData || sha256(clientDataJSON))`.
pub fn webauthn_message_hash(authenticator_data: &[u8], client_data_json: &[u8]) -> B256 {
    let client_data_hash = Sha256::digest(client_data_json);
    let mut hasher = Sha256::new();
    hasher.update(authenticator_data);
    hasher.update(client_data_hash);
    B256::from_slice(&hasher.finalize())
}

/// Decodes a platform assertion, converts its DER signature to low-S `(r, s)`
/// and records the client data offsets.
pub fn process_assertion(assertion: &AuthenticatorAssertion) -> Result<WebAuthnSignResult> {
    let authenticator_data = decode_base64url("authenticatorData", &assertion.authenticator_data)?;
    let client_data = decode_base64url("clientDataJSON", &assertion.client_data_json)?;
    let client_data_json = String::from_utf8(client_data)
        .map_err(|e| SignatureError::InvalidClientData(e.to_string()))?;
    let der = decode_base64url("signature", &assertion.signature)?;

    Ok(WebAuthnSignResult {
        signature: P256Signature::from_der(&der)?.normalize(),
        webauthn: WebAuthnData::new(authenticator_data, client_data_json)?,
    })
}

fn webauthn_signature_type() -> AbiType {
    AbiType::Tuple(vec![
        AbiType::Tuple(vec![
            AbiType::Bytes,
            AbiType::String,
            AbiType::Uint(256),
            AbiType::Uint(256),
            AbiType::Bool,
        ]),
        AbiType::Uint(256),
        AbiType::Uint(256),
    ])
}

/// ABI encodes `((authenticatorData, clientDataJSON, challengeIndex, typeIndex,
/// userVerificationRequired), r, s)` as a single parameter.
pub fn encode_webauthn_signature(result: &WebAuthnSignResult) -> Result<Vec<u8>> {
    let data = &result.webauthn;
    let value = AbiValue::Tuple(vec![
        AbiValue::Tuple(vec![
            AbiValue::Bytes(data.authenticator_data.clone()),
            AbiValue::String(data.client_data_json.clone()),
            AbiValue::Uint(U256::from(data.challenge_index)),
            AbiValue::Uint(U256::from(data.type_index)),
            AbiValue::Bool(data.user_verification_required),
        ]),
        AbiValue::Uint(result.signature.r),
        AbiValue::Uint(result.signature.s),
    ]);
    Ok(encode_abi_parameters(&[webauthn_signature_type()], &[value])?)
}
