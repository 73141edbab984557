//! Circle modular wallet and relying-party endpoints.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    error::Result,
    transport::{Transport, call},
};

/// SCA implementation the wallet service deploys.
pub const SCA_CORE_CIRCLE_6900_V1: &str = "circle_6900_v1";

/// A secp256k1 owner of a new wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EoaOwner {
    /// Owner address.
    pub address: Address,
    /// Voting weight.
    pub weight: u64,
}

/// Passkey owner; coordinates are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnOwnerConfig {
    /// Decimal x coordinate.
    pub public_key_x: String,
    /// Decimal y coordinate.
    pub public_key_y: String,
    /// Voting weight.
    pub weight: u64,
}

/// Owners and threshold of the multisig plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedMultisig {
    /// EOA owners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<EoaOwner>>,
    /// Passkey owners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webauthn_owners: Option<Vec<WebAuthnOwnerConfig>>,
    /// Weight needed to sign.
    pub threshold_weight: u64,
}

/// Ownership installed at deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialOwnershipConfiguration {
    /// Plugin address, defaulted by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_contract_address: Option<Address>,
    /// Owners and threshold.
    pub weighted_multisig: WeightedMultisig,
}

/// Smart contract account configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaConfiguration {
    /// Ownership installed at deployment.
    pub initial_ownership_configuration: InitialOwnershipConfiguration,
    /// Implementation, e.g. [`SCA_CORE_CIRCLE_6900_V1`].
    pub sca_core: String,
    /// Deployment code, returned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_code: Option<Bytes>,
}

/// Optional wallet labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMetadata {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `circle_getAddress` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAddressRequest {
    /// Configuration the address is derived from.
    pub sca_configuration: ScaConfiguration,
    /// Labels stored with the wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WalletMetadata>,
}

/// Wallet record returned by `circle_getAddress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModularWallet {
    /// Service-side wallet id.
    #[serde(default)]
    pub id: Option<String>,
    /// Counterfactual account address.
    pub address: Address,
    /// Service chain identifier, e.g. `MATIC-AMOY`.
    #[serde(default)]
    pub blockchain: Option<String>,
    /// Service-side wallet state.
    #[serde(default)]
    pub state: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Implementation.
    #[serde(default)]
    pub sca_core: Option<String>,
    /// Configuration the address was derived from.
    #[serde(default)]
    pub sca_configuration: Option<ScaConfiguration>,
    /// ISO timestamp.
    #[serde(default)]
    pub create_date: Option<String>,
    /// ISO timestamp.
    #[serde(default)]
    pub update_date: Option<String>,
}

impl ModularWallet {
    /// Cached deployment code, if the service returned one.
    pub fn init_code(&self) -> Option<&Bytes> {
        self.sca_configuration.as_ref().and_then(|config| config.init_code.as_ref())
    }
}

/// `circle_*` wallet endpoints.
#[derive(Debug, Clone)]
pub struct ModularWalletsClient {
    transport: Arc<dyn Transport>,
}

impl ModularWalletsClient {
    /// A client for the endpoint behind `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Resolves (and registers) the counterfactual wallet for an ownership configuration.
    pub async fn get_address(&self, request: &GetAddressRequest) -> Result<ModularWallet> {
        call(self.transport.as_ref(), "circle_getAddress", json!([request])).await
    }
}

/// `rp_getRegistrationVerification` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationVerification {
    /// Whether the passkey registration was accepted.
    pub verified: bool,
}

/// `rp_getLoginVerification` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginVerification {
    /// Public key of the authenticated credential.
    pub public_key: String,
}

/// WebAuthn relying-party ceremony endpoints. Options and credentials are
/// passed through as the JSON the browser APIs produce and consume.
#[derive(Debug, Clone)]
pub struct RpClient {
    transport: Arc<dyn Transport>,
}

impl RpClient {
    /// A client for the relying-party endpoint behind `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `PublicKeyCredentialCreationOptions` for a new passkey.
    pub async fn get_registration_options(&self, username: &str) -> Result<Value> {
        call(self.transport.as_ref(), "rp_getRegistrationOptions", json!([username])).await
    }

    /// Verifies a registration credential.
    pub async fn get_registration_verification(
        &self,
        registration_credential: &Value,
    ) -> Result<RegistrationVerification> {
        call(
            self.transport.as_ref(),
            "rp_getRegistrationVerification",
            json!([registration_credential]),
        )
        .await
    }

    /// `PublicKeyCredentialRequestOptions` for a login.
    pub async fn get_login_options(&self, user_id: &str) -> Result<Value> {
        call(self.transport.as_ref(), "rp_getLoginOptions", json!([user_id])).await
    }

    /// Verifies an authentication credential.
    pub async fn get_login_verification(
        &self,
        authentication_credential: &Value,
    ) -> Result<LoginVerification> {
        call(
            self.transport.as_ref(),
            "rp_getLoginVerification",
            json!([authentication_credential]),
        )
        .await
    }
}
