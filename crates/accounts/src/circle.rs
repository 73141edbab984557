//! Circle's upgradable modular smart contract account (ERC-6900) with the
//! weighted WebAuthn multisig plugin.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use mw_abi::AbiValue;
use mw_core::{
    Call, UserOperation,
    constants::{
        CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN, ENTRY_POINT_V07,
        MINIMUM_UNDEPLOYED_VERIFICATION_GAS_LIMIT, MINIMUM_VERIFICATION_GAS_LIMIT, OWNER_WEIGHT,
        THRESHOLD_WEIGHT,
    },
};
use mw_rpc::{
    BlockTag, ModularWalletsClient, PublicClient, Transport,
    modular::{
        EoaOwner, GetAddressRequest, InitialOwnershipConfiguration, SCA_CORE_CIRCLE_6900_V1,
        ScaConfiguration, WalletMetadata, WebAuthnOwnerConfig, WeightedMultisig,
    },
    public::CallRequest,
};
use mw_signature::{TypedData, hash_message, replay_safe_hash};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    account::SmartAccount,
    calls::encode_calls,
    contracts::{GET_REPLAY_SAFE_MESSAGE_HASH, function},
    error::{AccountError, Result},
    factory::{counterfactual_address, factory_args, split_init_code},
    nonce::{EntryPointNonceSource, NonceManager, NonceParams},
    owner::{Owner, OwnerIdentity},
};

/// How the account address is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressResolution {
    /// Ask the wallet service with `circle_getAddress`, which also registers the wallet.
    #[default]
    Rpc,
    /// Derive the CREATE2 address locally from the proxy init code hash.
    Create2 { init_code_hash: B256 },
}

/// Where the replay-safe envelope hash comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplaySafeHashing {
    /// `getReplaySafeMessageHash` on the plugin contract.
    #[default]
    Rpc,
    /// The same EIP-712 computation done in process.
    Local,
}

#[derive(Debug, Clone)]
struct ResolvedAddress {
    address: Address,
    init_code: Option<Bytes>,
}

/// A Circle MSCA (ERC-6900) account owned through the weighted multisig plugin.
#[derive(Debug)]
pub struct CircleSmartAccount {
    client: PublicClient,
    wallets: ModularWalletsClient,
    owner: Arc<dyn Owner>,
    chain_id: u64,
    entry_point: Address,
    name: Option<String>,
    address_resolution: AddressResolution,
    replay_safe_hashing: ReplaySafeHashing,
    nonce_manager: Arc<NonceManager>,
    resolved: OnceCell<ResolvedAddress>,
    deployed: AtomicBool,
}

impl CircleSmartAccount {
    /// An account owned by `owner` on `chain_id`, talking to the Circle modular
    /// wallets endpoint behind `transport`.
    pub fn new(transport: Arc<dyn Transport>, owner: Arc<dyn Owner>, chain_id: u64) -> Self {
        let client = PublicClient::new(Arc::clone(&transport));
        let source = EntryPointNonceSource::new(client.clone(), ENTRY_POINT_V07);
        Self {
            client,
            wallets: ModularWalletsClient::new(transport),
            owner,
            chain_id,
            entry_point: ENTRY_POINT_V07,
            name: None,
            address_resolution: AddressResolution::default(),
            replay_safe_hashing: ReplaySafeHashing::default(),
            nonce_manager: Arc::new(NonceManager::new(Arc::new(source))),
            resolved: OnceCell::new(),
            deployed: AtomicBool::new(false),
        }
    }

    /// Wallet name registered with `circle_getAddress`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Selects how the counterfactual address is found.
    pub const fn with_address_resolution(mut self, resolution: AddressResolution) -> Self {
        self.address_resolution = resolution;
        self
    }

    /// Selects where replay-safe hashes are computed.
    pub const fn with_replay_safe_hashing(mut self, hashing: ReplaySafeHashing) -> Self {
        self.replay_safe_hashing = hashing;
        self
    }

    /// Shares a nonce manager between accounts or with the caller.
    pub fn with_nonce_manager(mut self, nonce_manager: Arc<NonceManager>) -> Self {
        self.nonce_manager = nonce_manager;
        self
    }

    /// Skips address resolution for an account whose address is already known.
    pub fn with_address(mut self, address: Address) -> Self {
        self.resolved = OnceCell::from(ResolvedAddress { address, init_code: None });
        self
    }

    /// The signing owner.
    pub fn owner(&self) -> &Arc<dyn Owner> {
        &self.owner
    }

    /// Node client used for code, nonce and plugin reads.
    pub const fn client(&self) -> &PublicClient {
        &self.client
    }

    /// Tracks the nonces this account handed out.
    pub const fn nonce_manager(&self) -> &Arc<NonceManager> {
        &self.nonce_manager
    }

    async fn resolve(&self) -> Result<&ResolvedAddress> {
        self.resolved
            .get_or_try_init(|| async {
                let identity = self.owner.identity();
                let resolved = match self.address_resolution {
                    AddressResolution::Create2 { init_code_hash } => ResolvedAddress {
                        address: counterfactual_address(&identity, init_code_hash),
                        init_code: None,
                    },
                    AddressResolution::Rpc => {
                        let request = get_address_request(&identity, self.name.clone());
                        let wallet = self.wallets.get_address(&request).await?;
                        ResolvedAddress {
                            address: wallet.address,
                            init_code: wallet.init_code().cloned(),
                        }
                    }
                };
                info!(message = "smart account resolved", address = %resolved.address);
                Ok::<_, AccountError>(resolved)
            })
            .await
    }

    async fn nonce_params(&self, key: Option<U256>) -> Result<NonceParams> {
        Ok(NonceParams::new(self.address().await?, self.chain_id).with_key(key.unwrap_or_default()))
    }

    /// `getReplaySafeMessageHash(account, hash)`.
    pub async fn replay_safe_hash(&self, hash: B256) -> Result<B256> {
        let address = self.address().await?;
        match self.replay_safe_hashing {
            ReplaySafeHashing::Local => Ok(replay_safe_hash(address, self.chain_id, hash)?),
            ReplaySafeHashing::Rpc => {
                let get_hash = function(GET_REPLAY_SAFE_MESSAGE_HASH)?;
                let data =
                    get_hash.encode_input(&[AbiValue::from(address), AbiValue::from(hash)])?;
                let request = CallRequest {
                    from: None,
                    to: CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN,
                    data: data.into(),
                };
                let output = self.client.call(&request, BlockTag::Latest).await?;
                get_hash
                    .decode_output(&output)?
                    .first()
                    .and_then(AbiValue::as_bytes)
                    .map(B256::from_slice)
                    .ok_or_else(|| AccountError::InvalidReturnData {
                        function: "getReplaySafeMessageHash",
                        reason: "expected a bytes32".into(),
                    })
            }
        }
    }
}

/// Ownership configuration registered for a single owner.
fn get_address_request(owner: &OwnerIdentity, name: Option<String>) -> GetAddressRequest {
    let weighted_multisig = match owner {
        OwnerIdentity::Eoa(address) => WeightedMultisig {
            owners: Some(vec![EoaOwner { address: *address, weight: OWNER_WEIGHT }]),
            webauthn_owners: None,
            threshold_weight: THRESHOLD_WEIGHT,
        },
        OwnerIdentity::WebAuthn(public_key) => WeightedMultisig {
            owners: None,
            webauthn_owners: Some(vec![WebAuthnOwnerConfig {
                public_key_x: public_key.x.to_string(),
                public_key_y: public_key.y.to_string(),
                weight: OWNER_WEIGHT,
            }]),
            threshold_weight: THRESHOLD_WEIGHT,
        },
    };

    GetAddressRequest {
        sca_configuration: ScaConfiguration {
            initial_ownership_configuration: InitialOwnershipConfiguration {
                ownership_contract_address: None,
                weighted_multisig,
            },
            sca_core: SCA_CORE_CIRCLE_6900_V1.to_string(),
            init_code: None,
        },
        metadata: name.map(|name| WalletMetadata { name: Some(name) }),
    }
}

#[async_trait]
impl SmartAccount for CircleSmartAccount {
    async fn address(&self) -> Result<Address> {
        Ok(self.resolve().await?.address)
    }

    fn entry_point(&self) -> Address {
        self.entry_point
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn encode_calls(&self, calls: &[Call]) -> Result<Bytes> {
        Ok(encode_calls(calls)?)
    }

    async fn factory_args(&self) -> Result<Option<(Address, Bytes)>> {
        if self.is_deployed().await? {
            return Ok(None);
        }
        let cached =
            self.resolve().await?.init_code.as_ref().and_then(|code| split_init_code(code));
        match cached {
            Some(args) => Ok(Some(args)),
            None => Ok(Some(factory_args(&self.owner.identity())?)),
        }
    }

    async fn nonce(&self, key: Option<U256>) -> Result<U256> {
        let params = self.nonce_params(key).await?;
        self.nonce_manager.consume(&params).await
    }

    async fn peek_nonce(&self, key: Option<U256>) -> Result<U256> {
        let params = self.nonce_params(key).await?;
        self.nonce_manager.get(&params).await
    }

    async fn release_nonce(&self, key: Option<U256>, nonce: U256) {
        match self.nonce_params(key).await {
            Ok(params) => self.nonce_manager.release(&params, nonce).await,
            Err(err) => warn!(message = "cannot release nonce", nonce = %nonce, error = %err),
        }
    }

    fn stub_signature(&self) -> Bytes {
        self.owner.stub_signature()
    }

    async fn sign(&self, hash: B256) -> Result<Bytes> {
        let replay_safe = self.replay_safe_hash(hash).await?;
        let signature = self.owner.sign(replay_safe).await?;
        self.owner.pack_signature(&signature, false)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        self.sign(hash_message(message)).await
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes> {
        self.sign(typed_data.hash()?).await
    }

    async fn sign_user_operation(&self, user_operation: &UserOperation) -> Result<Bytes> {
        let hash = user_operation.hash(self.entry_point, self.chain_id);
        debug!(message = "signing user operation", hash = %hash);
        let signature = self.owner.sign_message(hash.as_slice()).await?;
        self.owner.pack_signature(&signature, true)
    }

    async fn is_deployed(&self) -> Result<bool> {
        if self.deployed.load(Ordering::Acquire) {
            return Ok(true);
        }
        let code = self.client.get_code(self.address().await?, BlockTag::Latest).await?;
        let deployed = !code.is_empty();
        if deployed {
            self.deployed.store(true, Ordering::Release);
        }
        Ok(deployed)
    }

    async fn user_operation_gas_floor(&self) -> Result<Option<U256>> {
        let floor = if self.is_deployed().await? {
            MINIMUM_VERIFICATION_GAS_LIMIT
        } else {
            MINIMUM_UNDEPLOYED_VERIFICATION_GAS_LIMIT
        };
        Ok(Some(U256::from(floor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn eoa_request_lists_owner_with_weights() {
        let owner = address!("0x1111111111111111111111111111111111111111");
        let request = get_address_request(&OwnerIdentity::Eoa(owner), Some("demo".into()));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "scaConfiguration": {
                    "initialOwnershipConfiguration": {
                        "weightedMultisig": {
                            "owners": [{ "address": owner, "weight": 1 }],
                            "thresholdWeight": 1
                        }
                    },
                    "scaCore": "circle_6900_v1"
                },
                "metadata": { "name": "demo" }
            })
        );
    }

    #[test]
    fn webauthn_request_uses_decimal_coordinates() {
        let public_key = mw_signature::P256PublicKey { x: U256::from(255), y: U256::from(16) };
        let request = get_address_request(&OwnerIdentity::WebAuthn(public_key), None);
        let multisig =
            &request.sca_configuration.initial_ownership_configuration.weighted_multisig;
        let owners = multisig.webauthn_owners.as_ref().unwrap();
        assert_eq!(owners[0].public_key_x, "255");
        assert_eq!(owners[0].public_key_y, "16");
        assert!(multisig.owners.is_none());
        assert!(request.metadata.is_none());
    }
}
