use std::fmt::Debug;

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use mw_core::{Call, UserOperation};
use mw_signature::TypedData;

use crate::error::Result;

/// An ERC-4337 smart account as the user operation pipeline sees it.
#[async_trait]
pub trait SmartAccount: Send + Sync + Debug {
    /// Counterfactual or deployed address.
    async fn address(&self) -> Result<Address>;

    fn entry_point(&self) -> Address;

    fn chain_id(&self) -> u64;

    /// Account call data executing `calls`.
    fn encode_calls(&self, calls: &[Call]) -> Result<Bytes>;

    /// `(factory, factoryData)` while the account is not deployed.
    async fn factory_args(&self) -> Result<Option<(Address, Bytes)>>;

    /// Reserves the next nonce for `key` (zero when `None`).
    async fn nonce(&self, key: Option<U256>) -> Result<U256>;

    /// The nonce [`Self::nonce`] would return, without reserving it.
    async fn peek_nonce(&self, key: Option<U256>) -> Result<U256>;

    /// Returns a nonce from [`Self::nonce`] whose operation will not be submitted.
    async fn release_nonce(&self, _key: Option<U256>, _nonce: U256) {}

    /// Placeholder signature of the right shape for gas estimation.
    fn stub_signature(&self) -> Bytes;

    /// Signs an arbitrary hash through the replay-safe envelope.
    async fn sign(&self, hash: B256) -> Result<Bytes>;

    /// EIP-191 hashes `message`, then signs like [`Self::sign`].
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    /// EIP-712 hashes `typed_data`, then signs like [`Self::sign`].
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes>;

    /// Signs the v0.7 hash of `user_operation` for this account's EntryPoint and chain.
    async fn sign_user_operation(&self, user_operation: &UserOperation) -> Result<Bytes>;

    async fn is_deployed(&self) -> Result<bool>;

    /// Lower bound for `verificationGasLimit`, applied after estimation.
    async fn user_operation_gas_floor(&self) -> Result<Option<U256>> {
        Ok(None)
    }
}
