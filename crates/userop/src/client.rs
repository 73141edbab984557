use std::{fmt::Debug, sync::Arc};

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use mw_accounts::SmartAccount;
use mw_core::{Call, UserOperation, UserOperationV07};
use mw_rpc::{
    BundlerClient, FeeEstimationConfig, FeesPerGas, Paymaster, PublicClient, Transport,
    UserOperationReceipt, WaitForReceiptConfig,
};
use tracing::{debug, info};

use crate::error::{Result, UserOperationExecutionError};

/// Replaces the built-in EIP-1559 fee estimation.
#[async_trait]
pub trait FeeEstimator: Send + Sync + Debug {
    /// Returns the fees to set on an operation that does not pin its own.
    async fn estimate_fees_per_gas(&self, client: &PublicClient) -> mw_rpc::Result<FeesPerGas>;
}

/// Client-wide settings applied to every prepared operation.
#[derive(Debug, Clone, Default)]
pub struct PrepareUserOperationConfig {
    /// Sponsorship, if any.
    pub paymaster: Option<Paymaster>,
    /// Tuning for the built-in fee estimation.
    pub fee_estimation: FeeEstimationConfig,
    /// Takes precedence over `fee_estimation` when set.
    pub fee_estimator: Option<Arc<dyn FeeEstimator>>,
}

/// What to execute, plus any fields the caller wants to pin.
#[derive(Debug, Clone, Default)]
pub struct UserOperationRequest {
    /// Calls batched into the operation's call data.
    pub calls: Vec<Call>,
    /// Fields left `None` are resolved by the pipeline.
    pub overrides: UserOperationV07,
    /// Nonce key for parallel nonce sequences. Defaults to the account's key.
    pub nonce_key: Option<U256>,
}

impl UserOperationRequest {
    /// A request for `calls` with nothing pinned.
    pub fn new(calls: Vec<Call>) -> Self {
        Self { calls, ..Default::default() }
    }

    /// Pins the fields set in `overrides`.
    pub fn with_overrides(mut self, overrides: UserOperationV07) -> Self {
        self.overrides = overrides;
        self
    }

    /// Draws the nonce from the sequence for `key`.
    pub const fn with_nonce_key(mut self, key: U256) -> Self {
        self.nonce_key = Some(key);
        self
    }
}

/// Prepares, signs and submits user operations for one smart account.
#[derive(Debug, Clone)]
pub struct SmartAccountClient {
    pub(crate) account: Arc<dyn SmartAccount>,
    pub(crate) bundler: BundlerClient,
    pub(crate) public: PublicClient,
    pub(crate) config: PrepareUserOperationConfig,
}

impl SmartAccountClient {
    /// A client without sponsorship that uses the built-in fee estimation.
    pub fn new(account: Arc<dyn SmartAccount>, bundler: BundlerClient, public: PublicClient) -> Self {
        Self { account, bundler, public, config: PrepareUserOperationConfig::default() }
    }

    /// Uses one endpoint for both bundler and node methods, as the Circle
    /// modular wallets endpoint serves both.
    pub fn from_transport(account: Arc<dyn SmartAccount>, transport: Arc<dyn Transport>) -> Self {
        let bundler = BundlerClient::new(Arc::clone(&transport), account.entry_point());
        Self::new(account, bundler, PublicClient::new(transport))
    }

    /// Sponsors every operation through `paymaster`.
    pub fn with_paymaster(mut self, paymaster: Paymaster) -> Self {
        self.config.paymaster = Some(paymaster);
        self
    }

    /// Replaces the whole preparation config.
    pub fn with_config(mut self, config: PrepareUserOperationConfig) -> Self {
        self.config = config;
        self
    }

    /// The account operations are built for.
    pub fn account(&self) -> &Arc<dyn SmartAccount> {
        &self.account
    }

    /// Bundler RPC client.
    pub const fn bundler(&self) -> &BundlerClient {
        &self.bundler
    }

    /// Node RPC client.
    pub const fn public(&self) -> &PublicClient {
        &self.public
    }

    /// Replaces the placeholder signature with the account's signature over the
    /// operation hash.
    pub async fn sign_user_operation(&self, user_operation: UserOperation) -> Result<UserOperation> {
        let signature = self.account.sign_user_operation(&user_operation).await?;
        Ok(user_operation.with_signature(signature))
    }

    /// Prepares, signs and submits an operation, returning its hash.
    ///
    /// If signing or submission fails, a nonce the pipeline reserved is
    /// returned to the account.
    pub async fn send_user_operation(&self, request: UserOperationRequest) -> Result<B256> {
        let nonce_key = request.nonce_key;
        let pinned_nonce = request.overrides.nonce.is_some();
        let prepared = self.prepare_user_operation(request).await?;
        let nonce = prepared.nonce;

        let sent = match self.sign_user_operation(prepared).await {
            Ok(signed) => self.send_signed_user_operation(signed).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &sent
            && !pinned_nonce
        {
            debug!(
                message = "user operation not submitted, releasing nonce",
                nonce = %nonce,
                error = %err
            );
            self.account.release_nonce(nonce_key, nonce).await;
        }
        sent
    }

    /// Submits an operation that already carries its final signature.
    pub async fn send_signed_user_operation(&self, user_operation: UserOperation) -> Result<B256> {
        let user_operation = UserOperationV07::from(user_operation);
        match self.bundler.send_user_operation(&user_operation).await {
            Ok(hash) => Ok(hash),
            Err(cause) => Err(UserOperationExecutionError::new(cause, user_operation).into()),
        }
    }

    /// Polls the bundler until the operation is included. Reverted operations
    /// are returned, not treated as errors.
    pub async fn wait_for_user_operation_receipt(
        &self,
        hash: B256,
        config: &WaitForReceiptConfig,
    ) -> Result<UserOperationReceipt> {
        let receipt = self.bundler.wait_for_user_operation_receipt(hash, config).await?;
        if !receipt.success {
            info!(
                message = "user operation reverted",
                hash = %hash,
                reason = receipt.reason.as_deref().unwrap_or_default()
            );
        }
        Ok(receipt)
    }
}
