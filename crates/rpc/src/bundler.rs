use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, U64, U256};
use mw_core::{UserOperationV07, error::format_error_message};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::{
    bundler_error::BundlerError,
    error::{Result, TransportError},
    transport::{Transport, call},
};

/// `eth_estimateUserOperationGas` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationGasEstimate {
    /// Bundler overhead.
    pub pre_verification_gas: U256,
    /// Validation gas, including deployment.
    pub verification_gas_limit: U256,
    /// Execution gas.
    pub call_gas_limit: U256,
    /// Set for sponsored operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Set for sponsored operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
}

/// `eth_getUserOperationByHash` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationByHash {
    /// The operation as the bundler received it.
    pub user_operation: UserOperationV07,
    /// EntryPoint it was sent to.
    pub entry_point: Address,
    /// Bundle transaction, once included.
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    /// Inclusion block hash.
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// Inclusion block number.
    #[serde(default)]
    pub block_number: Option<U64>,
}

/// Receipt of the bundle transaction that included a user operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Bundle transaction hash.
    pub transaction_hash: B256,
    /// Inclusion block hash.
    pub block_hash: B256,
    /// Inclusion block number.
    pub block_number: U64,
    /// Bundler EOA.
    #[serde(default)]
    pub from: Option<Address>,
    /// Usually the EntryPoint.
    #[serde(default)]
    pub to: Option<Address>,
    /// Gas used by the whole bundle.
    pub gas_used: U256,
    /// Price paid per gas.
    #[serde(default)]
    pub effective_gas_price: Option<U256>,
    /// `1` on success.
    #[serde(default)]
    pub status: Option<U64>,
}

/// `eth_getUserOperationReceipt` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    /// Hash of the included operation.
    pub user_op_hash: B256,
    /// EntryPoint that executed it.
    #[serde(default)]
    pub entry_point: Option<Address>,
    /// Sending account.
    pub sender: Address,
    /// Nonce the operation used.
    pub nonce: U256,
    /// Sponsoring paymaster, if any.
    #[serde(default)]
    pub paymaster: Option<Address>,
    /// Wei charged to the account or paymaster.
    pub actual_gas_cost: U256,
    /// Gas charged for the operation.
    pub actual_gas_used: U256,
    /// Whether the account call succeeded.
    pub success: bool,
    /// Revert reason of a failed call.
    #[serde(default)]
    pub reason: Option<String>,
    /// Logs emitted by the operation.
    #[serde(default)]
    pub logs: Vec<Value>,
    /// Receipt of the bundle transaction.
    pub receipt: TransactionReceipt,
}

/// How [`BundlerClient::wait_for_user_operation_receipt`] polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitForReceiptConfig {
    /// Pause between two polls.
    pub polling_interval: Duration,
    /// Maximum number of polls. Zero polls until `timeout`, or uses the
    /// default count when there is no timeout.
    pub retry_count: u32,
    /// Overall deadline, covering every poll.
    pub timeout: Option<Duration>,
}

impl WaitForReceiptConfig {
    const DEFAULT_RETRY_COUNT: u32 = 6;

    /// Poll limit, `None` when only the deadline bounds the wait.
    const fn max_polls(&self) -> Option<u32> {
        match (self.retry_count, self.timeout) {
            (0, Some(_)) => None,
            (0, None) => Some(Self::DEFAULT_RETRY_COUNT),
            (count, _) => Some(count),
        }
    }
}

impl Default for WaitForReceiptConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(4),
            retry_count: Self::DEFAULT_RETRY_COUNT,
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Why waiting for a receipt gave up.
#[derive(Debug, Error)]
pub enum WaitForReceiptError {
    /// Polls or the deadline ran out before inclusion.
    #[error("{}", receipt_timeout_message(.hash))]
    Timeout { hash: B256 },

    /// A receipt request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn receipt_timeout_message(hash: &B256) -> String {
    format_error_message(
        &format!("Timed out while waiting for User Operation with hash \"{hash}\" to be confirmed."),
        &[],
        None,
    )
}

/// ERC-4337 bundler methods for one EntryPoint.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    transport: Arc<dyn Transport>,
    entry_point: Address,
}

impl BundlerClient {
    /// A client for the bundler behind `transport`, targeting `entry_point`.
    pub fn new(transport: Arc<dyn Transport>, entry_point: Address) -> Self {
        Self { transport, entry_point }
    }

    /// EntryPoint every operation is sent to.
    pub const fn entry_point(&self) -> Address {
        self.entry_point
    }

    /// Transport to the bundler endpoint.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// `eth_chainId` of the bundler.
    pub async fn chain_id(&self) -> Result<u64> {
        let id: U64 = call(self.transport.as_ref(), "eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    /// EntryPoints the bundler accepts.
    pub async fn supported_entry_points(&self) -> Result<Vec<Address>> {
        call(self.transport.as_ref(), "eth_supportedEntryPoints", json!([])).await
    }

    /// Simulates `user_operation` and returns its gas limits.
    pub async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperationV07,
    ) -> Result<UserOperationGasEstimate, BundlerError> {
        Ok(call(
            self.transport.as_ref(),
            "eth_estimateUserOperationGas",
            json!([user_operation, self.entry_point]),
        )
        .await?)
    }

    /// Submits a signed operation and returns its hash.
    pub async fn send_user_operation(
        &self,
        user_operation: &UserOperationV07,
    ) -> Result<B256, BundlerError> {
        let hash: B256 = call(
            self.transport.as_ref(),
            "eth_sendUserOperation",
            json!([user_operation, self.entry_point]),
        )
        .await?;
        info!(message = "user operation submitted", hash = %hash);
        Ok(hash)
    }

    /// Looks up a submitted operation. `None` while unknown.
    pub async fn get_user_operation(&self, hash: B256) -> Result<Option<UserOperationByHash>> {
        call(self.transport.as_ref(), "eth_getUserOperationByHash", json!([hash])).await
    }

    /// Receipt of an included operation. `None` while pending.
    pub async fn get_user_operation_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<UserOperationReceipt>> {
        call(self.transport.as_ref(), "eth_getUserOperationReceipt", json!([hash])).await
    }

    /// Polls `eth_getUserOperationReceipt` until the operation is included.
    ///
    /// A `null` receipt is not an error; it means the operation is still pending.
    pub async fn wait_for_user_operation_receipt(
        &self,
        hash: B256,
        config: &WaitForReceiptConfig,
    ) -> Result<UserOperationReceipt, WaitForReceiptError> {
        match config.timeout {
            Some(limit) => timeout(limit, self.poll_receipt(hash, config))
                .await
                .unwrap_or(Err(WaitForReceiptError::Timeout { hash })),
            None => self.poll_receipt(hash, config).await,
        }
    }

    async fn poll_receipt(
        &self,
        hash: B256,
        config: &WaitForReceiptConfig,
    ) -> Result<UserOperationReceipt, WaitForReceiptError> {
        let max_polls = config.max_polls();
        let mut attempt = 0u32;
        loop {
            if let Some(receipt) = self.get_user_operation_receipt(hash).await? {
                info!(
                    message = "user operation included",
                    hash = %hash,
                    tx = %receipt.receipt.transaction_hash,
                    success = receipt.success
                );
                return Ok(receipt);
            }
            attempt = attempt.saturating_add(1);
            debug!(message = "user operation receipt not found yet", hash = %hash, attempt);
            if max_polls.is_some_and(|max| attempt >= max) {
                return Err(WaitForReceiptError::Timeout { hash });
            }
            sleep(config.polling_interval).await;
        }
    }
}
