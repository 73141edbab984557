use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U64, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    error::{Result, TransportError},
    transport::{Transport, call},
};

/// Block selector for state queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockTag {
    /// Most recent block.
    #[default]
    Latest,
    /// Pending state.
    Pending,
    /// A specific height.
    Number(u64),
}

impl BlockTag {
    fn to_param(self) -> Value {
        match self {
            Self::Latest => Value::String("latest".into()),
            Self::Pending => Value::String("pending".into()),
            Self::Number(number) => Value::String(format!("{number:#x}")),
        }
    }
}

/// The block header fields fee estimation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// `None` for the pending block.
    #[serde(default)]
    pub number: Option<U64>,
    /// `None` for the pending block.
    #[serde(default)]
    pub hash: Option<B256>,
    /// Unix seconds.
    pub timestamp: U64,
    /// Block gas limit.
    pub gas_limit: U256,
    /// Gas used by the block.
    pub gas_used: U256,
    /// EIP-1559 base fee, absent before London.
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
}

/// `eth_call` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Caller, if it matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Contract to call.
    pub to: Address,
    /// Calldata.
    #[serde(default)]
    pub data: Bytes,
}

/// Tuning for [`PublicClient::estimate_fees_per_gas`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeeEstimationConfig {
    /// Applied to the latest base fee, e.g. `1.2`.
    pub base_fee_multiplier: f64,
    /// Lower bound for `maxFeePerGas`.
    pub min_max_fee_per_gas: U256,
}

impl Default for FeeEstimationConfig {
    fn default() -> Self {
        Self { base_fee_multiplier: 1.2, min_max_fee_per_gas: U256::ZERO }
    }
}

/// EIP-1559 fees for a new operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeesPerGas {
    /// Latest base fee, before the multiplier.
    pub base_fee_per_gas: U256,
    /// Fee cap.
    pub max_fee_per_gas: U256,
    /// Tip.
    pub max_priority_fee_per_gas: U256,
}

/// Multiplies `value` by a decimal `multiplier` without floating point on the result:
/// `value * ceil(multiplier * 10^d) / 10^d` where `d` is the multiplier's fractional digit count.
pub fn apply_multiplier(value: U256, multiplier: f64) -> U256 {
    let repr = multiplier.to_string();
    let decimals = repr.split_once('.').map_or(0, |(_, fraction)| fraction.len()) as u32;
    let denominator = 10u64.pow(decimals.min(18));
    let numerator = (multiplier * denominator as f64).ceil() as u64;
    value * U256::from(numerator) / U256::from(denominator)
}

/// Read access to the chain the account lives on.
#[derive(Debug, Clone)]
pub struct PublicClient {
    transport: Arc<dyn Transport>,
}

impl PublicClient {
    /// A client for the node behind `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Transport to the node.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64> {
        let id: U64 = call(self.transport.as_ref(), "eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64> {
        let number: U64 = call(self.transport.as_ref(), "eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }

    /// Header of `block`, `None` if it does not exist.
    pub async fn get_block(&self, block: BlockTag) -> Result<Option<Block>> {
        call(self.transport.as_ref(), "eth_getBlockByNumber", json!([block.to_param(), false]))
            .await
    }

    /// Legacy `eth_gasPrice`.
    pub async fn gas_price(&self) -> Result<U256> {
        call(self.transport.as_ref(), "eth_gasPrice", json!([])).await
    }

    /// `eth_maxPriorityFeePerGas`; not every node serves it.
    pub async fn max_priority_fee_per_gas(&self) -> Result<U256> {
        call(self.transport.as_ref(), "eth_maxPriorityFeePerGas", json!([])).await
    }

    /// Wei balance of `address`.
    pub async fn get_balance(&self, address: Address, block: BlockTag) -> Result<U256> {
        call(self.transport.as_ref(), "eth_getBalance", json!([address, block.to_param()])).await
    }

    /// Deployed code at `address`, empty for EOAs and undeployed accounts.
    pub async fn get_code(&self, address: Address, block: BlockTag) -> Result<Bytes> {
        call(self.transport.as_ref(), "eth_getCode", json!([address, block.to_param()])).await
    }

    /// Read-only contract call.
    pub async fn call(&self, request: &CallRequest, block: BlockTag) -> Result<Bytes> {
        call(self.transport.as_ref(), "eth_call", json!([request, block.to_param()])).await
    }

    async fn latest_base_fee(&self) -> Result<(U256, Block)> {
        let block = self.get_block(BlockTag::Latest).await?.ok_or_else(|| {
            TransportError::InvalidResponse {
                method: "eth_getBlockByNumber".into(),
                reason: "latest block not found".into(),
            }
        })?;
        let base_fee = block.base_fee_per_gas.ok_or_else(|| TransportError::InvalidResponse {
            method: "eth_getBlockByNumber".into(),
            reason: "chain does not support EIP-1559 fees".into(),
        })?;
        Ok((base_fee, block))
    }

    /// `eth_maxPriorityFeePerGas`, or `gasPrice - baseFee` floored at zero when the
    /// node does not support it.
    pub async fn estimate_max_priority_fee_per_gas(&self, block: Option<&Block>) -> Result<U256> {
        match self.max_priority_fee_per_gas().await {
            Ok(fee) => Ok(fee),
            Err(err) => {
                debug!(message = "eth_maxPriorityFeePerGas unavailable, using gas price", error = %err);
                let base_fee = match block.and_then(|b| b.base_fee_per_gas) {
                    Some(base_fee) => base_fee,
                    None => self.latest_base_fee().await?.0,
                };
                let gas_price = self.gas_price().await?;
                Ok(gas_price.saturating_sub(base_fee))
            }
        }
    }

    /// EIP-1559 fee estimate: `maxFeePerGas = max(baseFee * multiplier + priority,
    /// minMaxFeePerGas, 2 * baseFee)`.
    pub async fn estimate_fees_per_gas(&self, config: &FeeEstimationConfig) -> Result<FeesPerGas> {
        let (base_fee, block) = self.latest_base_fee().await?;
        let max_priority_fee_per_gas = self.estimate_max_priority_fee_per_gas(Some(&block)).await?;
        let estimated = apply_multiplier(base_fee, config.base_fee_multiplier)
            .saturating_add(max_priority_fee_per_gas);
        let floor = config.min_max_fee_per_gas.max(base_fee.saturating_mul(U256::from(2)));

        Ok(FeesPerGas {
            base_fee_per_gas: base_fee,
            max_fee_per_gas: estimated.max(floor),
            max_priority_fee_per_gas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_uses_scaled_integers() {
        assert_eq!(apply_multiplier(U256::from(100), 1.2), U256::from(120));
        assert_eq!(apply_multiplier(U256::from(7), 1.2), U256::from(8));
        assert_eq!(apply_multiplier(U256::from(1_000), 1.125), U256::from(1_125));
        assert_eq!(apply_multiplier(U256::from(5), 2.0), U256::from(10));
    }

    #[test]
    fn block_tags_serialize_as_quantities() {
        assert_eq!(BlockTag::Number(255).to_param(), json!("0xff"));
        assert_eq!(BlockTag::default().to_param(), json!("latest"));
    }
}
