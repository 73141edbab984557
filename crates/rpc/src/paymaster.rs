use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use mw_core::UserOperationV07;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    error::Result,
    transport::{Transport, call},
};

/// Free-form sponsorship context forwarded to the paymaster service.
pub type PaymasterContext = Map<String, Value>;

/// Display information about the sponsor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    /// Sponsor name.
    pub name: String,
    /// Icon URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// `pm_getPaymasterStubData` result. Fields may be final when `isFinal` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterStubData {
    /// Paymaster contract.
    #[serde(default)]
    pub paymaster: Option<Address>,
    /// Placeholder data sized like the final data.
    #[serde(default)]
    pub paymaster_data: Option<Bytes>,
    /// Paymaster validation gas.
    #[serde(default)]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Paymaster `postOp` gas.
    #[serde(default)]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Who pays.
    #[serde(default)]
    pub sponsor: Option<Sponsor>,
    /// No `pm_getPaymasterData` call is needed.
    #[serde(default)]
    pub is_final: bool,
}

/// `pm_getPaymasterData` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterData {
    /// Paymaster contract.
    #[serde(default)]
    pub paymaster: Option<Address>,
    /// Signed sponsorship data.
    #[serde(default)]
    pub paymaster_data: Option<Bytes>,
    /// Overrides the stub value when set.
    #[serde(default)]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Overrides the stub value when set.
    #[serde(default)]
    pub paymaster_post_op_gas_limit: Option<U256>,
}

/// ERC-7677 paymaster web service.
#[derive(Debug, Clone)]
pub struct PaymasterClient {
    transport: Arc<dyn Transport>,
}

impl PaymasterClient {
    /// A client for the paymaster service behind `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Placeholder paymaster fields for gas estimation.
    pub async fn get_paymaster_stub_data(
        &self,
        user_operation: &UserOperationV07,
        entry_point: Address,
        chain_id: u64,
        context: Option<&PaymasterContext>,
    ) -> Result<PaymasterStubData> {
        call(
            self.transport.as_ref(),
            "pm_getPaymasterStubData",
            paymaster_params(user_operation, entry_point, chain_id, context),
        )
        .await
    }

    /// Final paymaster fields for an estimated operation.
    pub async fn get_paymaster_data(
        &self,
        user_operation: &UserOperationV07,
        entry_point: Address,
        chain_id: u64,
        context: Option<&PaymasterContext>,
    ) -> Result<PaymasterData> {
        call(
            self.transport.as_ref(),
            "pm_getPaymasterData",
            paymaster_params(user_operation, entry_point, chain_id, context),
        )
        .await
    }
}

fn paymaster_params(
    user_operation: &UserOperationV07,
    entry_point: Address,
    chain_id: u64,
    context: Option<&PaymasterContext>,
) -> Value {
    let chain_id = format!("{chain_id:#x}");
    match context {
        Some(context) => json!([user_operation, entry_point, chain_id, context]),
        None => json!([user_operation, entry_point, chain_id]),
    }
}

/// Who sponsors the operation's gas.
#[derive(Debug, Clone)]
pub enum Paymaster {
    /// The bundler endpoint also serves the `pm_*` methods.
    BundlerManaged { context: Option<PaymasterContext> },
    /// A separate paymaster service.
    Dedicated { client: PaymasterClient, context: Option<PaymasterContext> },
}

impl Paymaster {
    /// Sponsorship through the bundler endpoint without extra context.
    pub const fn sponsored() -> Self {
        Self::BundlerManaged { context: None }
    }

    /// Context forwarded with every `pm_*` call.
    pub const fn context(&self) -> Option<&PaymasterContext> {
        match self {
            Self::BundlerManaged { context } | Self::Dedicated { context, .. } => context.as_ref(),
        }
    }

    /// The client to call, given the transport of the bundler in use.
    pub fn client(&self, bundler_transport: &Arc<dyn Transport>) -> PaymasterClient {
        match self {
            Self::BundlerManaged { .. } => PaymasterClient::new(Arc::clone(bundler_transport)),
            Self::Dedicated { client, .. } => client.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_appended_only_when_present() {
        let op = UserOperationV07::default();
        let params = paymaster_params(&op, Address::ZERO, 137, None);
        assert_eq!(params.as_array().map(Vec::len), Some(3));
        assert_eq!(params[2], json!("0x89"));

        let mut context = PaymasterContext::new();
        context.insert("policyId".into(), json!("abc"));
        let params = paymaster_params(&op, Address::ZERO, 137, Some(&context));
        assert_eq!(params[3], json!({ "policyId": "abc" }));
    }
}
