use mw_accounts::AccountError;
use mw_core::{
    CoreError, UserOperationV07, encoding::to_hex, error::format_error_message, units::format_gwei,
};
use mw_rpc::{BundlerError, TransportError, WaitForReceiptError};
use thiserror::Error;

/// Result of the user operation pipeline.
pub type Result<T, E = UserOperationError> = std::result::Result<T, E>;

/// Failures of the user operation pipeline.
#[derive(Debug, Error)]
pub enum UserOperationError {
    /// Account resolution or signing failed.
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Execution(#[from] Box<UserOperationExecutionError>),

    /// A `pm_*` call failed.
    #[error(transparent)]
    Paymaster(TransportError),

    #[error(transparent)]
    Receipt(#[from] WaitForReceiptError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl UserOperationError {
    /// The bundler rejection behind this error, if any.
    pub fn bundler_error(&self) -> Option<&BundlerError> {
        match self {
            Self::Execution(err) => Some(&err.cause),
            _ => None,
        }
    }
}

/// A bundler rejected an operation, with the operation that was sent.
#[derive(Debug, Error)]
#[error("{}", execution_message(.cause, .meta_messages))]
pub struct UserOperationExecutionError {
    /// The classified bundler rejection.
    #[source]
    pub cause: BundlerError,
    /// The operation as it was sent to the bundler.
    pub user_operation: UserOperationV07,
    /// `Request Arguments:` followed by one line per populated field.
    pub meta_messages: Vec<String>,
}

impl UserOperationExecutionError {
    /// Wraps `cause`, rendering the operation's fields into the meta messages.
    pub fn new(cause: BundlerError, user_operation: UserOperationV07) -> Box<Self> {
        let mut meta_messages = vec!["Request Arguments:".to_string()];
        meta_messages.extend(pretty_print(&user_operation));
        Box::new(Self { cause, user_operation, meta_messages })
    }
}

fn execution_message(cause: &BundlerError, meta_messages: &[String]) -> String {
    format_error_message(cause.kind.short_message(), meta_messages, Some(&cause.details))
}

/// One aligned `name: value` line per populated field; fees are shown in gwei.
pub fn pretty_print(op: &UserOperationV07) -> Vec<String> {
    let gwei = |value: &alloy_primitives::U256| format!("{} gwei", format_gwei(*value));
    let fields: [(&str, Option<String>); 15] = [
        ("sender", op.sender.map(|v| v.to_string())),
        ("nonce", op.nonce.map(|v| v.to_string())),
        ("factory", op.factory.map(|v| v.to_string())),
        ("factoryData", op.factory_data.as_ref().map(to_hex)),
        ("callData", op.call_data.as_ref().map(to_hex)),
        ("callGasLimit", op.call_gas_limit.map(|v| v.to_string())),
        ("verificationGasLimit", op.verification_gas_limit.map(|v| v.to_string())),
        ("preVerificationGas", op.pre_verification_gas.map(|v| v.to_string())),
        ("maxFeePerGas", op.max_fee_per_gas.as_ref().map(gwei)),
        ("maxPriorityFeePerGas", op.max_priority_fee_per_gas.as_ref().map(gwei)),
        ("paymaster", op.paymaster.map(|v| v.to_string())),
        (
            "paymasterVerificationGasLimit",
            op.paymaster_verification_gas_limit.map(|v| v.to_string()),
        ),
        ("paymasterPostOpGasLimit", op.paymaster_post_op_gas_limit.map(|v| v.to_string())),
        ("paymasterData", op.paymaster_data.as_ref().map(to_hex)),
        ("signature", op.signature.as_ref().map(to_hex)),
    ];

    let present: Vec<_> =
        fields.into_iter().filter_map(|(name, value)| value.map(|v| (name, v))).collect();
    let width = present.iter().map(|(name, _)| name.len() + 1).max().unwrap_or(0);
    present
        .into_iter()
        .map(|(name, value)| format!("  {:<width$} {value}", format!("{name}:")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use mw_rpc::{RpcError, TransportError};

    fn rejected() -> BundlerError {
        BundlerError::from(TransportError::Rpc {
            error: RpcError {
                code: -32500,
                message: "AA21 didn't pay prefund".into(),
                data: None,
            },
            url: "http://localhost".into(),
            body: String::new(),
        })
    }

    #[test]
    fn pretty_print_aligns_present_fields() {
        let op = UserOperationV07 {
            sender: Some(Address::repeat_byte(0x11)),
            nonce: Some(U256::from(7)),
            max_fee_per_gas: Some(U256::from(1_500_000_000u64)),
            ..Default::default()
        };
        assert_eq!(
            pretty_print(&op),
            vec![
                "  sender:       0x1111111111111111111111111111111111111111".to_string(),
                "  nonce:        7".to_string(),
                "  maxFeePerGas: 1.5 gwei".to_string(),
            ]
        );
    }

    #[test]
    fn execution_error_dumps_the_operation() {
        let op = UserOperationV07 { sender: Some(Address::ZERO), ..Default::default() };
        let err = UserOperationExecutionError::new(rejected(), op);
        assert_eq!(
            err.meta_messages,
            vec![
                "Request Arguments:".to_string(),
                "  sender: 0x0000000000000000000000000000000000000000".to_string(),
            ]
        );

        let message = err.to_string();
        assert!(message.starts_with("Smart Account does not have sufficient funds"), "{message}");
        assert!(message.contains(
            "Request Arguments:\n  sender: 0x0000000000000000000000000000000000000000"
        ));
        assert!(message.contains("Details: AA21 didn't pay prefund"));
        assert!(message.ends_with(&mw_core::error::version_line()));
    }
}
