//! Classification of bundler rejections.
//!
//! EntryPoint reverts surface as `AAxx` reason prefixes inside the error
//! message; provider-level rejections use the ERC-7769 JSON-RPC codes.

use mw_core::error::format_error_message;
use thiserror::Error;

use crate::error::TransportError;

/// Why a bundler rejected an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundlerErrorKind {
    /// `AA10`.
    SenderAlreadyConstructed,
    /// `AA13`.
    InitCodeFailed,
    /// `AA14`.
    InitCodeMustReturnSender,
    /// `AA15`.
    InitCodeMustCreateSender,
    /// `AA20`.
    AccountNotDeployed,
    /// `AA21`.
    InsufficientPrefund,
    /// `AA22`.
    UserOperationExpired,
    /// `AA23`.
    SmartAccountFunctionReverted,
    /// `AA24`.
    UserOperationSignatureError,
    /// `AA25`.
    InvalidAccountNonce,
    /// `AA30`.
    PaymasterNotDeployed,
    /// `AA31`, or code `-32508`.
    PaymasterDepositTooLow,
    /// `AA32`.
    UserOperationPaymasterExpired,
    /// `AA33`.
    PaymasterFunctionReverted,
    /// `AA34`.
    UserOperationPaymasterSignatureError,
    /// `AA40`.
    VerificationGasLimitExceeded,
    /// `AA41`.
    VerificationGasLimitTooLow,
    /// `AA50`.
    PaymasterPostOpFunctionReverted,
    /// `AA90`.
    InvalidBeneficiary,
    /// `AA91`.
    FailedToSendToBeneficiary,
    /// `AA92`.
    InternalCallOnly,
    /// `AA93`.
    InvalidPaymasterAndData,
    /// `AA94`.
    GasValuesOverflow,
    /// `AA95`.
    HandleOpsOutOfGas,
    /// `AA96`.
    InvalidAggregator,
    /// Code `-32521` or an `execution reverted` message.
    ExecutionReverted,
    /// Code `-32602`.
    InvalidFields,
    /// Code `-32500`.
    UserOperationRejectedByEntryPoint,
    /// Code `-32501`.
    UserOperationRejectedByPaymaster,
    /// Code `-32502`.
    UserOperationRejectedByOpCode,
    /// Code `-32503`.
    UserOperationOutOfTimeRange,
    /// Code `-32504`.
    PaymasterRateLimit,
    /// Code `-32505`.
    PaymasterStakeTooLow,
    /// Code `-32506`.
    UnsupportedSignatureAggregator,
    /// Code `-32507`.
    SignatureCheckFailed,
    /// Not classified.
    Unknown,
}

const REASON_PREFIXES: [(&str, BundlerErrorKind); 25] = [
    ("aa10", BundlerErrorKind::SenderAlreadyConstructed),
    ("aa13", BundlerErrorKind::InitCodeFailed),
    ("aa14", BundlerErrorKind::InitCodeMustReturnSender),
    ("aa15", BundlerErrorKind::InitCodeMustCreateSender),
    ("aa20", BundlerErrorKind::AccountNotDeployed),
    ("aa21", BundlerErrorKind::InsufficientPrefund),
    ("aa22", BundlerErrorKind::UserOperationExpired),
    ("aa23", BundlerErrorKind::SmartAccountFunctionReverted),
    ("aa24", BundlerErrorKind::UserOperationSignatureError),
    ("aa25", BundlerErrorKind::InvalidAccountNonce),
    ("aa30", BundlerErrorKind::PaymasterNotDeployed),
    ("aa31", BundlerErrorKind::PaymasterDepositTooLow),
    ("aa32", BundlerErrorKind::UserOperationPaymasterExpired),
    ("aa33", BundlerErrorKind::PaymasterFunctionReverted),
    ("aa34", BundlerErrorKind::UserOperationPaymasterSignatureError),
    ("aa40", BundlerErrorKind::VerificationGasLimitExceeded),
    ("aa41", BundlerErrorKind::VerificationGasLimitTooLow),
    ("aa50", BundlerErrorKind::PaymasterPostOpFunctionReverted),
    ("aa90", BundlerErrorKind::InvalidBeneficiary),
    ("aa91", BundlerErrorKind::FailedToSendToBeneficiary),
    ("aa92", BundlerErrorKind::InternalCallOnly),
    ("aa93", BundlerErrorKind::InvalidPaymasterAndData),
    ("aa94", BundlerErrorKind::GasValuesOverflow),
    ("aa95", BundlerErrorKind::HandleOpsOutOfGas),
    ("aa96", BundlerErrorKind::InvalidAggregator),
];

impl BundlerErrorKind {
    /// Classifies by `AAxx` reason first, then by JSON-RPC code.
    pub fn classify(code: Option<i64>, details: &str) -> Self {
        let lowered = details.to_ascii_lowercase();
        if let Some((_, kind)) = REASON_PREFIXES.iter().find(|(prefix, _)| lowered.contains(prefix)) {
            return *kind;
        }
        match code {
            Some(-32500) => Self::UserOperationRejectedByEntryPoint,
            Some(-32501) => Self::UserOperationRejectedByPaymaster,
            Some(-32502) => Self::UserOperationRejectedByOpCode,
            Some(-32503) => Self::UserOperationOutOfTimeRange,
            Some(-32504) => Self::PaymasterRateLimit,
            Some(-32505) => Self::PaymasterStakeTooLow,
            Some(-32506) => Self::UnsupportedSignatureAggregator,
            Some(-32507) => Self::SignatureCheckFailed,
            Some(-32508) => Self::PaymasterDepositTooLow,
            Some(-32521) => Self::ExecutionReverted,
            Some(-32602) => Self::InvalidFields,
            _ if lowered.contains("execution reverted") => Self::ExecutionReverted,
            _ => Self::Unknown,
        }
    }

    /// Caller-facing summary.
    pub const fn short_message(self) -> &'static str {
        match self {
            Self::SenderAlreadyConstructed => "Smart Account has already been deployed.",
            Self::InitCodeFailed => {
                "Failed to simulate deployment for Smart Account. `initCode` reverted or ran out of gas."
            }
            Self::InitCodeMustReturnSender => {
                "Smart Account initialization implementation did not return the expected address."
            }
            Self::InitCodeMustCreateSender => {
                "Smart Account initialization implementation does not create an account."
            }
            Self::AccountNotDeployed => "Smart Account is not deployed.",
            Self::InsufficientPrefund => {
                "Smart Account does not have sufficient funds to execute the User Operation."
            }
            Self::UserOperationExpired => "User Operation expired.",
            Self::SmartAccountFunctionReverted => {
                "Execution reverted with reason: Smart Account reverted or ran out of gas during validation."
            }
            Self::UserOperationSignatureError => "Signature provided for the User Operation is invalid.",
            Self::InvalidAccountNonce => "Invalid Smart Account nonce used for User Operation.",
            Self::PaymasterNotDeployed => "Paymaster is not deployed.",
            Self::PaymasterDepositTooLow => {
                "Paymaster deposit is too low to cover the cost of the User Operation."
            }
            Self::UserOperationPaymasterExpired => "Paymaster for User Operation expired.",
            Self::PaymasterFunctionReverted => {
                "Paymaster `validatePaymasterUserOp` function reverted or ran out of gas."
            }
            Self::UserOperationPaymasterSignatureError => {
                "Signature provided for the User Operation paymaster is invalid."
            }
            Self::VerificationGasLimitExceeded => {
                "User Operation verification gas limit exceeded."
            }
            Self::VerificationGasLimitTooLow => "User Operation verification gas limit is too low.",
            Self::PaymasterPostOpFunctionReverted => "Paymaster `postOp` function reverted.",
            Self::InvalidBeneficiary => "Bundler attempted to call an invalid beneficiary.",
            Self::FailedToSendToBeneficiary => "Failed to send funds to beneficiary.",
            Self::InternalCallOnly => "Bundler attempted to call an internal-only EntryPoint function.",
            Self::InvalidPaymasterAndData => "Paymaster properties provided are invalid.",
            Self::GasValuesOverflow => "Gas value overflowed.",
            Self::HandleOpsOutOfGas => {
                "The bundler does not have enough gas to execute the User Operation."
            }
            Self::InvalidAggregator => "Signature aggregator is invalid.",
            Self::ExecutionReverted => "Execution reverted.",
            Self::InvalidFields => "Invalid fields set on User Operation.",
            Self::UserOperationRejectedByEntryPoint => "User Operation rejected by EntryPoint.",
            Self::UserOperationRejectedByPaymaster => "User Operation rejected by Paymaster.",
            Self::UserOperationRejectedByOpCode => {
                "User Operation rejected because of a banned opcode or storage access."
            }
            Self::UserOperationOutOfTimeRange => {
                "User Operation is not yet valid or has already expired."
            }
            Self::PaymasterRateLimit => "Paymaster or factory is being throttled or banned.",
            Self::PaymasterStakeTooLow => "Paymaster, factory or aggregator stake is too low.",
            Self::UnsupportedSignatureAggregator => "Signature aggregator is not supported.",
            Self::SignatureCheckFailed => "User Operation signature check failed.",
            Self::Unknown => "An error occurred while executing user operation.",
        }
    }
}

/// A bundler call failure with its classification.
#[derive(Debug, Error)]
#[error("{}", bundler_message(.kind, .details))]
pub struct BundlerError {
    /// Classified reason.
    pub kind: BundlerErrorKind,
    /// Server message and revert data.
    pub details: String,
    /// Underlying transport failure.
    #[source]
    pub cause: TransportError,
}

impl From<TransportError> for BundlerError {
    fn from(cause: TransportError) -> Self {
        let (code, details) = match cause.rpc_error() {
            Some(error) => (Some(error.code), error.details()),
            None => (None, cause.to_string()),
        };
        Self { kind: BundlerErrorKind::classify(code, &details), details, cause }
    }
}

fn bundler_message(kind: &BundlerErrorKind, details: &str) -> String {
    format_error_message(kind.short_message(), &[], Some(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;

    #[test]
    fn reason_prefix_wins_over_code() {
        assert_eq!(
            BundlerErrorKind::classify(Some(-32500), "AA21 didn't pay prefund"),
            BundlerErrorKind::InsufficientPrefund
        );
        assert_eq!(
            BundlerErrorKind::classify(None, "validation reverted: aa13 initCode failed or OOG"),
            BundlerErrorKind::InitCodeFailed
        );
    }

    #[test]
    fn falls_back_to_code_and_message() {
        assert_eq!(
            BundlerErrorKind::classify(Some(-32507), "bad signature"),
            BundlerErrorKind::SignatureCheckFailed
        );
        assert_eq!(
            BundlerErrorKind::classify(Some(-32000), "execution reverted: 0x"),
            BundlerErrorKind::ExecutionReverted
        );
        assert_eq!(BundlerErrorKind::classify(Some(-32000), "nope"), BundlerErrorKind::Unknown);
    }

    #[test]
    fn wraps_transport_errors() {
        let err = BundlerError::from(TransportError::Rpc {
            error: RpcError {
                code: -32500,
                message: "AA25 invalid account nonce".into(),
                data: None,
            },
            url: String::new(),
            body: String::new(),
        });
        assert_eq!(err.kind, BundlerErrorKind::InvalidAccountNonce);
        assert!(err.to_string().starts_with("Invalid Smart Account nonce used for User Operation."));
        assert!(err.to_string().contains("Details: AA25 invalid account nonce"));
    }
}
