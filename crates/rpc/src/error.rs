use mw_core::error::format_error_message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result of a single transport call.
pub type Result<T, E = TransportError> = std::result::Result<T, E>;

/// Standard JSON-RPC and EIP-1193 / EIP-5792 provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    /// Code `-32700`.
    Parse,
    /// Code `-32600`.
    InvalidRequest,
    /// Code `-32601`.
    MethodNotFound,
    /// Code `-32602`.
    InvalidParams,
    /// Code `-32603`.
    Internal,
    /// Code `-32000`.
    InvalidInput,
    /// Code `-32001`.
    ResourceNotFound,
    /// Code `-32002`.
    ResourceUnavailable,
    /// Code `-32003`.
    TransactionRejected,
    /// Code `-32004`.
    MethodNotSupported,
    /// Code `-32005`.
    LimitExceeded,
    /// Code `-32006`.
    JsonRpcVersionUnsupported,
    /// Code `4001`.
    UserRejected,
    /// Code `4100`.
    Unauthorized,
    /// Code `4200`.
    UnsupportedProviderMethod,
    /// Code `4900`.
    ProviderDisconnected,
    /// Code `4901`.
    ChainDisconnected,
    /// Code `4902`.
    SwitchChain,
    /// Code `5700`.
    UnsupportedNonOptionalCapability,
    /// Code `5710`.
    UnsupportedChainId,
    /// Code `5720`.
    DuplicateId,
    /// Code `5730`.
    UnknownBundleId,
    /// Code `5740`.
    BundleTooLarge,
    /// Code `5750`.
    AtomicReadyWalletRejectedUpgrade,
    /// Code `5760`.
    AtomicityNotSupported,
    /// Any other code.
    Unknown,
}

impl RpcErrorKind {
    /// Classifies a JSON-RPC error code.
    pub const fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::Parse,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::Internal,
            -32000 => Self::InvalidInput,
            -32001 => Self::ResourceNotFound,
            -32002 => Self::ResourceUnavailable,
            -32003 => Self::TransactionRejected,
            -32004 => Self::MethodNotSupported,
            -32005 => Self::LimitExceeded,
            -32006 => Self::JsonRpcVersionUnsupported,
            4001 => Self::UserRejected,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedProviderMethod,
            4900 => Self::ProviderDisconnected,
            4901 => Self::ChainDisconnected,
            4902 => Self::SwitchChain,
            5700 => Self::UnsupportedNonOptionalCapability,
            5710 => Self::UnsupportedChainId,
            5720 => Self::DuplicateId,
            5730 => Self::UnknownBundleId,
            5740 => Self::BundleTooLarge,
            5750 => Self::AtomicReadyWalletRejectedUpgrade,
            5760 => Self::AtomicityNotSupported,
            _ => Self::Unknown,
        }
    }

    /// Caller-facing summary.
    pub const fn short_message(self) -> &'static str {
        match self {
            Self::Parse => "Invalid JSON was received by the server.",
            Self::InvalidRequest => "JSON is not a valid request object.",
            Self::MethodNotFound => "The method does not exist / is not available.",
            Self::InvalidParams => "Invalid parameters were provided to the RPC method.",
            Self::Internal => "An internal error was received.",
            Self::InvalidInput => "Missing or invalid parameters.",
            Self::ResourceNotFound => "Requested resource not found.",
            Self::ResourceUnavailable => "Requested resource not available.",
            Self::TransactionRejected => "Transaction creation failed.",
            Self::MethodNotSupported => "Method is not implemented.",
            Self::LimitExceeded => "Request exceeds defined limit.",
            Self::JsonRpcVersionUnsupported => "Version of JSON-RPC protocol is not supported.",
            Self::UserRejected => "User rejected the request.",
            Self::Unauthorized => {
                "The requested method and/or account has not been authorized by the user."
            }
            Self::UnsupportedProviderMethod => "The Provider does not support the requested method.",
            Self::ProviderDisconnected => "The Provider is disconnected from all chains.",
            Self::ChainDisconnected => "The Provider is not connected to the requested chain.",
            Self::SwitchChain => "An error occurred when attempting to switch chain.",
            Self::UnsupportedNonOptionalCapability => {
                "This Wallet does not support a capability that was not marked as optional."
            }
            Self::UnsupportedChainId => "This Wallet does not support the requested chain ID.",
            Self::DuplicateId => "There is already a bundle submitted with this ID.",
            Self::UnknownBundleId => "This bundle id is unknown / has not been submitted.",
            Self::BundleTooLarge => "The call bundle is too large for the Wallet to process.",
            Self::AtomicReadyWalletRejectedUpgrade => {
                "The Wallet can support atomicity after an upgrade, but the user rejected the upgrade."
            }
            Self::AtomicityNotSupported => {
                "The wallet does not support atomic execution but the request requires it."
            }
            Self::Unknown => "An unknown RPC error occurred.",
        }
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Server message.
    pub message: String,
    /// Extra data, often a revert reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Classified code.
    pub const fn kind(&self) -> RpcErrorKind {
        RpcErrorKind::from_code(self.code)
    }

    /// The message plus any string `data`, which bundlers use for revert reasons.
    pub fn details(&self) -> String {
        match &self.data {
            Some(Value::String(data)) if !data.is_empty() => format!("{} {data}", self.message),
            _ => self.message.clone(),
        }
    }
}

/// Failure of a single JSON-RPC call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Non-2xx response or connection failure.
    #[error("{}", http_message(.url, .status, .body, .details))]
    Http { url: String, status: Option<u16>, body: String, details: String },

    /// No response within the per-attempt timeout.
    #[error("{}", timeout_message(.url, .body))]
    Timeout { url: String, body: String },

    /// The server answered with a JSON-RPC error object.
    #[error("{}", rpc_message(.error, .url, .body))]
    Rpc { error: RpcError, url: String, body: String },

    /// The response did not match the expected result shape.
    #[error("{}", invalid_response_message(.method, .reason))]
    InvalidResponse { method: String, reason: String },

    /// The endpoint or a header could not be built.
    #[error("{}", invalid_url_message(.url, .reason))]
    InvalidUrl { url: String, reason: String },
}

impl TransportError {
    /// HTTP 429, 5xx and timeouts are transient; everything else is final.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status: Some(status), .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The JSON-RPC error object, if the server returned one.
    pub const fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::Rpc { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Classified RPC error kind, if the server returned a JSON-RPC error.
    pub fn rpc_kind(&self) -> Option<RpcErrorKind> {
        self.rpc_error().map(RpcError::kind)
    }

    /// The context lines rendered between the short message and the details.
    pub fn meta_messages(&self) -> Vec<String> {
        match self {
            Self::Http { url, status, body, .. } => http_meta(url, status, body),
            Self::Timeout { url, body } | Self::Rpc { url, body, .. } => request_meta(url, body),
            Self::InvalidResponse { .. } | Self::InvalidUrl { .. } => Vec::new(),
        }
    }
}

fn request_meta(url: &str, body: &str) -> Vec<String> {
    vec![format!("URL: {url}"), format!("Request body: {body}")]
}

fn http_meta(url: &str, status: &Option<u16>, body: &str) -> Vec<String> {
    let mut meta = Vec::with_capacity(3);
    if let Some(status) = status {
        meta.push(format!("Status: {status}"));
    }
    meta.extend(request_meta(url, body));
    meta
}

fn http_message(url: &str, status: &Option<u16>, body: &str, details: &str) -> String {
    format_error_message("HTTP request failed.", &http_meta(url, status, body), Some(details))
}

fn timeout_message(url: &str, body: &str) -> String {
    format_error_message("The request took too long to respond.", &request_meta(url, body), None)
}

fn invalid_response_message(method: &str, reason: &str) -> String {
    format_error_message(&format!("Invalid `{method}` response."), &[], Some(reason))
}

fn invalid_url_message(url: &str, reason: &str) -> String {
    format_error_message(&format!("Invalid URL `{url}`."), &[], Some(reason))
}

fn rpc_message(error: &RpcError, url: &str, body: &str) -> String {
    let short = match error.kind() {
        RpcErrorKind::Unknown => "RPC Request failed.",
        kind => kind.short_message(),
    };
    format_error_message(short, &request_meta(url, body), Some(&error.details()))
}
