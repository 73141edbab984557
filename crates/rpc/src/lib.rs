//! JSON-RPC transport and typed clients for the public node, bundler,
//! paymaster, modular wallet and relying-party services.

pub mod bundler;
pub mod bundler_error;
pub mod error;
pub mod modular;
pub mod paymaster;
pub mod public;
pub mod transport;

pub use bundler::{
    BundlerClient, UserOperationGasEstimate, UserOperationReceipt, WaitForReceiptConfig,
    WaitForReceiptError,
};
pub use bundler_error::{BundlerError, BundlerErrorKind};
pub use error::{Result, RpcError, RpcErrorKind, TransportError};
pub use modular::{ModularWallet, ModularWalletsClient, RpClient};
pub use paymaster::{Paymaster, PaymasterClient, PaymasterContext};
pub use public::{BlockTag, FeeEstimationConfig, FeesPerGas, PublicClient};
pub use transport::{HttpTransport, HttpTransportConfig, Transport, to_modular_transport};
