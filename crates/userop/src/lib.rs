//! Builds, signs and submits ERC-4337 v0.7 user operations for a
//! [`SmartAccount`](mw_accounts::SmartAccount).

pub mod client;
pub mod error;
mod prepare;

pub use client::{
    FeeEstimator, PrepareUserOperationConfig, SmartAccountClient, UserOperationRequest,
};
pub use error::{Result, UserOperationError, UserOperationExecutionError, pretty_print};
