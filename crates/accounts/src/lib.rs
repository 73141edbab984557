//! Circle modular smart accounts: owners, signature packing, deployment
//! arguments and nonce management.

pub mod account;
pub mod calls;
pub mod circle;
pub mod contracts;
pub mod error;
pub mod factory;
pub mod nonce;
pub mod owner;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use account::SmartAccount;
pub use circle::{AddressResolution, CircleSmartAccount, ReplaySafeHashing};
pub use error::{AccountError, Result};
pub use nonce::{EntryPointNonceSource, NonceManager, NonceParams, NonceSource};
pub use owner::{
    LocalOwner, Owner, OwnerIdentity, OwnerSignature, WebAuthnAuthenticator, WebAuthnCredential,
    WebAuthnOwner,
};
