//! Addresses, hashes and limits shared by every Circle modular wallet.

use alloy_primitives::{Address, B256, address, b256, hex};

/// Version reported in every error message.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// ERC-4337 EntryPoint v0.7.
pub const ENTRY_POINT_V07: Address = address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Upgradable modular smart contract account factory.
pub const CIRCLE_MSCA_FACTORY: Address = address!("0x0000000DF7E6c9Dc387cAFc5eCBfa6c3a6179AdD");

/// Weighted WebAuthn multisig plugin installed on every account.
pub const CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN: Address =
    address!("0x0000000C984AFf541D6cE86Bb697e68ec57873C8");

/// Manifest hash of [`CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN`].
pub const CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN_MANIFEST_HASH: B256 =
    b256!("0xa043327d77a74c1c55cfa799284b831fe09535a88b9f5fa4173d334e5ba0fd91");

/// CREATE2 salt used by the factory.
pub const SALT: B256 = B256::ZERO;

/// Weight given to the single owner installed at deployment.
pub const OWNER_WEIGHT: u64 = 1;

/// Signature weight required to validate, with a single owner of weight 1.
pub const THRESHOLD_WEIGHT: u64 = 1;

/// `executeBatch((address,uint256,bytes)[])` called with an empty array.
pub const EMPTY_BATCH_CALL_DATA: [u8; 68] = hex!(
    "34fcd5be00000000000000000000000000000000000000000000000000000000000000200000000000000000000000000000000000000000000000000000000000000000"
);

/// Verification gas floor for deployed accounts.
pub const MINIMUM_VERIFICATION_GAS_LIMIT: u64 = 100_000;

/// Verification gas floor when the user operation also deploys the account.
pub const MINIMUM_UNDEPLOYED_VERIFICATION_GAS_LIMIT: u64 = 1_500_000;

/// EIP-712 domain name of the replay-safe message envelope.
pub const REPLAY_SAFE_HASH_DOMAIN_NAME: &str = "Weighted Multisig Webauthn Plugin";

/// EIP-712 domain version of the replay-safe message envelope.
pub const REPLAY_SAFE_HASH_DOMAIN_VERSION: &str = "1.0.0";

/// Primary type of the replay-safe message envelope.
pub const REPLAY_SAFE_HASH_PRIMARY_TYPE: &str = "CircleWeightedWebauthnMultisigMessage";

/// Placeholder WebAuthn signature used while estimating gas.
///
/// Decodes like a real user operation signature but does not verify.
pub const STUB_SIGNATURE: [u8; 673] = hex!(
    "a000ddb94882f9f9cd0a859ed3a9f047ad43d7e2e4e7e491f1fe2e657a2651b60000000000000000000000000000000000000000000000000000000000000041220000000000000000000000000000000000000000000000000000000000000240000000000000000000000000000000000000000000000000000000000000002000000000000000000000000000000000000000000000000000000000000000601111111111111111111111111111111111111111111111111111111111111111222222222222222222222222222222222222222222222222222222222222222200000000000000000000000000000000000000000000000000000000000000a00000000000000000000000000000000000000000000000000000000000000100000000000000000000000000000000000000000000000000000000000000001700000000000000000000000000000000000000000000000000000000000000010000000000000000000000000000000000000000000000000000000000000001000000000000000000000000000000000000000000000000000000000000002549960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d9763050000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000827b2274797065223a22776562617574686e2e676574222c226368616c6c656e6765223a2241414141414141414141414141414141414141414141414141414141414141414141414141414141414141222c226f726967696e223a2268747470733a2f2f6c6f63616c686f7374222c2263726f73734f726967696e223a66616c73657d000000000000000000000000000000000000000000000000000000000000"
);

/// Placeholder ECDSA signature (`r || s || v`) used while estimating gas for local owners.
pub const ECDSA_STUB_SIGNATURE: [u8; 65] = hex!(
    "fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa3c"
);
