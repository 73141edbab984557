use alloy_primitives::{Address, B256, U256};
use mw_core::constants::{
    REPLAY_SAFE_HASH_DOMAIN_NAME, REPLAY_SAFE_HASH_DOMAIN_VERSION, REPLAY_SAFE_HASH_PRIMARY_TYPE,
};
use serde_json::json;

use crate::{
    error::Result,
    typed_data::{TypedData, TypedDataDomain, TypedDataField},
};

/// Wraps `hash` in the multisig plugin's EIP-712 envelope for `account` on `chain_id`.
///
/// Owners sign the digest of this document, never the bare hash.
pub fn replay_safe_typed_data(account: Address, chain_id: u64, hash: B256) -> TypedData {
    TypedData {
        types: [(
            REPLAY_SAFE_HASH_PRIMARY_TYPE.to_string(),
            vec![TypedDataField::new("hash", "bytes32")],
        )]
        .into_iter()
        .collect(),
        primary_type: REPLAY_SAFE_HASH_PRIMARY_TYPE.to_string(),
        domain: TypedDataDomain {
            name: Some(REPLAY_SAFE_HASH_DOMAIN_NAME.to_string()),
            version: Some(REPLAY_SAFE_HASH_DOMAIN_VERSION.to_string()),
            chain_id: Some(U256::from(chain_id)),
            verifying_contract: Some(account),
            salt: None,
        },
        message: json!({ "hash": hash.to_string() }),
    }
}

/// Local computation of `getReplaySafeMessageHash(account, hash)`.
pub fn replay_safe_hash(account: Address, chain_id: u64, hash: B256) -> Result<B256> {
    replay_safe_typed_data(account, chain_id, hash).hash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256};

    #[test]
    fn matches_manual_envelope() {
        let account = address!("0x1234567890123456789012345678901234567890");
        let hash = B256::repeat_byte(0x5a);

        let domain_type = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let mut domain = domain_type.to_vec();
        domain.extend_from_slice(keccak256(REPLAY_SAFE_HASH_DOMAIN_NAME).as_slice());
        domain.extend_from_slice(keccak256(REPLAY_SAFE_HASH_DOMAIN_VERSION).as_slice());
        domain.extend_from_slice(&U256::from(80_002u64).to_be_bytes::<32>());
        domain.extend_from_slice(account.into_word().as_slice());

        let mut message =
            keccak256(format!("{REPLAY_SAFE_HASH_PRIMARY_TYPE}(bytes32 hash)")).to_vec();
        message.extend_from_slice(hash.as_slice());

        let mut preimage = vec![0x19, 0x01];
        preimage.extend_from_slice(keccak256(domain).as_slice());
        preimage.extend_from_slice(keccak256(message).as_slice());

        assert_eq!(replay_safe_hash(account, 80_002, hash).unwrap(), keccak256(preimage));
    }

    #[test]
    fn differs_per_account_and_chain() {
        let hash = B256::repeat_byte(1);
        let a = address!("0x000000000000000000000000000000000000000a");
        let b = address!("0x000000000000000000000000000000000000000b");
        let base = replay_safe_hash(a, 1, hash).unwrap();
        assert_ne!(base, replay_safe_hash(b, 1, hash).unwrap());
        assert_ne!(base, replay_safe_hash(a, 137, hash).unwrap());
        assert_ne!(base, hash);
    }
}
