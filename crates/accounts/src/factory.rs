//! Deployment arguments for the upgradable MSCA factory.
//!
//! The factory deploys an ERC-1967 proxy at
//! `create2(factory, keccak256(sender || salt), initCodeHash)` and installs the
//! weighted multisig plugin with the initial owner.

use alloy_primitives::{Address, B256, Bytes, keccak256};
use mw_abi::{AbiType, AbiValue, Result, encode_abi_parameters};
use mw_core::constants::{
    CIRCLE_MSCA_FACTORY, CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN,
    CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN_MANIFEST_HASH, OWNER_WEIGHT, SALT, THRESHOLD_WEIGHT,
};

use crate::{
    contracts::{CREATE_ACCOUNT, function},
    owner::OwnerIdentity,
};

/// `abi.encode(initialOwners, ownerWeights, initialPublicKeyOwners,
/// publicKeyOwnerWeights, thresholdWeight)` for a single owner.
pub fn plugin_install_data(owner: &OwnerIdentity) -> Result<Bytes> {
    let weight = || AbiValue::Array(vec![AbiValue::from(OWNER_WEIGHT)]);
    let empty = || AbiValue::Array(Vec::new());
    let (owners, owner_weights, public_keys, public_key_weights) = match owner {
        OwnerIdentity::Eoa(address) => {
            (AbiValue::Array(vec![AbiValue::from(*address)]), weight(), empty(), empty())
        }
        OwnerIdentity::WebAuthn(public_key) => (
            empty(),
            empty(),
            AbiValue::Array(vec![AbiValue::Tuple(vec![
                AbiValue::Uint(public_key.x),
                AbiValue::Uint(public_key.y),
            ])]),
            weight(),
        ),
    };

    let types = [
        AbiType::Array(Box::new(AbiType::Address)),
        AbiType::Array(Box::new(AbiType::Uint(256))),
        AbiType::Array(Box::new(AbiType::Tuple(vec![AbiType::Uint(256), AbiType::Uint(256)]))),
        AbiType::Array(Box::new(AbiType::Uint(256))),
        AbiType::Uint(256),
    ];
    let values =
        [owners, owner_weights, public_keys, public_key_weights, AbiValue::from(THRESHOLD_WEIGHT)];
    Ok(encode_abi_parameters(&types, &values)?.into())
}

/// `abi.encode(plugins, manifestHashes, pluginInstallData)` with the multisig plugin.
pub fn initializing_data(owner: &OwnerIdentity) -> Result<Bytes> {
    let types = [
        AbiType::Array(Box::new(AbiType::Address)),
        AbiType::Array(Box::new(AbiType::FixedBytes(32))),
        AbiType::Array(Box::new(AbiType::Bytes)),
    ];
    let values = [
        AbiValue::Array(vec![AbiValue::from(CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN)]),
        AbiValue::Array(vec![AbiValue::from(
            CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN_MANIFEST_HASH,
        )]),
        AbiValue::Array(vec![AbiValue::from(plugin_install_data(owner)?)]),
    ];
    Ok(encode_abi_parameters(&types, &values)?.into())
}

/// `createAccount(sender, SALT, initializingData)` call data.
pub fn factory_data(owner: &OwnerIdentity) -> Result<Bytes> {
    let data = function(CREATE_ACCOUNT)?.encode_input(&[
        AbiValue::from(owner.sender()),
        AbiValue::from(SALT),
        AbiValue::from(initializing_data(owner)?),
    ])?;
    Ok(data.into())
}

/// Factory address and call data deploying an account for `owner`.
pub fn factory_args(owner: &OwnerIdentity) -> Result<(Address, Bytes)> {
    Ok((CIRCLE_MSCA_FACTORY, factory_data(owner)?))
}

/// The CREATE2 salt the factory derives from the owner sender and the account salt.
pub fn create2_salt(sender: B256, salt: B256) -> B256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(sender.as_slice());
    preimage[32..].copy_from_slice(salt.as_slice());
    keccak256(preimage)
}

/// Counterfactual account address given the proxy init code hash.
pub fn counterfactual_address(owner: &OwnerIdentity, init_code_hash: B256) -> Address {
    CIRCLE_MSCA_FACTORY.create2(create2_salt(owner.sender(), SALT), init_code_hash)
}

/// Splits `factory || factoryData` init code.
pub fn split_init_code(init_code: &[u8]) -> Option<(Address, Bytes)> {
    if init_code.len() < 20 {
        return None;
    }
    let (factory, data) = init_code.split_at(20);
    Some((Address::from_slice(factory), Bytes::copy_from_slice(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{U256, address};
    use mw_signature::P256PublicKey;

    const OWNER: Address = address!("0x1111111111111111111111111111111111111111");

    #[test]
    fn eoa_install_data_lists_the_owner() {
        let data = plugin_install_data(&OwnerIdentity::Eoa(OWNER)).unwrap();
        let decoded = mw_abi::decode_abi_parameters(
            &mw_abi::parse_types("address[],uint256[],(uint256,uint256)[],uint256[],uint256")
                .unwrap(),
            &data,
        )
        .unwrap();
        assert_eq!(decoded[0], AbiValue::Array(vec![AbiValue::from(OWNER)]));
        assert_eq!(decoded[1], AbiValue::Array(vec![AbiValue::from(1u64)]));
        assert_eq!(decoded[2], AbiValue::Array(vec![]));
        assert_eq!(decoded[4], AbiValue::from(1u64));
    }

    #[test]
    fn factory_data_calls_create_account() {
        let owner = OwnerIdentity::WebAuthn(P256PublicKey { x: U256::from(1), y: U256::from(2) });
        let (factory, data) = factory_args(&owner).unwrap();
        assert_eq!(factory, CIRCLE_MSCA_FACTORY);

        let args = function(CREATE_ACCOUNT).unwrap().decode_input(&data).unwrap();
        assert_eq!(args[0], AbiValue::from(owner.sender()));
        assert_eq!(args[1], AbiValue::from(SALT));

        let init = mw_abi::decode_abi_parameters(
            &mw_abi::parse_types("address[],bytes32[],bytes[]").unwrap(),
            args[2].as_bytes().unwrap(),
        )
        .unwrap();
        assert_eq!(
            init[0],
            AbiValue::Array(vec![AbiValue::from(CIRCLE_WEIGHTED_WEBAUTHN_MULTISIG_PLUGIN)])
        );
    }

    #[test]
    fn init_code_round_trips() {
        let (factory, data) = factory_args(&OwnerIdentity::Eoa(OWNER)).unwrap();
        let init_code = mw_core::user_operation::build_init_code_bytes(Some(factory), Some(&data));
        assert_eq!(split_init_code(&init_code), Some((factory, data)));
        assert_eq!(split_init_code(&[0u8; 4]), None);
    }

    #[test]
    fn counterfactual_address_depends_on_owner() {
        let hash = B256::repeat_byte(0xab);
        let a = counterfactual_address(&OwnerIdentity::Eoa(OWNER), hash);
        let b = counterfactual_address(&OwnerIdentity::Eoa(Address::ZERO), hash);
        assert_ne!(a, b);
        assert_eq!(
            a,
            CIRCLE_MSCA_FACTORY.create2(keccak256([OWNER.into_word().0, SALT.0].concat()), hash)
        );
    }
}
