//! Contract functions the account calls or encodes.

use mw_abi::{Function, Result};

/// `UpgradableMSCA.execute`.
pub const EXECUTE: &str = "function execute(address target, uint256 value, bytes data)";

/// `UpgradableMSCA.executeBatch`.
pub const EXECUTE_BATCH: &str = "function executeBatch((address,uint256,bytes)[] calls)";

/// `UpgradableMSCAFactory.createAccount`.
pub const CREATE_ACCOUNT: &str =
    "function createAccount(bytes32 sender, bytes32 salt, bytes initializingData)";

/// `EntryPoint.getNonce`.
pub const GET_NONCE: &str = "function getNonce(address sender, uint192 key) returns (uint256)";

/// `WeightedWebauthnMultisigPlugin.getReplaySafeMessageHash`.
pub const GET_REPLAY_SAFE_MESSAGE_HASH: &str =
    "function getReplaySafeMessageHash(address account, bytes32 hash) returns (bytes32)";

pub(crate) fn function(declaration: &str) -> Result<Function> {
    Function::parse(declaration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_deployed_contracts() {
        let selector = |declaration| function(declaration).unwrap().selector().to_string();
        assert_eq!(selector(EXECUTE), "0xb61d27f6");
        assert_eq!(selector(EXECUTE_BATCH), "0x34fcd5be");
        assert_eq!(selector(CREATE_ACCOUNT), "0x81d0dff1");
        assert_eq!(selector(GET_NONCE), "0x35567e1a");
        assert_eq!(selector(GET_REPLAY_SAFE_MESSAGE_HASH), "0x77102c35");
    }
}
