use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A single call the smart account should make.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Target contract or recipient.
    pub to: Address,
    /// Wei sent with the call.
    #[serde(default)]
    pub value: U256,
    /// Calldata, empty for transfers.
    #[serde(default)]
    pub data: Bytes,
}

impl Call {
    /// A call to `to` with `value` and `data`.
    pub const fn new(to: Address, value: U256, data: Bytes) -> Self {
        Self { to, value, data }
    }

    /// Plain value transfer with empty call data.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self { to, value, data: Bytes::new() }
    }
}

/// Chain an account operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    /// EIP-155 chain id.
    pub id: u64,
    /// Endpoint path segment, e.g. `polygonAmoy`.
    pub name: String,
}

impl Chain {
    /// A chain from its id and name.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    /// Looks up a chain Circle modular wallets are deployed on by its
    /// endpoint path segment, e.g. `polygonAmoy`.
    pub fn from_name(name: &str) -> Option<Self> {
        KNOWN_CHAINS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(known, id)| Self::new(*id, *known))
    }
}

const KNOWN_CHAINS: [(&str, u64); 14] = [
    ("mainnet", 1),
    ("sepolia", 11_155_111),
    ("polygon", 137),
    ("polygonAmoy", 80_002),
    ("arbitrum", 42_161),
    ("arbitrumSepolia", 421_614),
    ("base", 8_453),
    ("baseSepolia", 84_532),
    ("optimism", 10),
    ("optimismSepolia", 11_155_420),
    ("avalanche", 43_114),
    ("avalancheFuji", 43_113),
    ("unichain", 130),
    ("unichainSepolia", 1_301),
];

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn should_deserialize_call_with_defaults() {
        let call: Call =
            serde_json::from_str(r#"{"to":"0x1111111111111111111111111111111111111111"}"#).unwrap();
        assert_eq!(call, Call::transfer(address!("0x1111111111111111111111111111111111111111"), U256::ZERO));
    }

    #[test]
    fn should_resolve_known_chains_by_name() {
        assert_eq!(Chain::from_name("polygonAmoy"), Some(Chain::new(80_002, "polygonAmoy")));
        assert_eq!(Chain::from_name("BASESEPOLIA").map(|c| c.id), Some(84_532));
        assert_eq!(Chain::from_name("dogechain"), None);
    }
}
