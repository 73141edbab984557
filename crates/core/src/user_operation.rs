//! ERC-4337 v0.7 user operation types
use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256, keccak256};
use alloy_sol_types::{SolValue, sol};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

sol! {
    struct PackedUserOperationHashData {
        address sender;
        uint256 nonce;
        bytes32 initCodeHash;
        bytes32 callDataHash;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes32 paymasterAndDataHash;
    }

    struct UserOperationHashData {
        bytes32 packedHash;
        address entryPoint;
        uint256 chainId;
    }
}

/// User operation while it is being prepared. Every field is optional until
/// the preparation pipeline fills it in.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationV07 {
    /// Smart account sending the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    /// EntryPoint nonce, the key in the upper 192 bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    /// Account factory, set only while the account is undeployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    /// Calldata for `factory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    /// Calldata the account executes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_data: Option<Bytes>,
    /// Gas for the execution phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    /// Gas for account validation and deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    /// Bundler overhead paid on top of execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    /// EIP-1559 fee cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// EIP-1559 tip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Sponsoring paymaster, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    /// Gas for paymaster validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Gas for the paymaster `postOp` call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Opaque data passed to the paymaster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    /// Account signature; a placeholder until signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
}

impl UserOperationV07 {
    /// Names of the fields a submittable operation must carry but this one lacks.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("sender", self.sender.is_some()),
            ("nonce", self.nonce.is_some()),
            ("callData", self.call_data.is_some()),
            ("callGasLimit", self.call_gas_limit.is_some()),
            ("verificationGasLimit", self.verification_gas_limit.is_some()),
            ("preVerificationGas", self.pre_verification_gas.is_some()),
            ("maxFeePerGas", self.max_fee_per_gas.is_some()),
            ("maxPriorityFeePerGas", self.max_priority_fee_per_gas.is_some()),
        ];
        required.into_iter().filter(|(_, present)| !present).map(|(name, _)| name).collect()
    }

    /// Whether any of the three gas limits still needs estimating.
    pub const fn needs_gas_estimate(&self) -> bool {
        self.call_gas_limit.is_none()
            || self.verification_gas_limit.is_none()
            || self.pre_verification_gas.is_none()
    }

    /// Converts into a resolved operation, listing every missing field on failure.
    ///
    /// An absent signature resolves to empty bytes; it is filled in last.
    pub fn try_into_resolved(self) -> Result<UserOperation, CoreError> {
        let missing = self.missing_fields();
        let (
            Some(sender),
            Some(nonce),
            Some(call_data),
            Some(call_gas_limit),
            Some(verification_gas_limit),
            Some(pre_verification_gas),
            Some(max_fee_per_gas),
            Some(max_priority_fee_per_gas),
        ) = (
            self.sender,
            self.nonce,
            self.call_data,
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
        )
        else {
            return Err(CoreError::MissingFields(missing));
        };

        Ok(UserOperation {
            sender,
            nonce,
            factory: self.factory,
            factory_data: self.factory_data,
            call_data,
            call_gas_limit,
            verification_gas_limit,
            pre_verification_gas,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            paymaster: self.paymaster,
            paymaster_verification_gas_limit: self.paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit: self.paymaster_post_op_gas_limit,
            paymaster_data: self.paymaster_data,
            signature: self.signature.unwrap_or_default(),
        })
    }
}

/// User operation with every gas and fee field populated.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Smart account sending the operation.
    pub sender: Address,
    /// EntryPoint nonce.
    pub nonce: U256,
    /// Set while undeployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    /// Calldata for `factory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    /// Calldata the account executes.
    pub call_data: Bytes,
    /// Execution gas.
    pub call_gas_limit: U256,
    /// Validation gas.
    pub verification_gas_limit: U256,
    /// Bundler overhead.
    pub pre_verification_gas: U256,
    /// Fee cap.
    pub max_fee_per_gas: U256,
    /// Tip.
    pub max_priority_fee_per_gas: U256,
    /// Sponsor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    /// Paymaster validation gas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Paymaster `postOp` gas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Paymaster data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    /// Empty until signed.
    pub signature: Bytes,
}

/// On-chain `PackedUserOperation` layout consumed by the v0.7 EntryPoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedUserOperation {
    /// Smart account sending the operation.
    pub sender: Address,
    /// EntryPoint nonce.
    pub nonce: U256,
    /// `factory || factoryData`, empty once deployed.
    pub init_code: Bytes,
    /// Calldata the account executes.
    pub call_data: Bytes,
    /// `verificationGasLimit (16 bytes) || callGasLimit (16 bytes)`.
    pub account_gas_limits: B256,
    /// Bundler overhead.
    pub pre_verification_gas: U256,
    /// `maxPriorityFeePerGas (16 bytes) || maxFeePerGas (16 bytes)`.
    pub gas_fees: B256,
    /// Paymaster, its two gas limits and data, or empty.
    pub paymaster_and_data: Bytes,
    /// Account signature.
    pub signature: Bytes,
}

impl UserOperation {
    /// `factory ++ factoryData`, or empty when the account is already deployed.
    pub fn init_code(&self) -> Bytes {
        build_init_code_bytes(self.factory, self.factory_data.as_ref())
    }

    /// `paymaster ++ uint128(verificationGas) ++ uint128(postOpGas) ++ paymasterData`,
    /// or empty without a paymaster.
    pub fn paymaster_and_data(&self) -> Bytes {
        let Some(paymaster) = self.paymaster else {
            return Bytes::new();
        };
        let data: &[u8] = self.paymaster_data.as_ref().map(|b| b.as_ref()).unwrap_or(&[]);
        let mut buf = Vec::with_capacity(52 + data.len());
        buf.extend_from_slice(paymaster.as_slice());
        buf.extend_from_slice(&low_u128(self.paymaster_verification_gas_limit.unwrap_or_default()));
        buf.extend_from_slice(&low_u128(self.paymaster_post_op_gas_limit.unwrap_or_default()));
        buf.extend_from_slice(data);
        Bytes::from(buf)
    }

    /// Packs into the on-chain layout.
    pub fn pack(&self) -> PackedUserOperation {
        PackedUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            init_code: self.init_code(),
            call_data: self.call_data.clone(),
            account_gas_limits: pack_account_gas_limits(
                self.verification_gas_limit,
                self.call_gas_limit,
            ),
            pre_verification_gas: self.pre_verification_gas,
            gas_fees: calc_gas_fees(self.max_priority_fee_per_gas, self.max_fee_per_gas),
            paymaster_and_data: self.paymaster_and_data(),
            signature: self.signature.clone(),
        }
    }

    /// `EntryPoint.getUserOpHash` for v0.7. The signature is not part of the hash.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed = self.pack();
        let inner = PackedUserOperationHashData {
            sender: packed.sender,
            nonce: packed.nonce,
            initCodeHash: keccak256(&packed.init_code),
            callDataHash: keccak256(&packed.call_data),
            accountGasLimits: packed.account_gas_limits,
            preVerificationGas: packed.pre_verification_gas,
            gasFees: packed.gas_fees,
            paymasterAndDataHash: keccak256(&packed.paymaster_and_data),
        };
        let outer = UserOperationHashData {
            packedHash: keccak256(inner.abi_encode()),
            entryPoint: entry_point,
            chainId: U256::from(chain_id),
        };
        keccak256(outer.abi_encode())
    }

    /// Returns the operation with `signature` set.
    pub fn with_signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }
}

impl From<UserOperation> for UserOperationV07 {
    fn from(op: UserOperation) -> Self {
        Self {
            sender: Some(op.sender),
            nonce: Some(op.nonce),
            factory: op.factory,
            factory_data: op.factory_data,
            call_data: Some(op.call_data),
            call_gas_limit: Some(op.call_gas_limit),
            verification_gas_limit: Some(op.verification_gas_limit),
            pre_verification_gas: Some(op.pre_verification_gas),
            max_fee_per_gas: Some(op.max_fee_per_gas),
            max_priority_fee_per_gas: Some(op.max_priority_fee_per_gas),
            paymaster: op.paymaster,
            paymaster_verification_gas_limit: op.paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit: op.paymaster_post_op_gas_limit,
            paymaster_data: op.paymaster_data,
            signature: Some(op.signature),
        }
    }
}

/// `factory || factoryData`, or empty without a factory.
pub fn build_init_code_bytes(factory: Option<Address>, factory_data: Option<&Bytes>) -> Bytes {
    match factory {
        Some(factory) => {
            let factory_data = factory_data.map(|b| b.as_ref()).unwrap_or(&[]);
            let mut buf = Vec::with_capacity(20 + factory_data.len());
            buf.extend_from_slice(factory.as_slice());
            buf.extend_from_slice(factory_data);
            Bytes::from(buf)
        }
        None => Bytes::new(),
    }
}

fn low_u128(value: U256) -> [u8; 16] {
    let word = value.to_be_bytes::<32>();
    let mut out = [0u8; 16];
    out.copy_from_slice(&word[16..]);
    out
}

fn pack_u128_pair(hi: U256, lo: U256) -> FixedBytes<32> {
    let mask = (U256::from(1u64) << 128) - U256::from(1u64);
    FixedBytes::from(((hi & mask) << 128) | (lo & mask))
}

/// `verificationGasLimit || callGasLimit` as two 16-byte halves.
pub fn pack_account_gas_limits(verification_gas: U256, call_gas: U256) -> FixedBytes<32> {
    pack_u128_pair(verification_gas, call_gas)
}

/// `maxPriorityFeePerGas || maxFeePerGas` as two 16-byte halves.
pub fn calc_gas_fees(max_priority_fee_per_gas: U256, max_fee_per_gas: U256) -> FixedBytes<32> {
    pack_u128_pair(max_priority_fee_per_gas, max_fee_per_gas)
}
