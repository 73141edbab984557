//! Solidity ABI codec: type grammar, standard and packed encoding, decoding,
//! and function call data for JSON or human-readable ABIs.

pub mod decode;
pub mod encode;
pub mod error;
pub mod function;
pub mod types;
pub mod value;

pub use decode::decode_abi_parameters;
pub use encode::{encode_abi_parameters, encode_packed, encode_value};
pub use error::{AbiError, Result};
pub use function::{
    Abi, Function, Param, decode_function_data, decode_function_result, encode_function_data,
};
pub use types::AbiType;
pub use value::AbiValue;

/// Parses a comma separated type list such as `address,uint256,(bytes,bool)[]`.
pub fn parse_types(list: &str) -> Result<Vec<AbiType>> {
    types::split_top_level(list)?.into_iter().map(AbiType::parse).collect()
}
