//! Cross-checks the dynamic codec against `alloy-sol-types` generated code.

use alloy_primitives::{Address, Bytes, I256, U256, address, b256, hex};
use alloy_sol_types::{SolCall, SolType, sol, sol_data};
use mw_abi::{
    Abi, AbiType, AbiValue, decode_abi_parameters, encode_abi_parameters, encode_function_data,
    encode_packed, parse_types,
};

sol! {
    struct Call {
        address target;
        uint256 value;
        bytes data;
    }

    function execute(address dest, uint256 value, bytes func);
    function executeBatch(Call[] calls);
}

const ACCOUNT_ABI: &str = r#"[
    {"type":"function","name":"execute","inputs":[
        {"name":"dest","type":"address"},{"name":"value","type":"uint256"},{"name":"func","type":"bytes"}],
     "outputs":[]},
    {"type":"function","name":"executeBatch","inputs":[
        {"name":"calls","type":"tuple[]","components":[
            {"name":"target","type":"address"},{"name":"value","type":"uint256"},{"name":"data","type":"bytes"}]}],
     "outputs":[]}
]"#;

const EMPTY_BATCH_CALL_DATA: &str = "0x34fcd5be\
    0000000000000000000000000000000000000000000000000000000000000020\
    0000000000000000000000000000000000000000000000000000000000000000";

fn call_value(target: Address, value: u64, data: &[u8]) -> AbiValue {
    AbiValue::Tuple(vec![
        AbiValue::from(target),
        AbiValue::from(value),
        AbiValue::Bytes(Bytes::copy_from_slice(data)),
    ])
}

#[test]
fn execute_matches_generated_call() {
    let abi = Abi::parse_json(ACCOUNT_ABI).unwrap();
    let dest = address!("0x1111111111111111111111111111111111111111");
    let func = hex!("a9059cbb0000");

    let ours = encode_function_data(
        "execute",
        &abi,
        &[AbiValue::from(dest), AbiValue::from(5u64), AbiValue::Bytes(Bytes::from(func.to_vec()))],
    )
    .unwrap();
    let theirs = executeCall { dest, value: U256::from(5u64), func: Bytes::from(func.to_vec()) }.abi_encode();
    assert_eq!(ours, theirs);
}

#[test]
fn execute_batch_matches_generated_call() {
    let abi = Abi::parse_json(ACCOUNT_ABI).unwrap();
    let a = address!("0x1111111111111111111111111111111111111111");
    let b = address!("0x2222222222222222222222222222222222222222");

    let ours = encode_function_data(
        "executeBatch",
        &abi,
        &[AbiValue::Array(vec![call_value(a, 1, &[0xde, 0xad]), call_value(b, 0, &[0u8; 40])])],
    )
    .unwrap();
    let theirs = executeBatchCall {
        calls: vec![
            Call { target: a, value: U256::from(1u64), data: Bytes::from(vec![0xde, 0xad]) },
            Call { target: b, value: U256::ZERO, data: Bytes::from(vec![0u8; 40]) },
        ],
    }
    .abi_encode();
    assert_eq!(ours, theirs);
}

#[test]
fn empty_batch_is_byte_exact() {
    let abi = Abi::parse_json(ACCOUNT_ABI).unwrap();
    let ours = encode_function_data("executeBatch", &abi, &[AbiValue::Array(vec![])]).unwrap();
    assert_eq!(hex::encode_prefixed(&ours), EMPTY_BATCH_CALL_DATA);
    assert_eq!(ours, executeBatchCall { calls: vec![] }.abi_encode());
}

#[test]
fn parameters_match_generated_encoding() {
    let types = parse_types("uint8,int128,bytes32,string,uint256[],(address,bool)[2]").unwrap();
    let owner = address!("0x3333333333333333333333333333333333333333");
    let hash = b256!("0x0101010101010101010101010101010101010101010101010101010101010101");
    let values = vec![
        AbiValue::from(200u8),
        AbiValue::Int(I256::try_from(-42i64).unwrap()),
        AbiValue::from(hash),
        AbiValue::from("circle"),
        AbiValue::Array(vec![AbiValue::from(1u64), AbiValue::from(2u64), AbiValue::from(3u64)]),
        AbiValue::Array(vec![
            AbiValue::Tuple(vec![AbiValue::from(owner), AbiValue::from(true)]),
            AbiValue::Tuple(vec![AbiValue::from(Address::ZERO), AbiValue::from(false)]),
        ]),
    ];

    let ours = encode_abi_parameters(&types, &values).unwrap();
    type Params = (
        sol_data::Uint<8>,
        sol_data::Int<128>,
        sol_data::FixedBytes<32>,
        sol_data::String,
        sol_data::Array<sol_data::Uint<256>>,
        sol_data::FixedArray<(sol_data::Address, sol_data::Bool), 2>,
    );
    let theirs = Params::abi_encode_params(&(
        200u8,
        -42i128,
        hash,
        String::from("circle"),
        vec![U256::from(1u64), U256::from(2u64), U256::from(3u64)],
        [(owner, true), (Address::ZERO, false)],
    ));
    assert_eq!(ours, theirs);
    assert_eq!(decode_abi_parameters(&types, &ours).unwrap(), values);
}

#[test]
fn packed_matches_generated_encoding() {
    let types = parse_types("address,uint16,bytes,int8,uint32[]").unwrap();
    let addr = address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032");
    let values = vec![
        AbiValue::from(addr),
        AbiValue::from(513u64),
        AbiValue::Bytes(Bytes::from(vec![1, 2, 3])),
        AbiValue::Int(I256::try_from(-1i64).unwrap()),
        AbiValue::Array(vec![AbiValue::from(7u64), AbiValue::from(8u64)]),
    ];

    let ours = encode_packed(&types, &values).unwrap();
    type Packed = (
        sol_data::Address,
        sol_data::Uint<16>,
        sol_data::Bytes,
        sol_data::Int<8>,
        sol_data::Array<sol_data::Uint<32>>,
    );
    let theirs =
        Packed::abi_encode_packed(&(addr, 513u16, Bytes::from(vec![1u8, 2, 3]), -1i8, vec![7u32, 8u32]));
    assert_eq!(ours, theirs);
    assert_eq!(ours.len(), 20 + 2 + 3 + 1 + 64);
}

#[test]
fn packed_widths_equal_type_widths() {
    for bits in (8..=256).step_by(8) {
        let ty = AbiType::Uint(bits);
        let packed = encode_packed(std::slice::from_ref(&ty), &[AbiValue::from(1u8)]).unwrap();
        assert_eq!(packed.len(), bits / 8, "{ty}");
    }
    for size in 1..=32 {
        let ty = AbiType::FixedBytes(size);
        let value = AbiValue::FixedBytes(Bytes::from(vec![0xff; size]));
        assert_eq!(encode_packed(&[ty], &[value]).unwrap().len(), size);
    }
}
