mod common;

use std::time::Duration;

use alloy_primitives::{Address, B256, U256, address};
use common::{mount_result, result, rpc_error, rpc_method, transport};
use mw_core::{UserOperationV07, constants::ENTRY_POINT_V07};
use mw_rpc::{
    BundlerClient, BundlerErrorKind, FeeEstimationConfig, ModularWalletsClient, PublicClient,
    RpcErrorKind, TransportError, WaitForReceiptConfig, WaitForReceiptError,
    modular::{GetAddressRequest, InitialOwnershipConfiguration, ScaConfiguration, WeightedMultisig},
    to_modular_transport,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method},
};

fn block(base_fee: &str) -> serde_json::Value {
    json!({
        "number": "0x10",
        "hash": B256::repeat_byte(0xbb),
        "timestamp": "0x6553f100",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "baseFeePerGas": base_fee
    })
}

fn receipt(hash: B256) -> serde_json::Value {
    json!({
        "userOpHash": hash,
        "entryPoint": ENTRY_POINT_V07,
        "sender": "0x1111111111111111111111111111111111111111",
        "nonce": "0x0",
        "actualGasCost": "0x5208",
        "actualGasUsed": "0x5208",
        "success": true,
        "logs": [],
        "receipt": {
            "transactionHash": B256::repeat_byte(0xcc),
            "blockHash": B256::repeat_byte(0xdd),
            "blockNumber": "0x20",
            "gasUsed": "0x5208",
            "status": "0x1"
        }
    })
}

#[tokio::test]
async fn estimates_fees_with_priority_fee_rpc() {
    let server = MockServer::start().await;
    mount_result(&server, "eth_getBlockByNumber", block("0x64")).await;
    mount_result(&server, "eth_maxPriorityFeePerGas", json!("0xc8")).await;

    let fees = PublicClient::new(transport(&server))
        .estimate_fees_per_gas(&FeeEstimationConfig::default())
        .await
        .unwrap();

    assert_eq!(fees.base_fee_per_gas, U256::from(100));
    assert_eq!(fees.max_priority_fee_per_gas, U256::from(200));
    assert_eq!(fees.max_fee_per_gas, U256::from(320));
}

#[tokio::test]
async fn priority_fee_falls_back_to_gas_price_floored_at_zero() {
    let server = MockServer::start().await;
    mount_result(&server, "eth_getBlockByNumber", block("0x64")).await;
    rpc_method("eth_maxPriorityFeePerGas")
        .respond_with(rpc_error(-32601, "method not found"))
        .mount(&server)
        .await;
    mount_result(&server, "eth_gasPrice", json!("0x50")).await;

    let fees = PublicClient::new(transport(&server))
        .estimate_fees_per_gas(&FeeEstimationConfig::default())
        .await
        .unwrap();

    assert_eq!(fees.max_priority_fee_per_gas, U256::ZERO);
    assert_eq!(fees.max_fee_per_gas, U256::from(200));
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    rpc_method("eth_chainId")
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_result(&server, "eth_chainId", json!("0x13882")).await;

    let chain_id = PublicClient::new(transport(&server)).chain_id().await.unwrap();
    assert_eq!(chain_id, 80_002);
}

#[tokio::test]
async fn does_not_retry_rpc_errors() {
    let server = MockServer::start().await;
    rpc_method("eth_getCode")
        .respond_with(rpc_error(-32602, "invalid params"))
        .expect(1)
        .mount(&server)
        .await;

    let err = PublicClient::new(transport(&server))
        .get_code(Address::ZERO, Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.rpc_kind(), Some(RpcErrorKind::InvalidParams));
}

#[tokio::test]
async fn surfaces_client_errors_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let err = PublicClient::new(transport(&server)).gas_price().await.unwrap_err();
    assert!(matches!(err, TransportError::Http { status: Some(401), .. }));
    assert!(err.to_string().contains("Details: unauthorized"));
}

#[tokio::test]
async fn classifies_bundler_rejections() {
    let server = MockServer::start().await;
    rpc_method("eth_sendUserOperation")
        .respond_with(rpc_error(-32500, "AA21 didn't pay prefund"))
        .mount(&server)
        .await;

    let bundler = BundlerClient::new(transport(&server), ENTRY_POINT_V07);
    let err = bundler.send_user_operation(&UserOperationV07::default()).await.unwrap_err();
    assert_eq!(err.kind, BundlerErrorKind::InsufficientPrefund);
}

#[tokio::test]
async fn sends_operation_with_entry_point() {
    let server = MockServer::start().await;
    let hash = B256::repeat_byte(0xab);
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_sendUserOperation",
            "params": [{ "sender": "0x1111111111111111111111111111111111111111" }, ENTRY_POINT_V07]
        })))
        .respond_with(result(json!(hash)))
        .expect(1)
        .mount(&server)
        .await;

    let op = UserOperationV07 {
        sender: Some(address!("0x1111111111111111111111111111111111111111")),
        ..Default::default()
    };
    let sent = BundlerClient::new(transport(&server), ENTRY_POINT_V07)
        .send_user_operation(&op)
        .await
        .unwrap();
    assert_eq!(sent, hash);
}

#[tokio::test]
async fn waits_for_receipt_through_pending_polls() {
    let server = MockServer::start().await;
    let hash = B256::repeat_byte(0x01);
    rpc_method("eth_getUserOperationReceipt")
        .respond_with(result(json!(null)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_result(&server, "eth_getUserOperationReceipt", receipt(hash)).await;

    let config = WaitForReceiptConfig {
        polling_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let receipt = BundlerClient::new(transport(&server), ENTRY_POINT_V07)
        .wait_for_user_operation_receipt(hash, &config)
        .await
        .unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.receipt.transaction_hash, B256::repeat_byte(0xcc));
}

#[tokio::test]
async fn receipt_wait_times_out_after_retries() {
    let server = MockServer::start().await;
    let hash = B256::repeat_byte(0x02);
    rpc_method("eth_getUserOperationReceipt")
        .respond_with(result(json!(null)))
        .expect(2)
        .mount(&server)
        .await;

    let config = WaitForReceiptConfig {
        polling_interval: Duration::from_millis(5),
        retry_count: 2,
        timeout: None,
    };
    let err = BundlerClient::new(transport(&server), ENTRY_POINT_V07)
        .wait_for_user_operation_receipt(hash, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, WaitForReceiptError::Timeout { hash: h } if h == hash));
}

#[tokio::test]
async fn zero_retries_without_deadline_uses_default_poll_count() {
    let server = MockServer::start().await;
    rpc_method("eth_getUserOperationReceipt")
        .respond_with(result(json!(null)))
        .expect(6)
        .mount(&server)
        .await;

    let config = WaitForReceiptConfig {
        polling_interval: Duration::from_millis(5),
        retry_count: 0,
        timeout: None,
    };
    let err = BundlerClient::new(transport(&server), ENTRY_POINT_V07)
        .wait_for_user_operation_receipt(B256::ZERO, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, WaitForReceiptError::Timeout { .. }));
}

#[tokio::test]
async fn last_failed_poll_returns_without_sleeping() {
    let server = MockServer::start().await;
    rpc_method("eth_getUserOperationReceipt")
        .respond_with(result(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let config = WaitForReceiptConfig {
        polling_interval: Duration::from_secs(60),
        retry_count: 1,
        timeout: None,
    };
    let bundler = BundlerClient::new(transport(&server), ENTRY_POINT_V07);
    let wait = bundler.wait_for_user_operation_receipt(B256::ZERO, &config);
    let err = tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out after the final poll")
        .unwrap_err();
    assert!(matches!(err, WaitForReceiptError::Timeout { .. }));
}

#[tokio::test]
async fn receipt_wait_honours_deadline() {
    let server = MockServer::start().await;
    mount_result(&server, "eth_getUserOperationReceipt", json!(null)).await;

    let config = WaitForReceiptConfig {
        polling_interval: Duration::from_millis(20),
        retry_count: 0,
        timeout: Some(Duration::from_millis(100)),
    };
    let err = BundlerClient::new(transport(&server), ENTRY_POINT_V07)
        .wait_for_user_operation_receipt(B256::ZERO, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, WaitForReceiptError::Timeout { .. }));
}

#[tokio::test]
async fn modular_transport_resolves_wallet_address() {
    let server = MockServer::start().await;
    let wallet = address!("0x2222222222222222222222222222222222222222");
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer TEST_CLIENT_KEY:secret"))
        .and(body_partial_json(json!({
            "method": "circle_getAddress",
            "params": [{ "scaConfiguration": { "scaCore": "circle_6900_v1" } }]
        })))
        .respond_with(result(json!({
            "address": wallet,
            "scaConfiguration": {
                "initialOwnershipConfiguration": { "weightedMultisig": { "thresholdWeight": 1 } },
                "scaCore": "circle_6900_v1",
                "initCode": "0xabcd"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = to_modular_transport(&server.uri(), "TEST_CLIENT_KEY:secret").unwrap();
    let client = ModularWalletsClient::new(std::sync::Arc::new(transport));
    let request = GetAddressRequest {
        sca_configuration: ScaConfiguration {
            initial_ownership_configuration: InitialOwnershipConfiguration {
                ownership_contract_address: None,
                weighted_multisig: WeightedMultisig { threshold_weight: 1, ..Default::default() },
            },
            sca_core: "circle_6900_v1".into(),
            init_code: None,
        },
        metadata: None,
    };

    let resolved = client.get_address(&request).await.unwrap();
    assert_eq!(resolved.address, wallet);
    assert_eq!(resolved.init_code().map(|code| code.to_vec()), Some(vec![0xab, 0xcd]));
}
