use std::{sync::Arc, time::Duration};

use mw_rpc::{HttpTransport, HttpTransportConfig, Transport};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockBuilder, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method},
};

pub fn transport(server: &MockServer) -> Arc<dyn Transport> {
    let config = HttpTransportConfig::default().with_retry_delay(Duration::from_millis(10));
    Arc::new(HttpTransport::with_config(&server.uri(), config).unwrap())
}

pub fn rpc_method(name: &str) -> MockBuilder {
    Mock::given(method("POST")).and(body_partial_json(json!({ "method": name })))
}

pub fn result(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": value }))
}

pub fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

pub async fn mount_result(server: &MockServer, name: &str, value: Value) {
    rpc_method(name).respond_with(result(value)).mount(server).await;
}

/// A 32-byte ABI word holding `value`.
pub fn word(value: u64) -> Value {
    json!(format!("0x{value:064x}"))
}
