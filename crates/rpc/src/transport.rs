use std::{
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use backon::Retryable;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Result, RpcError, TransportError};

/// A JSON-RPC 2.0 endpoint.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Sends `method` with positional `params` and returns the raw `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Endpoint used in diagnostics.
    fn url(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Timeouts, retries and headers of an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for 429 / 5xx / timeouts.
    pub retry_count: u32,
    /// Attempt `n` waits `n * retry_delay` before resending.
    pub retry_delay: Duration,
    /// Sent with every request.
    pub headers: HeaderMap,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
            headers: HeaderMap::new(),
        }
    }
}

impl HttpTransportConfig {
    /// Adds `Authorization: Bearer <token>`.
    pub fn with_bearer_token(mut self, token: &str) -> Result<Self> {
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            TransportError::InvalidUrl { url: String::new(), reason: e.to_string() }
        })?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Adds or replaces one header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets how often transient failures are retried.
    pub const fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets the base delay of the linear backoff.
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the per-attempt timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> + Send + Sync + Unpin + Debug + use<> {
        let delay = self.retry_delay;
        (1..=self.retry_count).map(move |attempt| delay * attempt)
    }
}

/// JSON-RPC over HTTP POST.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    config: HttpTransportConfig,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// A transport to `url` with the default config.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, HttpTransportConfig::default())
    }

    /// A transport to `url`. Fails on a malformed URL.
    pub fn with_config(url: &str, config: HttpTransportConfig) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .default_headers(config.headers.clone())
            .build()
            .map_err(|e| TransportError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, url, config, next_id: AtomicU64::new(1) })
    }

    async fn send_once(&self, body: &str) -> Result<Value> {
        let url = self.url.as_str();
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.config.timeout)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| classify_send_error(e, url, body))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_send_error(e, url, body))?;
        trace!(message = "rpc response", url = %url, status = %status, body = %text);

        if !status.is_success() {
            return Err(TransportError::Http {
                url: url.to_string(),
                status: Some(status.as_u16()),
                body: body.to_string(),
                details: text,
            });
        }

        let response: JsonRpcResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Http {
                url: url.to_string(),
                status: Some(status.as_u16()),
                body: body.to_string(),
                details: format!("invalid JSON-RPC response: {e}"),
            })?;

        match response.error {
            Some(error) => Err(TransportError::Rpc {
                error,
                url: url.to_string(),
                body: body.to_string(),
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }
}

fn classify_send_error(error: reqwest::Error, url: &str, body: &str) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout { url: url.to_string(), body: body.to_string() }
    } else {
        TransportError::Http {
            url: url.to_string(),
            status: error.status().map(|s| s.as_u16()),
            body: body.to_string(),
            details: error.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&JsonRpcRequest { jsonrpc: "2.0", id, method, params: &params })
            .map_err(|e| TransportError::InvalidResponse {
                method: method.to_string(),
                reason: e.to_string(),
            })?;
        debug!(message = "rpc request", method, id, url = %self.url);

        (|| async { self.send_once(&body).await })
            .retry(self.config.backoff())
            .when(TransportError::is_retryable)
            .notify(|err, delay| {
                warn!(message = "retrying rpc request", method, error = %err, delay = ?delay);
            })
            .await
    }

    fn url(&self) -> &str {
        self.url.as_str()
    }
}

/// Sends a request and decodes its `result`.
pub async fn call<R: DeserializeOwned>(
    transport: &dyn Transport,
    method: &str,
    params: Value,
) -> Result<R> {
    let value = transport.request(method, params).await?;
    serde_json::from_value(value).map_err(|e| TransportError::InvalidResponse {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Transport for a Circle endpoint, e.g. `https://modular-sdk.circle.com/v1/rpc/w3s/buidl/polygonAmoy`,
/// authenticated with the client key.
pub fn to_modular_transport(client_url: &str, client_key: &str) -> Result<HttpTransport> {
    HttpTransport::with_config(
        client_url,
        HttpTransportConfig::default().with_bearer_token(client_key)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear() {
        let config = HttpTransportConfig::default();
        let delays: Vec<_> = config.backoff().collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(3)]
        );
        assert_eq!(config.with_retry_count(0).backoff().count(), 0);
    }

    #[test]
    fn sets_bearer_header() {
        let config = HttpTransportConfig::default().with_bearer_token("TEST_CLIENT_KEY:abc").unwrap();
        assert_eq!(config.headers[AUTHORIZATION], "Bearer TEST_CLIENT_KEY:abc");
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(matches!(HttpTransport::new("not a url"), Err(TransportError::InvalidUrl { .. })));
    }
}
