//! HTTP JSON-RPC 2.0 client.
//!
//! Requests are `POST`ed with `Content-Type: application/json` and a body
//! of `{jsonrpc: "2.0", id: 1, method, params}`. Responses carry either a
//! `result` or an `error: {code, message}` object; the latter maps to
//! [`RpcError::Rpc`] so the retry policy can classify it.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::trace;

use crate::rpc::{EthRpc, RpcError};
use crate::types::{Block, Filter, Log, Receipt};

/// Error bodies are truncated to this length before being attached to an
/// [`RpcError::Http`], keeping provider HTML error pages out of the logs.
const MAX_ERROR_BODY_LEN: usize = 256;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RpcEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i32,
    message: String,
}

/// HTTP JSON-RPC client for a single endpoint.
pub struct HttpRpc {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRpc {
    /// Creates a client with the default 10 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the underlying HTTP client fails
    /// to build.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the underlying HTTP client fails
    /// to build.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()?;

        Ok(Self { endpoint: endpoint.into(), client })
    }

    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, RpcError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        trace!(method, endpoint = %self.endpoint, "sending rpc request");

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.is_empty() {
                message = status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string();
            } else if message.len() > MAX_ERROR_BODY_LEN {
                message.truncate(MAX_ERROR_BODY_LEN);
                message.push_str("... (truncated)");
            }
            return Err(RpcError::Http { status: status.as_u16(), message });
        }

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Rpc { code: err.code, message: err.message });
        }

        envelope
            .result
            .ok_or_else(|| RpcError::InvalidResponse("response carries neither result nor error".into()))
    }
}

#[async_trait]
impl EthRpc for HttpRpc {
    async fn head(&self) -> Result<String, RpcError> {
        self.call("eth_blockNumber", json!([])).await
    }

    async fn block_by_number(&self, number: &str) -> Result<Block, RpcError> {
        // Second parameter false: headers only, no full transactions.
        self.call("eth_getBlockByNumber", json!([number, false])).await
    }

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, RpcError> {
        self.call("eth_getLogs", json!([filter])).await
    }

    async fn block_receipts(&self, number: &str) -> Result<Vec<Receipt>, RpcError> {
        self.call("eth_getBlockReceipts", json!([number])).await
    }
}
