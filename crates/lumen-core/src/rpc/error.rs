//! RPC error taxonomy and retryability classification.
//!
//! Four failure classes reach the core from an RPC adapter:
//!
//! - **HTTP errors** (non-2xx status): retryable for `429` and any `5xx`,
//!   permanent for other `4xx`.
//! - **JSON-RPC protocol errors** (`error` object in the response body):
//!   retryable for the server-error range `[-32099, -32000]`, permanent
//!   otherwise (invalid params, method not found, ...).
//! - **Transport errors** (connection refused, timeout): the core does not
//!   assume these recover, so they are not retried unless the adapter maps
//!   them to an HTTP-shaped retryable status.
//! - **Decode errors** (malformed body, missing result): permanent.

use thiserror::Error;

/// Error returned by an [`crate::rpc::EthRpc`] implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcError {
    /// HTTP-level failure (non-2xx status code).
    #[error("http error {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or status text, truncated by the adapter.
        message: String,
    },

    /// JSON-RPC error object returned by the endpoint.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i32,
        /// Error message from the endpoint.
        message: String,
    },

    /// Network-level failure from the underlying HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response could not be decoded or was structurally invalid.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Returns `true` if the operation may succeed when repeated.
    ///
    /// - HTTP `429` and `5xx` are retryable; other statuses are not.
    /// - RPC codes in `[-32099, -32000]` (server errors) are retryable.
    /// - Transport and decode failures are not retried by the core.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Rpc { code, .. } => (-32099..=-32000).contains(code),
            Self::Transport(_) | Self::InvalidResponse(_) => false,
        }
    }
}
