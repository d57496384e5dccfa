//! RPC adapter contract and the HTTP JSON-RPC implementation.
//!
//! The indexer core depends only on the [`EthRpc`] trait; [`HttpRpc`] is
//! the stock implementation speaking JSON-RPC 2.0 over HTTP POST.
//! Cancellation is driven by the caller: in-flight request futures are
//! simply dropped when an epoch is cancelled.

pub mod error;
pub mod http;
pub mod retry;

pub use error::RpcError;
pub use http::HttpRpc;
pub use retry::{retry_with_backoff, RetryConfig, RetryError};

use async_trait::async_trait;

use crate::types::{Block, Filter, Log, Receipt};

/// Capability set the indexer core requires from a JSON-RPC endpoint.
///
/// Block numbers are passed as hex quantities (`"0x10d4f"`) or tags
/// (`"latest"`), matching the wire format.
#[async_trait]
pub trait EthRpc: Send + Sync {
    /// Returns the current best block height as a hex quantity.
    async fn head(&self) -> Result<String, RpcError>;

    /// Returns the block header for the given block number or tag.
    async fn block_by_number(&self, number: &str) -> Result<Block, RpcError>;

    /// Fetches logs over a block range with a filter.
    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, RpcError>;

    /// Returns all transaction receipts of the given block.
    async fn block_receipts(&self, number: &str) -> Result<Vec<Receipt>, RpcError>;
}
