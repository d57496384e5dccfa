//! Per-chain configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::rpc::{EthRpc, RetryConfig};

/// Which RPC method the fetcher pool uses to pull logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// `eth_getLogs` over the whole range. One round-trip per window.
    #[default]
    Logs,
    /// `eth_getBlockReceipts` per block, filtered locally. Heavier, but
    /// more reliable on providers that cap log-query ranges.
    Receipts,
}

/// Identity and transport of an indexed chain.
#[derive(Clone)]
pub struct ChainInfo {
    /// Unique chain identifier, stringified (`"1"`, `"137"`, ...).
    pub chain_id: String,
    /// Display name used in logs.
    pub name: String,
    /// RPC endpoint handle for this chain.
    pub rpc: Arc<dyn EthRpc>,
}

/// Immutable per-chain configuration, normalized once at
/// [`crate::processor::Processor::add_chain`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Inclusive block height to begin indexing from.
    pub start_block: u64,
    /// Optional inclusive terminal height; `0` runs unbounded toward the
    /// moving head.
    pub end_block: u64,
    /// Blocks requested per fetch window. Larger ranges reduce round-trips
    /// but may exceed provider limits; tune per provider.
    pub range_size: u64,
    /// Sink batching hint. Not consumed by the core.
    pub batch_size: usize,
    /// Number of concurrent fetch workers; coerced to at least 1.
    pub fetcher_concurrency: usize,
    /// Decoder worker count. Not consumed by the core.
    pub decoder_concurrency: usize,
    /// Blocks subtracted from the head to compute each epoch's target,
    /// keeping the indexer clear of most reorgs. 5-15 is a common "safe"
    /// setting for Ethereum PoS.
    pub confirmation: u64,
    /// Capacity of the per-chain output stream.
    pub logs_buffer_size: usize,
    /// Maximum number of blocks walked back during reorg detection. Bounds
    /// the window-hash store. Default: 64.
    pub reorg_lookback_blocks: u64,
    /// Event topics to index. Entries may be canonical 32-byte hashes or
    /// human-readable signatures; see [`crate::utils::topics`].
    pub topics: Vec<String>,
    /// Fetch strategy; defaults to [`FetchMode::Logs`].
    pub fetch_mode: FetchMode,
    /// Retry policy for RPC calls; `None` installs [`RetryConfig::default`].
    pub retry: Option<RetryConfig>,
    /// How long the runner idles when the head has not advanced past the
    /// cursor.
    pub poll_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            start_block: 0,
            end_block: 0,
            range_size: 100,
            batch_size: 100,
            fetcher_concurrency: 4,
            decoder_concurrency: 1,
            confirmation: 0,
            logs_buffer_size: 1024,
            reorg_lookback_blocks: 64,
            topics: Vec::new(),
            fetch_mode: FetchMode::Logs,
            retry: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Options {
    /// Derives the window-hash store capacity: enough windows to cover the
    /// configured reorg lookback plus one, clamped to `[8, 256]`.
    #[must_use]
    pub(crate) fn window_cap(&self) -> u64 {
        let range_size = self.range_size.max(1);
        let windows = self.reorg_lookback_blocks.div_ceil(range_size) + 1;
        windows.clamp(8, 256)
    }
}
