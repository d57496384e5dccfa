//! # Lumen Core
//!
//! Core engine for the Lumen multi-chain EVM log indexer.
//!
//! Per chain, the engine fetches logs concurrently from a JSON-RPC
//! endpoint, commits them downstream in strict block order, and detects
//! and recovers from chain reorganizations:
//!
//! - **[`processor`]**: the chain registry and per-chain pipeline — block
//!   range planner, bounded fetcher pool, in-order commit arbiter,
//!   window-hash store, and reorg resolver.
//!
//! - **[`rpc`]**: the [`rpc::EthRpc`] adapter contract the engine
//!   consumes, a stock HTTP JSON-RPC 2.0 implementation, and retry with
//!   exponential backoff under cancellable tokens.
//!
//! - **[`types`]**: wire-level records (`Log`, `Block`, `Receipt`,
//!   `Filter`) with hex quantities preserved verbatim.
//!
//! - **[`utils`]**: hex quantity codecs and the Keccak-256 topic
//!   canonicalizer.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lumen_core::processor::{ChainInfo, Options, Processor};
//! use lumen_core::rpc::HttpRpc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rpc = Arc::new(HttpRpc::new("https://eth.example.com")?);
//!
//! let processor = Processor::new();
//! processor.add_chain(
//!     ChainInfo { chain_id: "1".into(), name: "Ethereum".into(), rpc },
//!     Options {
//!         range_size: 500,
//!         confirmation: 12,
//!         topics: vec!["Transfer(address,address,uint256)".into()],
//!         ..Options::default()
//!     },
//! )?;
//!
//! let mut logs = processor.logs("1")?;
//! tokio::spawn(async move {
//!     while let Some(log) = logs.recv().await {
//!         println!("{} {}", log.block_number, log.address);
//!     }
//! });
//!
//! let shutdown = CancellationToken::new();
//! processor.run(shutdown).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering guarantees
//!
//! The output stream of a chain is strictly ascending by committed window;
//! within a window, logs keep the order the RPC returned them in. There
//! are no cross-chain ordering guarantees.

pub mod processor;
pub mod rpc;
pub mod types;
pub mod utils;

pub use processor::{ChainError, ChainInfo, FetchMode, Options, Processor, ProcessorError};
pub use rpc::{retry_with_backoff, EthRpc, HttpRpc, RetryConfig, RetryError, RpcError};
pub use types::{Block, Filter, Log, Receipt};
