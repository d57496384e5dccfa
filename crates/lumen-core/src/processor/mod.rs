//! The processor: chain registry, lifecycle, and per-chain output streams.
//!
//! # Architecture
//!
//! ```text
//! Processor::run
//!       │  one task per chain
//!       ▼
//! ┌───────────────────────── ChainRunner (epoch loop) ─────────────────────────┐
//! │                                                                            │
//! │  head ──► target          ┌──► worker ──┐                                  │
//! │    │                      │             │  FetchResult (out of order)      │
//! │    ▼                      ├──► worker ──┼────────────┐                     │
//! │  planner ──BlockRange──►──┤             │            ▼                     │
//! │                           └──► worker ──┘         arbiter ──Log──► output  │
//! │                                                      │                     │
//! │                              parent-hash mismatch ◄──┘                     │
//! │                                      │                                     │
//! │                         cancel epoch, resolve ancestor,                    │
//! │                         rewind cursor, next epoch                          │
//! └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Chains are registered with [`Processor::add_chain`] while the processor
//! is stopped, run concurrently by [`Processor::run`], and observed
//! through [`Processor::logs`] and [`Processor::cursor`]. Chains are
//! independent: one chain's terminal failure does not cancel its siblings.

mod arbiter;
mod fetcher;
mod options;
mod planner;
mod reorg;
mod runner;
mod windows;

pub use options::{ChainInfo, FetchMode, Options};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::rpc::RetryError;
use crate::types::Log;
use crate::utils::topics::canonicalize_topics;

use runner::ChainRunner;
use windows::WindowHashStore;

/// Blocks rewound when ancestor search fails during reorg resolution.
const HARD_FALLBACK_BLOCKS: u64 = 1000;

/// Fatal failure of a single chain runner.
#[derive(Debug, Error)]
pub enum ChainError {
    /// An RPC call failed non-retryably or exhausted its retry budget.
    #[error("rpc call failed: {0}")]
    Rpc(#[from] RetryError),

    /// The endpoint returned an unparseable head quantity.
    #[error("invalid head quantity: {0:?}")]
    InvalidHead(String),

    /// The output stream's consumer went away.
    #[error("logs stream closed by consumer")]
    LogsClosed,
}

/// Errors surfaced by the [`Processor`] API.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Chains can only be added while the processor is stopped.
    #[error("cannot add chain while processor is running")]
    Running,

    /// No chain is registered under the given id.
    #[error("chain {0} not found")]
    UnknownChain(String),

    /// The output stream was already handed out.
    #[error("logs stream for chain {0} already taken")]
    LogsTaken(String),

    /// A chain runner stopped with a fatal error.
    #[error("chain {chain_id} stopped: {source}")]
    Chain {
        /// Id of the failed chain.
        chain_id: String,
        /// The runner's error.
        #[source]
        source: ChainError,
    },

    /// A chain task could not be joined (panicked or was aborted).
    #[error("chain task failed: {0}")]
    Join(String),
}

struct ChainSlot {
    name: String,
    cursor: Arc<AtomicU64>,
    runner: Option<ChainRunner>,
    logs_rx: Option<mpsc::Receiver<Log>>,
}

#[derive(Default)]
struct Inner {
    chains: HashMap<String, ChainSlot>,
    running: bool,
}

/// Registers chains and multiplexes their runners.
#[derive(Default)]
pub struct Processor {
    inner: RwLock<Inner>,
}

impl Processor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chain with its configuration.
    ///
    /// Normalizes the options: installs the default retry policy and fetch
    /// mode when unset, canonicalizes topics, derives the window-hash
    /// capacity, and allocates the output stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Running`] while [`Processor::run`] is in
    /// progress.
    pub fn add_chain(&self, chain: ChainInfo, options: Options) -> Result<(), ProcessorError> {
        let mut inner = self.inner.write();
        if inner.running {
            return Err(ProcessorError::Running);
        }

        let retry = options.retry.clone().unwrap_or_default();
        let window_cap = options.window_cap();
        let topics = Arc::new(canonicalize_topics(&options.topics));
        let cursor = Arc::new(AtomicU64::new(options.start_block));
        let (logs_tx, logs_rx) = mpsc::channel(options.logs_buffer_size.max(1));

        let runner = ChainRunner {
            chain_id: chain.chain_id.clone(),
            name: chain.name.clone(),
            rpc: chain.rpc,
            retry,
            topics,
            cursor: Arc::clone(&cursor),
            windows: WindowHashStore::new(window_cap),
            window_cap,
            hard_fallback_blocks: HARD_FALLBACK_BLOCKS,
            logs_tx,
            options,
        };

        debug!(
            chain = %chain.name,
            chain_id = %chain.chain_id,
            window_cap,
            "chain registered"
        );

        inner.chains.insert(
            chain.chain_id,
            ChainSlot {
                name: chain.name,
                cursor,
                runner: Some(runner),
                logs_rx: Some(logs_rx),
            },
        );
        Ok(())
    }

    /// Runs every registered chain until shutdown.
    ///
    /// Chains run independently; the first fatal chain error is returned
    /// after all runners have stopped, and every failure is logged. On
    /// `shutdown` the runners drain and return cleanly.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProcessorError::Chain`] observed, if any.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ProcessorError> {
        let runners: Vec<ChainRunner> = {
            let mut inner = self.inner.write();
            inner.running = true;
            inner
                .chains
                .values_mut()
                .filter_map(|slot| slot.runner.take())
                .collect()
        };

        let mut tasks: JoinSet<(String, Result<(), ChainError>)> = JoinSet::new();
        for runner in runners {
            let chain_id = runner.chain_id.clone();
            let name = runner.name.clone();
            let token = shutdown.clone();
            info!(chain = %name, chain_id = %chain_id, "starting chain runner");
            tasks.spawn(async move {
                let result = runner.run(token).await;
                (chain_id, result)
            });
        }

        let mut first_error: Option<ProcessorError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((chain_id, Ok(()))) => {
                    debug!(chain_id = %chain_id, "chain runner finished");
                }
                Ok((chain_id, Err(err))) => {
                    error!(chain_id = %chain_id, error = %err, "chain runner stopped");
                    if first_error.is_none() {
                        first_error = Some(ProcessorError::Chain { chain_id, source: err });
                    }
                }
                Err(join_err) => {
                    error!(error = %join_err, "chain task failed to join");
                    if first_error.is_none() {
                        first_error = Some(ProcessorError::Join(join_err.to_string()));
                    }
                }
            }
        }

        self.inner.write().running = false;

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hands out the chain's output stream.
    ///
    /// The receiver is single-consumer and can be taken exactly once. The
    /// stream closes when the chain runner stops.
    ///
    /// # Errors
    ///
    /// [`ProcessorError::UnknownChain`] for unregistered ids,
    /// [`ProcessorError::LogsTaken`] on a second call.
    pub fn logs(&self, chain_id: &str) -> Result<mpsc::Receiver<Log>, ProcessorError> {
        let mut inner = self.inner.write();
        let slot = inner
            .chains
            .get_mut(chain_id)
            .ok_or_else(|| ProcessorError::UnknownChain(chain_id.to_string()))?;
        slot.logs_rx
            .take()
            .ok_or_else(|| ProcessorError::LogsTaken(chain_id.to_string()))
    }

    /// Returns the chain's current cursor: the highest committed block.
    ///
    /// # Errors
    ///
    /// [`ProcessorError::UnknownChain`] for unregistered ids.
    pub fn cursor(&self, chain_id: &str) -> Result<u64, ProcessorError> {
        let inner = self.inner.read();
        let slot = inner
            .chains
            .get(chain_id)
            .ok_or_else(|| ProcessorError::UnknownChain(chain_id.to_string()))?;
        Ok(slot.cursor.load(Ordering::Acquire))
    }

    /// Returns the display name of a registered chain.
    ///
    /// # Errors
    ///
    /// [`ProcessorError::UnknownChain`] for unregistered ids.
    pub fn chain_name(&self, chain_id: &str) -> Result<String, ProcessorError> {
        let inner = self.inner.read();
        inner
            .chains
            .get(chain_id)
            .map(|slot| slot.name.clone())
            .ok_or_else(|| ProcessorError::UnknownChain(chain_id.to_string()))
    }
}
