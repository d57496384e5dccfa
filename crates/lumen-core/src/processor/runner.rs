//! The per-chain epoch loop.
//!
//! Each epoch: fetch the head, compute the target, fan a planner + fetcher
//! pool + arbiter out under a child cancellation token, then wait for one
//! of: natural completion, a fatal worker error, a detected reorg, or
//! parent shutdown. Every exit path drains the spawned tasks before the
//! loop re-enters, so no epoch leaks workers into the next one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::processor::arbiter::{run_arbiter, ArbiterOutcome};
use crate::processor::fetcher::{run_worker, WorkerContext};
use crate::processor::planner::run_planner;
use crate::processor::reorg::resolve_ancestor;
use crate::processor::windows::WindowHashStore;
use crate::processor::{ChainError, Options};
use crate::rpc::{retry_with_backoff, EthRpc, RetryConfig};
use crate::types::Log;
use crate::utils::hex::parse_hex_u64;

/// Owns all mutable state of one chain and drives its epochs.
///
/// Created by [`crate::processor::Processor::add_chain`], consumed by
/// [`crate::processor::Processor::run`].
pub(crate) struct ChainRunner {
    pub chain_id: String,
    pub name: String,
    pub rpc: Arc<dyn EthRpc>,
    pub options: Options,
    pub retry: RetryConfig,
    /// Canonicalized topic filter shared with the fetch workers.
    pub topics: Arc<Vec<String>>,
    /// Highest committed block, shared for observability.
    pub cursor: Arc<AtomicU64>,
    pub windows: WindowHashStore,
    pub window_cap: u64,
    pub hard_fallback_blocks: u64,
    pub logs_tx: mpsc::Sender<Log>,
}

impl ChainRunner {
    pub(crate) async fn run(mut self, parent: CancellationToken) -> Result<(), ChainError> {
        loop {
            if parent.is_cancelled() {
                return Ok(());
            }

            let epoch = parent.child_token();

            let head_result = tokio::select! {
                () = parent.cancelled() => return Ok(()),
                result = retry_with_backoff(&epoch, &self.retry, || {
                    let rpc = Arc::clone(&self.rpc);
                    async move { rpc.head().await }
                }) => result,
            };
            let head_hex = match head_result {
                Ok(head) => head,
                Err(err) if err.is_cancelled() => return Ok(()),
                Err(err) => return Err(ChainError::Rpc(err)),
            };
            let head = parse_hex_u64(&head_hex)
                .ok_or_else(|| ChainError::InvalidHead(head_hex.clone()))?;

            let mut target = head.saturating_sub(self.options.confirmation);
            if self.options.end_block > 0 {
                target = target.min(self.options.end_block);
            }

            let cursor_now = self.cursor.load(Ordering::Acquire);

            if self.options.end_block > 0 && cursor_now >= self.options.end_block {
                info!(
                    chain = %self.name,
                    cursor = cursor_now,
                    end_block = self.options.end_block,
                    "end block reached, chain complete"
                );
                return Ok(());
            }

            if target <= cursor_now {
                trace!(chain = %self.name, head, cursor = cursor_now, "no new confirmed blocks");
                tokio::select! {
                    () = parent.cancelled() => return Ok(()),
                    () = tokio::time::sleep(self.options.poll_interval) => {}
                }
                continue;
            }

            debug!(
                chain = %self.name,
                cursor = cursor_now,
                target,
                head,
                "starting epoch"
            );

            let worker_count = self.options.fetcher_concurrency.max(1);
            let range_size = self.options.range_size.max(1);

            let (jobs_tx, jobs_rx) = mpsc::channel(worker_count);
            let (results_tx, results_rx) = mpsc::channel(worker_count);
            let (errors_tx, mut errors_rx) = mpsc::channel::<ChainError>(1);
            let jobs_rx = Arc::new(Mutex::new(jobs_rx));

            let planner = tokio::spawn(run_planner(
                epoch.clone(),
                jobs_tx,
                cursor_now,
                target,
                range_size,
            ));

            let mut workers = JoinSet::new();
            for _ in 0..worker_count {
                workers.spawn(run_worker(WorkerContext {
                    epoch: epoch.clone(),
                    rpc: Arc::clone(&self.rpc),
                    retry: self.retry.clone(),
                    mode: self.options.fetch_mode,
                    topics: Arc::clone(&self.topics),
                    jobs: Arc::clone(&jobs_rx),
                    results_tx: results_tx.clone(),
                    errors_tx: errors_tx.clone(),
                }));
            }
            drop(results_tx);

            let mut worker_error: Option<ChainError> = None;
            let outcome = {
                let arbiter = run_arbiter(
                    epoch.clone(),
                    Arc::clone(&self.rpc),
                    self.retry.clone(),
                    results_rx,
                    self.logs_tx.clone(),
                    errors_tx.clone(),
                    Arc::clone(&self.cursor),
                    &mut self.windows,
                );
                tokio::pin!(arbiter);

                let mut parent_cancelled = false;
                loop {
                    tokio::select! {
                        outcome = &mut arbiter => break outcome,
                        maybe_err = errors_rx.recv(), if worker_error.is_none() => {
                            if let Some(err) = maybe_err {
                                warn!(chain = %self.name, error = %err, "fatal error, cancelling epoch");
                                worker_error = Some(err);
                                epoch.cancel();
                            }
                        }
                        () = parent.cancelled(), if !parent_cancelled => {
                            parent_cancelled = true;
                            epoch.cancel();
                        }
                    }
                }
            };

            // Drain: both the pool and the arbiter must be down before the
            // next epoch starts.
            let _ = planner.await;
            while workers.join_next().await.is_some() {}

            match outcome {
                ArbiterOutcome::Reorg => {
                    let detected = self.cursor.load(Ordering::Acquire);
                    let ancestor = resolve_ancestor(
                        &parent,
                        &self.rpc,
                        &mut self.windows,
                        detected,
                        range_size,
                        self.window_cap,
                        self.hard_fallback_blocks,
                    )
                    .await;
                    self.cursor.store(ancestor, Ordering::Release);
                    warn!(
                        chain = %self.name,
                        detected_at = detected,
                        ancestor,
                        "reorg resolved, cursor rewound"
                    );
                }
                ArbiterOutcome::Completed
                | ArbiterOutcome::Cancelled
                | ArbiterOutcome::Failed => {
                    if let Some(err) =
                        worker_error.or_else(|| errors_rx.try_recv().ok())
                    {
                        return Err(err);
                    }
                    if matches!(outcome, ArbiterOutcome::Failed) {
                        // The error slot was raced empty; nothing to
                        // surface, retry from the cursor.
                        warn!(chain = %self.name, "epoch failed without a recorded error");
                    }
                    if parent.is_cancelled() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
