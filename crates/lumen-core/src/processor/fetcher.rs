//! The fetcher pool: N workers pulling block ranges off a shared job
//! queue and fetching their logs concurrently.
//!
//! Two fetch strategies exist per chain:
//!
//! - **Logs mode**: a single `eth_getLogs` call per range with the chain's
//!   canonical topic filter.
//! - **Receipts mode**: one `eth_getBlockReceipts` call per block in the
//!   range; receipt logs are flattened and filtered on `topics[0]` locally.
//!   Heavier on bandwidth, but some providers serve receipts more reliably
//!   than wide log queries.
//!
//! Completed ranges flow to the arbiter as [`FetchResult`]s, out of order.
//! The first worker to fail after retries claims the single-slot error
//! channel and exits; the chain runner tears the epoch down.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::processor::planner::BlockRange;
use crate::processor::ChainError;
use crate::rpc::{retry_with_backoff, EthRpc, RetryConfig, RpcError};
use crate::types::{Filter, Log};
use crate::utils::hex::format_hex_u64;

use super::options::FetchMode;

/// Logs fetched for one block range, delivered to the arbiter.
#[derive(Debug)]
pub(crate) struct FetchResult {
    pub from: u64,
    pub to: u64,
    pub logs: Vec<Log>,
}

/// Everything a single fetch worker needs; cheap to clone per worker.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub epoch: CancellationToken,
    pub rpc: Arc<dyn EthRpc>,
    pub retry: RetryConfig,
    pub mode: FetchMode,
    pub topics: Arc<Vec<String>>,
    pub jobs: Arc<Mutex<mpsc::Receiver<BlockRange>>>,
    pub results_tx: mpsc::Sender<FetchResult>,
    pub errors_tx: mpsc::Sender<ChainError>,
}

/// One fetch worker. Runs until the job queue closes, the epoch is
/// cancelled, or a fetch fails after retries.
pub(crate) async fn run_worker(ctx: WorkerContext) {
    loop {
        let job = {
            let mut jobs = ctx.jobs.lock().await;
            tokio::select! {
                () = ctx.epoch.cancelled() => return,
                job = jobs.recv() => job,
            }
        };
        let Some(range) = job else { return };

        let fetched = tokio::select! {
            () = ctx.epoch.cancelled() => return,
            result = fetch_range(&ctx, range) => result,
        };

        match fetched {
            Ok(logs) => {
                trace!(from = range.from, to = range.to, logs = logs.len(), "range fetched");
                let result = FetchResult { from: range.from, to: range.to, logs };
                tokio::select! {
                    () = ctx.epoch.cancelled() => return,
                    sent = ctx.results_tx.send(result) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(err) if err.is_cancelled() => return,
            Err(err) => {
                debug!(from = range.from, to = range.to, error = %err, "range fetch failed");
                // Single-slot channel: the first failing worker wins, the
                // rest just exit.
                let _ = ctx.errors_tx.try_send(ChainError::Rpc(err));
                return;
            }
        }
    }
}

async fn fetch_range(
    ctx: &WorkerContext,
    range: BlockRange,
) -> Result<Vec<Log>, crate::rpc::RetryError> {
    match ctx.mode {
        FetchMode::Logs => {
            let filter = Filter {
                from_block: format_hex_u64(range.from),
                to_block: format_hex_u64(range.to),
                topics: ctx.topics.as_ref().clone(),
                ..Filter::default()
            };
            retry_with_backoff(&ctx.epoch, &ctx.retry, || {
                let rpc = Arc::clone(&ctx.rpc);
                let filter = filter.clone();
                async move { rpc.logs(&filter).await }
            })
            .await
        }
        FetchMode::Receipts => {
            retry_with_backoff(&ctx.epoch, &ctx.retry, || {
                let rpc = Arc::clone(&ctx.rpc);
                let topics = Arc::clone(&ctx.topics);
                async move { fetch_range_from_receipts(rpc, range, &topics).await }
            })
            .await
        }
    }
}

/// Receipts-mode fetch: per-block receipts, flattened and filtered.
async fn fetch_range_from_receipts(
    rpc: Arc<dyn EthRpc>,
    range: BlockRange,
    topics: &[String],
) -> Result<Vec<Log>, RpcError> {
    let mut all_logs = Vec::new();
    for number in range.from..=range.to {
        let receipts = rpc.block_receipts(&format_hex_u64(number)).await?;
        for receipt in receipts {
            for log in receipt.logs {
                if matches_topic_filter(&log, topics) {
                    all_logs.push(log);
                }
            }
        }
    }
    Ok(all_logs)
}

/// A log passes when its event signature (`topics[0]`) matches any
/// configured topic; an empty filter passes everything.
fn matches_topic_filter(log: &Log, topics: &[String]) -> bool {
    if topics.is_empty() {
        return true;
    }
    match log.topics.first() {
        Some(first) => topics.iter().any(|topic| topic == first),
        None => false,
    }
}
