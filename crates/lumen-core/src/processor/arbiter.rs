//! In-order reassembly of fetched ranges.
//!
//! Ranges complete out of order; the arbiter is the single task that puts
//! them back into cursor order, verifies parent-hash continuity between
//! adjacent committed windows, and emits logs downstream. On a continuity
//! mismatch it cancels the epoch and reports a reorg; the chain runner
//! then resolves the rewind point (see [`super::reorg`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::processor::fetcher::FetchResult;
use crate::processor::windows::WindowHashStore;
use crate::processor::ChainError;
use crate::rpc::{retry_with_backoff, EthRpc, RetryConfig};
use crate::types::{Block, Log};
use crate::utils::hex::format_hex_u64;

/// How an arbiter pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArbiterOutcome {
    /// The result stream closed; every completed range was committed.
    Completed,
    /// The epoch was cancelled from outside.
    Cancelled,
    /// Parent-hash continuity broke; the epoch has been cancelled and the
    /// caller must resolve an ancestor before continuing.
    Reorg,
    /// A fatal error was published on the error channel.
    Failed,
}

enum HeaderFetch {
    Ok(Block),
    Cancelled,
    Failed,
}

async fn fetch_header(
    epoch: &CancellationToken,
    rpc: &Arc<dyn EthRpc>,
    retry: &RetryConfig,
    errors_tx: &mpsc::Sender<ChainError>,
    number: u64,
) -> HeaderFetch {
    let result = tokio::select! {
        () = epoch.cancelled() => return HeaderFetch::Cancelled,
        result = retry_with_backoff(epoch, retry, || {
            let rpc = Arc::clone(rpc);
            let number = format_hex_u64(number);
            async move { rpc.block_by_number(&number).await }
        }) => result,
    };

    match result {
        Ok(block) => HeaderFetch::Ok(block),
        Err(err) if err.is_cancelled() => HeaderFetch::Cancelled,
        Err(err) => {
            let _ = errors_tx.try_send(ChainError::Rpc(err));
            HeaderFetch::Failed
        }
    }
}

/// Consumes fetch results until the stream closes, committing windows
/// strictly in cursor order.
///
/// Per committed window `[next, end]`:
///
/// 1. the header at `next` is fetched and its parent hash compared against
///    the stored hash of `next - 1` (skipped at genesis and for the first
///    window after a reset),
/// 2. the window's logs are emitted downstream in arrival order,
/// 3. the shared cursor advances to `end`,
/// 4. the hash of block `end` is recorded in the window store.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_arbiter(
    epoch: CancellationToken,
    rpc: Arc<dyn EthRpc>,
    retry: RetryConfig,
    mut results_rx: mpsc::Receiver<FetchResult>,
    logs_tx: mpsc::Sender<Log>,
    errors_tx: mpsc::Sender<ChainError>,
    cursor: Arc<AtomicU64>,
    windows: &mut WindowHashStore,
) -> ArbiterOutcome {
    let mut pending: HashMap<u64, u64> = HashMap::new();
    let mut pending_logs: HashMap<u64, Vec<Log>> = HashMap::new();
    let mut next = cursor.load(Ordering::Acquire).saturating_add(1);

    loop {
        let result = tokio::select! {
            () = epoch.cancelled() => return ArbiterOutcome::Cancelled,
            result = results_rx.recv() => result,
        };
        let Some(result) = result else {
            return ArbiterOutcome::Completed;
        };

        match pending.get(&result.from) {
            Some(&known_to) if known_to != result.to => {
                warn!(
                    from = result.from,
                    known_to,
                    conflicting_to = result.to,
                    "conflicting duplicate range dropped"
                );
            }
            Some(_) => {} // idempotent duplicate
            None => {
                pending.insert(result.from, result.to);
                pending_logs.insert(result.from, result.logs);
            }
        }

        while let Some(&end) = pending.get(&next) {
            let header = match fetch_header(&epoch, &rpc, &retry, &errors_tx, next).await {
                HeaderFetch::Ok(block) => block,
                HeaderFetch::Cancelled => return ArbiterOutcome::Cancelled,
                HeaderFetch::Failed => return ArbiterOutcome::Failed,
            };

            // Parent continuity check; skipped at genesis and when no
            // window has been committed at next - 1 (first window after a
            // reset).
            if next > 0 {
                if let Some(parent) = windows.get(next - 1) {
                    if header.parent_hash != parent {
                        warn!(
                            block = next,
                            stored_parent = %parent,
                            chain_parent = %header.parent_hash,
                            "parent hash mismatch, reorg detected"
                        );
                        epoch.cancel();
                        return ArbiterOutcome::Reorg;
                    }
                }
            }

            if let Some(logs) = pending_logs.remove(&next) {
                for log in logs {
                    tokio::select! {
                        () = epoch.cancelled() => return ArbiterOutcome::Cancelled,
                        sent = logs_tx.send(log) => {
                            if sent.is_err() {
                                let _ = errors_tx.try_send(ChainError::LogsClosed);
                                return ArbiterOutcome::Failed;
                            }
                        }
                    }
                }
            }

            pending.remove(&next);
            cursor.store(end, Ordering::Release);
            debug!(from = next, to = end, "window committed");
            next = end.saturating_add(1);

            let end_header = match fetch_header(&epoch, &rpc, &retry, &errors_tx, end).await {
                HeaderFetch::Ok(block) => block,
                HeaderFetch::Cancelled => return ArbiterOutcome::Cancelled,
                HeaderFetch::Failed => return ArbiterOutcome::Failed,
            };
            windows.store(end, end_header.hash);
        }
    }
}
