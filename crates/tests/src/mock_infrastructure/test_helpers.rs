//! Shared helpers for pipeline tests.

use std::sync::Arc;
use std::time::Duration;

use lumen_core::processor::{ChainInfo, Options, Processor};
use lumen_core::rpc::{EthRpc, RetryConfig};
use lumen_core::types::Log;
use tokio::sync::mpsc;

/// Registers an RPC handle under a chain id.
pub fn chain(chain_id: &str, name: &str, rpc: Arc<dyn EthRpc>) -> ChainInfo {
    ChainInfo { chain_id: chain_id.to_string(), name: name.to_string(), rpc }
}

/// Options tuned for fast test turnaround: short poll interval and a
/// millisecond-scale retry policy without jitter.
pub fn fast_options() -> Options {
    Options {
        retry: Some(fast_retry()),
        poll_interval: Duration::from_millis(20),
        ..Options::default()
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(100),
        multiplier: 2.0,
        jitter: false,
    }
}

/// Collects exactly `n` logs or panics after `timeout`.
pub async fn collect_logs(rx: &mut mpsc::Receiver<Log>, n: usize, timeout: Duration) -> Vec<Log> {
    let mut logs = Vec::with_capacity(n);
    let outcome = tokio::time::timeout(timeout, async {
        while logs.len() < n {
            match rx.recv().await {
                Some(log) => logs.push(log),
                None => break,
            }
        }
    })
    .await;
    assert!(
        outcome.is_ok(),
        "timed out after collecting {} of {n} logs",
        logs.len()
    );
    logs
}

/// Polls until the chain's cursor reaches `block` or panics after
/// `timeout`.
pub async fn wait_for_cursor(
    processor: &Processor,
    chain_id: &str,
    block: u64,
    timeout: Duration,
) {
    tokio::time::timeout(timeout, async {
        loop {
            if processor.cursor(chain_id).unwrap() >= block {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "cursor stuck at {} waiting for {block}",
            processor.cursor(chain_id).unwrap()
        )
    });
}

/// Asserts that no further log arrives within `window`.
pub async fn assert_stream_quiet(rx: &mut mpsc::Receiver<Log>, window: Duration) {
    let extra = tokio::time::timeout(window, rx.recv()).await;
    assert!(extra.is_err(), "unexpected extra log: {extra:?}");
}
