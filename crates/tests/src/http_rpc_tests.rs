//! The pipeline over real HTTP: `HttpRpc` against a mockito endpoint.

use std::sync::Arc;
use std::time::Duration;

use lumen_core::processor::{Options, Processor};
use lumen_core::rpc::HttpRpc;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::mock_infrastructure::test_helpers::{chain, collect_logs, fast_options, wait_for_cursor};
use crate::mock_infrastructure::RpcMockBuilder;

fn block_header(number: u64) -> serde_json::Value {
    json!({
        "number": format!("0x{number:x}"),
        "hash": format!("0x{number:x}"),
        "parentHash": format!("0x{:x}", number.saturating_sub(1)),
        "timestamp": "0x0"
    })
}

#[tokio::test]
async fn indexes_a_single_window_over_http() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(1).await;
    mock.mock_get_block_by_number(1, &block_header(1)).await;
    mock.mock_get_logs(&[json!({
        "address": "0xabc",
        "topics": ["0xddf252ad"],
        "data": "0x",
        "blockNumber": "0x1",
        "transactionHash": "0xth1",
        "transactionIndex": "0x0",
        "blockHash": "0xbh1",
        "logIndex": "0x0",
        "removed": false
    })])
    .await;

    let rpc = Arc::new(HttpRpc::new(mock.url()).unwrap());
    let processor = Arc::new(Processor::new());
    processor
        .add_chain(
            chain("592", "Astar", rpc),
            Options {
                range_size: 1,
                fetcher_concurrency: 1,
                ..fast_options()
            },
        )
        .unwrap();

    let mut logs_rx = processor.logs("592").unwrap();
    let shutdown = CancellationToken::new();
    let run = tokio::spawn({
        let processor = Arc::clone(&processor);
        let shutdown = shutdown.clone();
        async move { processor.run(shutdown).await }
    });

    let logs = collect_logs(&mut logs_rx, 1, Duration::from_secs(10)).await;
    assert_eq!(logs[0].address, "0xabc");
    assert_eq!(logs[0].block_number, "0x1");
    wait_for_cursor(&processor, "592", 1, Duration::from_secs(10)).await;

    shutdown.cancel();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn http_400_on_get_logs_fails_the_chain_over_http() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(5).await;
    mock.mock_get_block_by_number(1, &block_header(1)).await;
    mock.mock_http_error("eth_getLogs", 400, "bad request").await;

    let rpc = Arc::new(HttpRpc::new(mock.url()).unwrap());
    let processor = Arc::new(Processor::new());
    processor
        .add_chain(
            chain("1", "Ethereum", rpc),
            Options {
                range_size: 10,
                fetcher_concurrency: 1,
                ..fast_options()
            },
        )
        .unwrap();

    let shutdown = CancellationToken::new();
    let result =
        tokio::time::timeout(Duration::from_secs(10), processor.run(shutdown)).await;
    assert!(result.expect("run should stop on the 400").is_err());
}

#[tokio::test]
async fn rpc_error_on_head_is_retried_over_http() {
    // The head call always answers a retryable -32000; the chain exhausts
    // its budget and stops with the retry error.
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rpc_error("eth_blockNumber", -32000, "server busy").await;

    let rpc = Arc::new(HttpRpc::new(mock.url()).unwrap());
    let processor = Arc::new(Processor::new());
    processor
        .add_chain(chain("1", "Ethereum", rpc), fast_options())
        .unwrap();

    let shutdown = CancellationToken::new();
    let result =
        tokio::time::timeout(Duration::from_secs(10), processor.run(shutdown)).await;
    let err = result.expect("run should stop after exhausting retries").unwrap_err();
    assert!(err.to_string().contains("Ethereum") || err.to_string().contains("1"));
}
