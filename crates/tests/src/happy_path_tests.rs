//! Full-pipeline tests against a scripted chain: logs flow end to end,
//! in order, and the cursor tracks committed windows.

use std::sync::Arc;
use std::time::Duration;

use lumen_core::processor::{FetchMode, Options, Processor};
use lumen_core::utils::topics::signature_to_topic;
use tokio_util::sync::CancellationToken;

use crate::mock_infrastructure::test_helpers::{
    assert_stream_quiet, chain, collect_logs, fast_options, wait_for_cursor,
};
use crate::mock_infrastructure::{sample_log, ScriptedRpc};

#[tokio::test]
async fn single_log_indexes_to_head() {
    let rpc = Arc::new(ScriptedRpc::new(100).with_logs(vec![sample_log("0xabc")]));

    let processor = Arc::new(Processor::new());
    processor
        .add_chain(
            chain("592", "Astar", rpc.clone()),
            Options {
                range_size: 10,
                fetcher_concurrency: 4,
                start_block: 0,
                confirmation: 0,
                logs_buffer_size: 1024,
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

    // 10 windows, one log each.
    let logs = collect_logs(&mut logs_rx, 10, Duration::from_secs(5)).await;
    assert_eq!(logs[0].address, "0xabc");
    wait_for_cursor(&processor, "592", 100, Duration::from_secs(5)).await;

    shutdown.cancel();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn multi_log_ranges_preserve_rpc_order() {
    let per_range = vec![
        sample_log("0xabc"),
        sample_log("0xabcd"),
        sample_log("0xabcde"),
        sample_log("0xabcdef"),
        sample_log("0xabcdefg"),
    ];
    let rpc = Arc::new(ScriptedRpc::new(1000).with_logs(per_range));

    let processor = Arc::new(Processor::new());
    processor
        .add_chain(
            chain("592", "Astar", rpc.clone()),
            Options {
                range_size: 50,
                fetcher_concurrency: 4,
                start_block: 0,
                confirmation: 0,
                logs_buffer_size: 1024,
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

    // 20 ranges of 5 logs each.
    let logs = collect_logs(&mut logs_rx, 100, Duration::from_secs(5)).await;

    assert_eq!(logs[0].address, "0xabc");
    assert_eq!(logs[1].address, "0xabcd");
    assert_eq!(logs[2].address, "0xabcde");
    assert_eq!(logs[3].address, "0xabcdef");
    assert_eq!(logs[4].address, "0xabcdefg");
    // The pattern restarts with the next committed window.
    assert_eq!(logs[5].address, "0xabc");

    // Every window repeats the same five addresses in RPC order.
    for (i, log) in logs.iter().enumerate() {
        assert_eq!(log.address, logs[i % 5].address, "log {i} out of order");
    }

    wait_for_cursor(&processor, "592", 1000, Duration::from_secs(5)).await;
    assert_stream_quiet(&mut logs_rx, Duration::from_millis(200)).await;

    shutdown.cancel();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn confirmation_depth_holds_back_the_target() {
    let rpc = Arc::new(ScriptedRpc::new(100).with_logs(vec![sample_log("0xabc")]));

    let processor = Arc::new(Processor::new());
    processor
        .add_chain(
            chain("1", "Ethereum", rpc.clone()),
            Options {
                range_size: 10,
                fetcher_concurrency: 2,
                confirmation: 20,
                ..fast_options()
            },
        )
        .unwrap();

    let mut logs_rx = processor.logs("1").unwrap();
    let shutdown = CancellationToken::new();
    let run = tokio::spawn({
        let processor = Arc::clone(&processor);
        let shutdown = shutdown.clone();
        async move { processor.run(shutdown).await }
    });

    // head 100 - confirmation 20 = 80: eight windows, then idle.
    let _ = collect_logs(&mut logs_rx, 8, Duration::from_secs(5)).await;
    wait_for_cursor(&processor, "1", 80, Duration::from_secs(5)).await;
    assert_stream_quiet(&mut logs_rx, Duration::from_millis(200)).await;
    assert_eq!(processor.cursor("1").unwrap(), 80);

    shutdown.cancel();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn receipts_mode_filters_on_event_signature() {
    let transfer_topic = signature_to_topic("Transfer(address,address,uint256)");

    let mut matching = sample_log("0xtoken");
    matching.topics = vec![transfer_topic.clone()];
    let mut other = sample_log("0xother");
    other.topics = vec!["0xsomethingelse".to_string()];

    let receipt = lumen_core::types::Receipt {
        block_hash: "0xbh1".into(),
        block_number: "0x1".into(),
        status: "0x1".into(),
        transaction_hash: "0xth1".into(),
        logs: vec![matching, other],
        ..lumen_core::types::Receipt::default()
    };
    let rpc = Arc::new(ScriptedRpc::new(3).with_receipts(vec![receipt]));

    let processor = Arc::new(Processor::new());
    processor
        .add_chain(
            chain("592", "Astar", rpc.clone()),
            Options {
                range_size: 1,
                fetcher_concurrency: 2,
                fetch_mode: FetchMode::Receipts,
                topics: vec!["Transfer(address,address,uint256)".to_string()],
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

    // Three blocks, one matching log per block; the non-matching log is
    // filtered out locally.
    let logs = collect_logs(&mut logs_rx, 3, Duration::from_secs(5)).await;
    for log in &logs {
        assert_eq!(log.address, "0xtoken");
        assert_eq!(log.topics[0], transfer_topic);
    }
    assert_stream_quiet(&mut logs_rx, Duration::from_millis(200)).await;
    assert_eq!(rpc.get_receipts_calls(), 3);

    shutdown.cancel();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn empty_chain_idles_without_emitting() {
    // head == 0: nothing to index.
    let rpc = Arc::new(ScriptedRpc::new(0).with_logs(vec![sample_log("0xabc")]));

    let processor = Arc::new(Processor::new());
    processor
        .add_chain(chain("1", "Ethereum", rpc.clone()), fast_options())
        .unwrap();

    let mut logs_rx = processor.logs("1").unwrap();
    let shutdown = CancellationToken::new();
    let run = tokio::spawn({
        let processor = Arc::clone(&processor);
        let shutdown = shutdown.clone();
        async move { processor.run(shutdown).await }
    });

    assert_stream_quiet(&mut logs_rx, Duration::from_millis(200)).await;
    assert_eq!(processor.cursor("1").unwrap(), 0);
    // The runner kept polling the head instead of spinning on ranges.
    assert!(rpc.head_calls() >= 1);
    assert_eq!(rpc.get_logs_calls(), 0);

    shutdown.cancel();
    assert!(run.await.unwrap().is_ok());
}
