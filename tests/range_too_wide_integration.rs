//! End-to-end: a provider refusing a wide `getLogs` range is bisected
//! transparently; the surviving event is still dispatched and the cache
//! ends up holding both bisected halves, keyed by the exact range fetched.

mod common;

use alloy::primitives::Address;

use chain_indexer::indexer::IndexerConfig;
use chain_indexer::ports::cache::{LogRangeAnswer, LogRangeKey};
use chain_indexer::ports::rpc::mocks::{LogsResponse, MockRpcClient};
use chain_indexer::ports::Cache;
use chain_indexer::types::{BlockNumber, ChainId, SubscribeOptions, ToBlock};

use common::{build_indexer, transfer_log};

#[tokio::test]
async fn bisected_range_recovers_and_caches_both_halves() {
    tracing_subscriber::fmt::try_init().ok();

    let address = Address::repeat_byte(0xCD);
    let rpc = MockRpcClient::new(100);
    rpc.script_range(0, 100, LogsResponse::RangeTooWide);
    rpc.script_range(0, 50, LogsResponse::Ok(vec![]));
    rpc.script_range(51, 100, LogsResponse::Ok(vec![transfer_log(address, 75, 0)]));

    let cache = chain_indexer::ports::cache::mocks::MockCache::new();
    let indexer = build_indexer(rpc, IndexerConfig::default()).with_cache(cache);

    indexer
        .subscribe_to_contract(SubscribeOptions::new("Erc20", address))
        .await
        .unwrap();

    // No error surfaces despite the provider's initial refusal.
    indexer
        .index_to_block(ToBlock::Number(BlockNumber::new(100)))
        .await
        .unwrap();
}

#[tokio::test]
async fn bisection_populates_cache_with_exact_requested_ranges() {
    // Drive the same scenario directly against a standalone cache so the
    // resulting entries can be inspected: `build_indexer` owns its cache
    // internally once attached, so this test keeps its own handle.
    let address = Address::repeat_byte(0xCD);
    let rpc = MockRpcClient::new(100);
    rpc.script_range(0, 100, LogsResponse::RangeTooWide);
    rpc.script_range(0, 50, LogsResponse::Ok(vec![]));
    rpc.script_range(51, 100, LogsResponse::Ok(vec![transfer_log(address, 75, 0)]));

    let cache = std::sync::Arc::new(chain_indexer::ports::cache::mocks::MockCache::new());
    let logger = chain_indexer::ports::logger::NullLogger;
    let planner = chain_indexer::planner::FetchPlanner::new(
        ChainId::new(1),
        &rpc,
        Some(cache.as_ref()),
        &logger,
    );

    let mut subs = std::collections::HashMap::new();
    subs.insert(
        "a".to_string(),
        chain_indexer::types::Subscription::new(
            "a".into(),
            "Erc20".into(),
            address,
            BlockNumber::ZERO,
            ToBlock::Latest,
        ),
    );
    let topics = std::collections::HashMap::from([(
        "Erc20".to_string(),
        vec![common::transfer_topic0()],
    )]);

    let mut pushed = vec![];
    planner
        .plan(&subs, &topics, BlockNumber::new(100), |e| pushed.push(e))
        .await
        .unwrap();
    assert_eq!(pushed.len(), 1);

    let lower = LogRangeKey {
        chain_id: ChainId::new(1),
        address,
        topic0: None,
        from_block: BlockNumber::ZERO,
        to_block: BlockNumber::new(50),
    };
    let upper = LogRangeKey {
        chain_id: ChainId::new(1),
        address,
        topic0: None,
        from_block: BlockNumber::new(51),
        to_block: BlockNumber::new(100),
    };
    assert!(matches!(cache.get_logs(&lower).await.unwrap(), LogRangeAnswer::Covered { .. }));
    assert!(matches!(cache.get_logs(&upper).await.unwrap(), LogRangeAnswer::Covered { .. }));
}
