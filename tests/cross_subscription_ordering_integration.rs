//! End-to-end: two subscriptions with events at the same block dispatch
//! in `(blockNumber, logIndex, subscriptionId)` order, not per-subscription
//! or arrival order.

mod common;

use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use async_trait::async_trait;

use chain_indexer::error::IndexerError;
use chain_indexer::indexer::{EngineHandle, EventHandler, IndexerConfig};
use chain_indexer::ports::abi::mocks::MockAbiRegistry;
use chain_indexer::ports::cache::mocks::MockCache;
use chain_indexer::ports::logger::NullLogger;
use chain_indexer::ports::rpc::mocks::{LogsResponse, MockRpcClient};
use chain_indexer::types::{BlockNumber, Event, SubscribeOptions, ToBlock};

use common::{build_indexer, transfer_log};

struct RecordingHandler(Arc<Mutex<Vec<(String, u64, u64)>>>);

#[async_trait]
impl EventHandler<MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()> for RecordingHandler {
    async fn handle(
        &self,
        event: &Event,
        _handle: &mut EngineHandle<'_, MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()>,
    ) -> Result<(), IndexerError> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((
                event.subscription_id.clone(),
                event.log.block_number.value(),
                event.log.log_index,
            ));
        Ok(())
    }
}

#[tokio::test]
async fn ties_on_block_break_on_subscription_id() {
    tracing_subscriber::fmt::try_init().ok();

    let address_a = Address::repeat_byte(0x11);
    let address_b = Address::repeat_byte(0x22);
    let rpc = MockRpcClient::new(100);
    // Subscription "a" follows latest: its effective range is [0, 100].
    rpc.script_range(
        0,
        100,
        LogsResponse::Ok(vec![
            transfer_log(address_a, 10, 0),
            transfer_log(address_a, 10, 1),
        ]),
    );
    // Subscription "b" has a concrete upper bound of 50: a distinct
    // range from "a"'s, so the scripted mock can answer them differently.
    rpc.script_range(0, 50, LogsResponse::Ok(vec![transfer_log(address_b, 10, 0)]));

    let indexer = build_indexer(rpc, IndexerConfig::default());
    indexer
        .subscribe_to_contract(SubscribeOptions::new("Erc20", address_a).with_id("a"))
        .await
        .unwrap();
    indexer
        .subscribe_to_contract(
            SubscribeOptions::new("Erc20", address_b)
                .with_id("b")
                .to_block(ToBlock::Number(BlockNumber::new(50))),
        )
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    indexer.on_event(Arc::new(RecordingHandler(seen.clone())));

    indexer
        .index_to_block(ToBlock::Number(BlockNumber::new(100)))
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
        vec![
            ("a".to_string(), 10, 0),
            ("b".to_string(), 10, 0),
            ("a".to_string(), 10, 1),
        ]
    );
}
