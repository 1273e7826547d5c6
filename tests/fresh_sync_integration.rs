//! End-to-end: a single fresh subscription synced to a concrete target
//! block in one tick, dispatched in block/log-index order, with exactly
//! one progress signal.

mod common;

use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use async_trait::async_trait;

use chain_indexer::error::IndexerError;
use chain_indexer::indexer::{EngineHandle, EventHandler, IndexerConfig, Signal};
use chain_indexer::ports::abi::mocks::MockAbiRegistry;
use chain_indexer::ports::cache::mocks::MockCache;
use chain_indexer::ports::logger::NullLogger;
use chain_indexer::ports::rpc::mocks::{LogsResponse, MockRpcClient};
use chain_indexer::types::{BlockNumber, Event, SubscribeOptions, ToBlock};

use common::{build_indexer, transfer_log};

struct RecordingHandler(Arc<Mutex<Vec<(u64, u64)>>>);

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
            .push((event.log.block_number.value(), event.log.log_index));
        Ok(())
    }
}

#[tokio::test]
async fn fresh_sync_dispatches_in_order_and_emits_progress_once() {
    tracing_subscriber::fmt::try_init().ok();

    let address = Address::repeat_byte(0xAB);
    let rpc = MockRpcClient::new(100);
    rpc.script_range(
        0,
        100,
        LogsResponse::Ok(vec![
            transfer_log(address, 10, 0),
            transfer_log(address, 20, 0),
            transfer_log(address, 20, 1),
        ]),
    );

    let indexer = build_indexer(rpc, IndexerConfig::default());
    indexer
        .subscribe_to_contract(SubscribeOptions::new("Erc20", address))
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    indexer.on_event(Arc::new(RecordingHandler(seen.clone())));

    let mut signals = indexer.subscribe_events();

    indexer
        .index_to_block(ToBlock::Number(BlockNumber::new(100)))
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
        vec![(10, 0), (20, 0), (20, 1)]
    );

    let mut progress_count = 0;
    let mut saw_stopped = false;
    while let Ok(signal) = signals.try_recv() {
        match signal {
            Signal::Progress(p) => {
                progress_count += 1;
                assert_eq!(p.current_block.value(), 100);
            }
            Signal::Stopped => saw_stopped = true,
            Signal::Started | Signal::Error(_) => {}
        }
    }
    assert_eq!(progress_count, 1);
    assert!(saw_stopped);
}
