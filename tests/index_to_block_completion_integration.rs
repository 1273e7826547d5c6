//! End-to-end: `index_to_block` drains through its target inclusive,
//! emits exactly one `progress` and one `stopped` signal, and resolves
//! its future; calling `stop()` afterward is then a state-transition
//! error since the engine has already reached `stopped`.

mod common;

use alloy::primitives::Address;

use chain_indexer::error::{DomainError, IndexerError};
use chain_indexer::indexer::{IndexerConfig, Signal};
use chain_indexer::ports::rpc::mocks::{LogsResponse, MockRpcClient};
use chain_indexer::types::{BlockNumber, SubscribeOptions, ToBlock};

use common::{build_indexer, transfer_log};

#[tokio::test]
async fn completion_resolves_once_and_stop_after_is_an_error() {
    tracing_subscriber::fmt::try_init().ok();

    let address = Address::repeat_byte(0x42);
    let rpc = MockRpcClient::new(50);
    rpc.script_range(0, 50, LogsResponse::Ok(vec![transfer_log(address, 50, 0)]));

    let indexer = build_indexer(rpc, IndexerConfig::default());
    indexer
        .subscribe_to_contract(SubscribeOptions::new("Erc20", address))
        .await
        .unwrap();

    let mut signals = indexer.subscribe_events();

    indexer
        .index_to_block(ToBlock::Number(BlockNumber::new(50)))
        .await
        .unwrap();

    let mut progress_count = 0;
    let mut stopped_count = 0;
    while let Ok(signal) = signals.try_recv() {
        match signal {
            Signal::Progress(p) => {
                progress_count += 1;
                assert_eq!(p.current_block.value(), 50);
            }
            Signal::Stopped => stopped_count += 1,
            Signal::Started | Signal::Error(_) => {}
        }
    }
    assert_eq!(progress_count, 1);
    assert_eq!(stopped_count, 1);

    let result = indexer.stop().await;
    assert!(matches!(
        result,
        Err(IndexerError::Domain(DomainError::InvalidStateTransition { .. }))
    ));
}
