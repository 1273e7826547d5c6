//! Shared test infrastructure for the end-to-end scenarios in this
//! directory: a scripted chain head, mocked ports wired the way an
//! embedding application would wire them, and small log/subscription
//! builders so each scenario file reads as the scenario rather than setup.

use alloy::primitives::{Address, B256, Bytes};

use chain_indexer::indexer::{Indexer, IndexerConfig};
use chain_indexer::ports::abi::mocks::{MockAbiRegistry, MockEventDef};
use chain_indexer::ports::cache::mocks::MockCache;
use chain_indexer::ports::logger::NullLogger;
use chain_indexer::ports::rpc::mocks::MockRpcClient;
use chain_indexer::ports::store::mocks::MockSubscriptionStore;
use chain_indexer::types::{BlockNumber, Log};

/// The `Transfer` event's scripted topic-0, shared by every scenario so
/// builders don't need to pass it around.
pub fn transfer_topic0() -> B256 {
    B256::repeat_byte(0x09)
}

/// An ABI registry declaring one contract, `"Erc20"`, with a single
/// `Transfer` event.
pub fn erc20_abi() -> MockAbiRegistry {
    MockAbiRegistry::new().with_contract(
        "Erc20",
        vec![MockEventDef {
            name: "Transfer".into(),
            topic0: transfer_topic0(),
        }],
    )
}

/// Build a `Transfer` log at `(block, log_index)` for `address`.
pub fn transfer_log(address: Address, block: u64, log_index: u64) -> Log {
    Log {
        address,
        block_hash: B256::from([block as u8; 32]),
        block_number: BlockNumber::new(block),
        log_index,
        transaction_hash: B256::repeat_byte(0xAB),
        transaction_index: 0,
        topics: vec![transfer_topic0()],
        data: Bytes::new(),
    }
}

/// The concrete indexer type every scenario in this directory drives:
/// the four in-memory mock ports plus `NullLogger`, with no user context.
pub type TestIndexer =
    Indexer<MockRpcClient, MockCache, MockSubscriptionStore, MockAbiRegistry, NullLogger, ()>;

/// Build an indexer over `rpc` with the `Erc20` ABI, no cache, no store,
/// and the default poll configuration (callers that need a fast poll
/// loop, e.g. for the replan scenario, override `config` directly).
pub fn build_indexer(rpc: MockRpcClient, config: IndexerConfig) -> TestIndexer {
    Indexer::new(
        chain_indexer::types::ChainId::new(1),
        rpc,
        erc20_abi(),
        NullLogger,
        config,
        (),
    )
}
