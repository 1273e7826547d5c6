//! chain-indexer
//!
//! An embeddable blockchain log indexing engine: it follows a set of
//! smart-contract addresses on a single chain, retrieves their event logs
//! (and, on demand, contract-state reads), deduplicates and caches them, and
//! delivers decoded events to user-supplied handlers in a strict,
//! reproducible order.
//!
//! # Architecture
//!
//! The core is a small state machine plus a streaming merge, built against
//! five trait ports an embedding application supplies: the RPC transport,
//! the cache, the subscription store, the ABI registry, and the logger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          INDEXER CORE                            │
//! │                                                                   │
//! │   ┌────────────────┐   ┌─────────────┐   ┌───────────────────┐  │
//! │   │ Fetch Planner  │──▶│ Event Queue │──▶│  Event Processor   │  │
//! │   │ (range-split,  │   │ (ordered by │   │ (dedup, decode,    │  │
//! │   │  cache-through)│   │  block/log) │   │  dispatch, cursors)│  │
//! │   └───────┬────────┘   └─────────────┘   └─────────┬──────────┘  │
//! │           │                                         │             │
//! │           ▼                                         ▼             │
//! │   ┌────────────────┐                       ┌───────────────────┐ │
//! │   │ Contract Reader│                       │   Event Emitter   │ │
//! │   │ (cache-through │                       │ (signals, handler │ │
//! │   │  readContract) │                       │   registry)       │ │
//! │   └────────────────┘                       └───────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                  ▲              ▲              ▲            ▲
//!                  │              │              │            │
//!             RpcClient         Cache    SubscriptionStore  AbiRegistry
//!          (adapter supplied by the embedding application)
//! ```
//!
//! # Modules
//!
//! - [`types`] — domain types: block height, logs, decoded events,
//!   subscriptions.
//! - [`error`] — the layered error hierarchy (`DomainError`, `InfraError`,
//!   `IndexerError`).
//! - [`ports`] — trait definitions for the engine's external collaborators,
//!   each with a `mocks` submodule for tests.
//! - [`queue`] — the cross-subscription ordering priority queue.
//! - [`planner`] — the per-subscription fetch planner and its range-split
//!   logic.
//! - [`indexer`] — the state machine, poll loop, event processor, contract
//!   reader, and event emitter.
//! - [`config`] — settings loading for an embedding application (polling
//!   interval, RPC concurrency/retry, log level).
//!
//! # Getting started
//!
//! ```ignore
//! use chain_indexer::indexer::{Indexer, IndexerConfig};
//! use chain_indexer::types::{ChainId, SubscribeOptions};
//!
//! let indexer = Indexer::new(ChainId::new(1), rpc, abi, logger, IndexerConfig::default(), ())
//!     .with_cache(cache)
//!     .with_store(store);
//!
//! indexer
//!     .subscribe_to_contract(SubscribeOptions::new("Erc20", token_address))
//!     .await?;
//!
//! indexer.on_event(handler);
//! indexer.watch().await?;
//! ```

pub mod config;
pub mod error;
pub mod indexer;
pub mod planner;
pub mod ports;
pub mod queue;
pub mod types;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string.
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
        assert!(version().starts_with("0."));
    }
}
