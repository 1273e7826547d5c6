//! Port definitions for dependency injection and testability.
//!
//! Ports are trait definitions that describe what the engine needs from its
//! external collaborators. Following hexagonal architecture, adapters
//! (supplied by the embedding application) implement these traits to
//! provide concrete functionality; the engine itself never depends on a
//! concrete RPC, cache, store, ABI, or logging backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Engine                                  │
//! │                                                                 │
//! │  Uses ports (traits) to define what it needs                   │
//! │                                                                 │
//! │  ┌──────────┐  ┌───────┐  ┌─────────────────┐  ┌──────────┐   │
//! │  │ RpcClient│  │ Cache │  │SubscriptionStore│  │AbiRegistry│   │
//! │  └────┬─────┘  └───┬───┘  └────────┬────────┘  └────┬─────┘   │
//! └───────┼────────────┼───────────────┼────────────────┼─────────┘
//!         ▼            ▼               ▼                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │               Adapters (supplied by the embedder)                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Port Categories
//!
//! | Category | Port | Purpose |
//! |----------|------|---------|
//! | Chain access | [`RpcClient`] | `getLogs`, `eth_call`, chain head |
//! | Caching | [`Cache`] | Log-range and call-result caching |
//! | Persistence | [`SubscriptionStore`] | Subscription cursor durability |
//! | Decoding | [`AbiRegistry`] | ABI encode/decode |
//! | Observability | [`Logger`] | Structured logging |
//!
//! # Usage
//!
//! ```ignore
//! use chain_indexer::ports::{RpcClient, Cache};
//!
//! // Engine code depends on traits, not implementations
//! async fn fetch_head<R: RpcClient>(rpc: &R) -> Result<BlockNumber, RpcError> {
//!     rpc.get_last_block_number().await
//! }
//!
//! // Tests use the in-memory mocks shipped alongside each port
//! let rpc = chain_indexer::ports::rpc::mocks::MockRpcClient::new(100);
//! ```

pub mod abi;
pub mod cache;
pub mod logger;
pub mod rpc;
pub mod store;

pub use abi::AbiRegistry;
pub use cache::Cache;
pub use logger::{Level, Logger, NullLogger, TracingLogger};
pub use rpc::{ConcurrencyLimitedRpcClient, RetryConfig, RpcClient};
pub use store::SubscriptionStore;
