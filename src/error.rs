//! Layered error types for the chain indexer.
//!
//! - [`DomainError`] — synchronous configuration errors (unknown level,
//!   unknown contract name), raised at the call site.
//! - [`InfraError`] — errors from the external collaborators the engine
//!   consumes through ports (RPC, cache, subscription store, ABI codec).
//! - [`IndexerError`] — the error type surfaced through the engine's public
//!   API (the `error` signal, the `index_to_block` completion).
//!
//! # Error Philosophy
//!
//! Range-too-wide is deliberately absent from this hierarchy: the fetch
//! planner recovers from it locally (§4.F) and it never escapes the
//! planner. Decode failures are logged and skipped by the processor (§4.P)
//! and likewise never become an `IndexerError`.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Synchronous configuration errors raised at the call site.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DomainError {
    /// `Logger` was constructed with an out-of-range level threshold.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    /// `subscribe_to_contract` named a contract absent from the ABI registry.
    #[error("unknown contract: {0}")]
    UnknownContract(String),

    /// A method was called while the indexer was in the wrong state
    /// (e.g. `stop()` while not `running`).
    #[error("invalid state transition: {action} while {state}")]
    InvalidStateTransition {
        /// The method that was called.
        action: String,
        /// The state the indexer was actually in.
        state: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFRASTRUCTURE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by the RPC client port (§6.1).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcError {
    /// The provider refused to serve the requested block range. Recovered
    /// locally by the fetch planner via bisection (§4.F); never propagates
    /// past the planner.
    #[error("range too wide: {0}")]
    RangeTooWide(String),

    /// Any other RPC failure, after the transport's own retries (if any)
    /// are exhausted.
    #[error("rpc error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors surfaced by the cache port (§6.2).
#[derive(Debug, Error)]
#[error("cache error: {0}")]
pub struct CacheError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Errors surfaced by the subscription store port (§6.3).
#[derive(Debug, Error)]
#[error("subscription store error: {0}")]
pub struct StoreError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Errors surfaced by the ABI registry port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AbiError {
    /// `decode_event` was asked to decode a log whose topic0 matches no
    /// known event on the contract, or whose data could not be decoded.
    #[error("event decode failed: {0}")]
    DecodeFailed(String),

    /// The contract name has no entry in the registry.
    #[error("unknown contract: {0}")]
    UnknownContract(String),
}

/// Infrastructure-level errors from the engine's external collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfraError {
    /// RPC client failure.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Subscription store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// ABI registry failure.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// A handler invoked during event dispatch returned an error.
    #[error("handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOP-LEVEL ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// The error type surfaced through the engine's public API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndexerError {
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Infrastructure error.
    #[error(transparent)]
    Infra(#[from] InfraError),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, IndexerError>;

impl From<RpcError> for IndexerError {
    fn from(err: RpcError) -> Self {
        Self::Infra(InfraError::Rpc(err))
    }
}

impl From<CacheError> for IndexerError {
    fn from(err: CacheError) -> Self {
        Self::Infra(InfraError::Cache(err))
    }
}

impl From<StoreError> for IndexerError {
    fn from(err: StoreError) -> Self {
        Self::Infra(InfraError::Store(err))
    }
}

impl From<AbiError> for IndexerError {
    fn from(err: AbiError) -> Self {
        Self::Infra(InfraError::Abi(err))
    }
}
