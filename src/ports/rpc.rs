//! RPC client port (§6.1): the engine's abstract view of the JSON-RPC
//! transport. Framing, retry backoff, and concurrency limiting are the
//! transport's concern, not the engine's — this trait only states what
//! operations the engine needs and what they can fail with.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::RpcError;
use crate::types::{BlockNumber, Log, LogFilter};

// ═══════════════════════════════════════════════════════════════════════════════
// RPC CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A call to `readContract` / `eth_call` at a specific height (§4.C, §6.1).
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Function name, used by the ABI registry to encode/decode; the RPC
    /// client itself only needs the already-encoded `data`.
    pub function_name: String,
    /// Contract address to call.
    pub address: Address,
    /// ABI-encoded call data.
    pub data: Bytes,
    /// Height to call at.
    pub block_number: BlockNumber,
}

/// Abstract JSON-RPC operations the engine consumes (§6.1).
///
/// All methods are failable. Implementations are expected to retry
/// transient failures internally (the spec's "standard transport retries
/// transient failures up to 5 times with 1s delay") and must signal
/// [`RpcError::RangeTooWide`] — not retried — when the provider refuses a
/// `getLogs` range, so the fetch planner can bisect it (§4.F).
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// The current chain head.
    async fn get_last_block_number(&self) -> Result<BlockNumber, RpcError>;

    /// Fetch logs matching `filter`. Implementations must map provider
    /// range-refusal errors (see [`is_range_too_wide_message`]) to
    /// [`RpcError::RangeTooWide`] rather than [`RpcError::Other`].
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError>;

    /// Execute a read-only contract call at a specific height.
    async fn read_contract(&self, call: &ContractCall) -> Result<Bytes, RpcError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// RANGE-TOO-WIDE DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Provider error-message fragments known to indicate a range-too-wide
/// refusal (§6.1, §GLOSSARY). Extensible: embedding applications that hit a
/// provider phrased differently can pass their own list to
/// [`is_range_too_wide_message`] instead of forking this one.
pub const DEFAULT_RANGE_TOO_WIDE_MARKERS: &[&str] = &[
    "query returned more than",
    "log response size exceeded",
];

/// Whether `message` looks like a provider's range-too-wide refusal,
/// matched case-insensitively against `markers`.
///
/// This is a thin, testable seam: real providers phrase the refusal many
/// different ways (Alchemy, Infura, Ankr, QuickNode all differ), so the
/// engine never hardcodes a single string match — it takes the marker list
/// as a parameter instead.
#[must_use]
pub fn is_range_too_wide_message(message: &str, markers: &[&str]) -> bool {
    let lower = message.to_lowercase();
    markers.iter().any(|m| lower.contains(&m.to_lowercase()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONCURRENCY-LIMITED TRANSPORT (§5 "RPC concurrency")
// ═══════════════════════════════════════════════════════════════════════════════

/// Retry policy for transient failures (§6.1: "the standard transport
/// retries transient failures up to 5 times with 1 s delay").
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum retry attempts after the first failed call.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// A concurrency-limiting, retrying decorator over any [`RpcClient`] (§5:
/// "a concurrency-limiting wrapper (default bound 5) around the raw RPC
/// transport"). This is a property of the transport, not the engine: the
/// planner may still issue several concurrent calls, but this wrapper caps
/// how many are in flight at once and retries transient failures before
/// giving up.
///
/// [`RpcError::RangeTooWide`] is never retried (§6.1: "range-too-wide is
/// not retried and propagates as a distinct error so the planner can
/// split") — it is returned to the caller on the first occurrence.
pub struct ConcurrencyLimitedRpcClient<T> {
    inner: T,
    semaphore: Arc<Semaphore>,
    retry: RetryConfig,
}

impl<T> ConcurrencyLimitedRpcClient<T> {
    /// Wrap `inner`, allowing at most `concurrency` calls in flight at
    /// once, with the default retry policy (5 retries, 1 s delay).
    #[must_use]
    pub fn new(inner: T, concurrency: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl<T: RpcClient> RpcClient for ConcurrencyLimitedRpcClient<T> {
    async fn get_last_block_number(&self) -> Result<BlockNumber, RpcError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        let mut attempt = 0;
        loop {
            match self.inner.get_last_block_number().await {
                Ok(v) => return Ok(v),
                Err(err) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        let mut attempt = 0;
        loop {
            match self.inner.get_logs(filter).await {
                Ok(v) => return Ok(v),
                // Never retried: the planner bisects instead (§4.F).
                Err(err @ RpcError::RangeTooWide(_)) => return Err(err),
                Err(err) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<Bytes, RpcError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        let mut attempt = 0;
        loop {
            match self.inner.read_contract(call).await {
                Ok(v) => return Ok(v),
                Err(err) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock RPC client for tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::{Bytes, ContractCall};
    use crate::error::RpcError;
    use crate::types::{BlockNumber, Log, LogFilter};

    /// A scripted response to a single `get_logs` call.
    #[derive(Debug, Clone)]
    pub enum LogsResponse {
        /// Return these logs.
        Ok(Vec<Log>),
        /// Fail with range-too-wide.
        RangeTooWide,
        /// Fail with a generic error.
        Err(String),
    }

    /// A scripted, call-order-independent mock RPC client.
    ///
    /// Responses for `get_logs` are matched by exact `(from, to)` range so
    /// tests can script bisection without worrying about call order;
    /// unmatched ranges panic with a descriptive message to surface test
    /// bugs immediately rather than silently returning empty results.
    #[derive(Debug, Default)]
    pub struct MockRpcClient {
        last_block: Mutex<BlockNumber>,
        logs_by_range: Mutex<std::collections::HashMap<(u64, u64), LogsResponse>>,
        call_results: Mutex<std::collections::HashMap<String, Bytes>>,
        /// Every `get_logs` call observed, for assertions.
        pub calls: Mutex<VecDeque<(u64, u64)>>,
    }

    impl MockRpcClient {
        /// Create a mock with a given chain head.
        #[must_use]
        pub fn new(last_block: u64) -> Self {
            Self {
                last_block: Mutex::new(BlockNumber::new(last_block)),
                ..Self::default()
            }
        }

        /// Script a response for the exact range `[from, to]`.
        pub fn script_range(&self, from: u64, to: u64, response: LogsResponse) {
            self.logs_by_range
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert((from, to), response);
        }

        /// Script a `read_contract` result keyed by function name.
        pub fn script_call(&self, function_name: &str, result: Bytes) {
            self.call_results
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(function_name.to_string(), result);
        }

        /// Advance the chain head returned by `get_last_block_number`.
        pub fn set_last_block(&self, n: u64) {
            *self
                .last_block
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = BlockNumber::new(n);
        }
    }

    #[async_trait::async_trait]
    impl super::RpcClient for MockRpcClient {
        async fn get_last_block_number(&self) -> Result<BlockNumber, RpcError> {
            Ok(*self
                .last_block
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner))
        }

        async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
            let from = filter.from_block.value();
            let to = match filter.to_block {
                crate::types::ToBlock::Number(n) => n.value(),
                crate::types::ToBlock::Latest => {
                    self.get_last_block_number().await?.value()
                }
            };
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push_back((from, to));

            let responses = self
                .logs_by_range
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match responses.get(&(from, to)) {
                Some(LogsResponse::Ok(logs)) => Ok(logs.clone()),
                Some(LogsResponse::RangeTooWide) => {
                    Err(RpcError::RangeTooWide(format!(
                        "query returned more than 10000 results for range [{from}, {to}]"
                    )))
                }
                Some(LogsResponse::Err(msg)) => Err(RpcError::Other(msg.clone().into())),
                None => panic!("MockRpcClient: no scripted response for range [{from}, {to}]"),
            }
        }

        async fn read_contract(&self, call: &ContractCall) -> Result<Bytes, RpcError> {
            self.call_results
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(&call.function_name)
                .cloned()
                .ok_or_else(|| {
                    RpcError::Other(
                        format!("no scripted result for function {}", call.function_name).into(),
                    )
                })
        }
    }

    impl std::fmt::Debug for LogsResponse {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Ok(logs) => f.debug_tuple("Ok").field(&logs.len()).finish(),
                Self::RangeTooWide => write!(f, "RangeTooWide"),
                Self::Err(m) => f.debug_tuple("Err").field(m).finish(),
            }
        }
    }

}
