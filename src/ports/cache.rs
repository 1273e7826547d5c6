//! Cache port (§3, §6.2): the engine's abstract view of the log-range and
//! call-result cache. Persistence strategy is the cache backend's concern;
//! the engine only needs to express "what range do you already have" and
//! "here's what I fetched".

use alloy::primitives::{Address, B256, Bytes};
use async_trait::async_trait;

use crate::error::CacheError;
use crate::types::{BlockNumber, ChainId, Log};

// ═══════════════════════════════════════════════════════════════════════════════
// LOG RANGE CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Key identifying a log-range cache entry (§3).
///
/// `topic0` is always `None` when the planner queries the cache (§4.F
/// "Cache-through read"): the cache is consulted per-address over the
/// whole range, and topic filtering happens inside the cache if it
/// supports it, or is done by the planner on the returned logs otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRangeKey {
    /// Chain this cache entry belongs to.
    pub chain_id: ChainId,
    /// Contract address.
    pub address: Address,
    /// Reserved for cache backends that index by topic0; the planner
    /// always queries with `None` (see module docs).
    pub topic0: Option<B256>,
    /// Inclusive lower bound of the requested range.
    pub from_block: BlockNumber,
    /// Inclusive upper bound of the requested range.
    pub to_block: BlockNumber,
}

/// A cache's answer to a log-range query (§3, §4.F "Cache-through read").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRangeAnswer {
    /// The cache has nothing for this range.
    Miss,
    /// The cache has logs covering `[covered_from, covered_to]`, a
    /// sub-range of the request (`from_block <= covered_from <= covered_to
    /// <= to_block`). The caller still needs to fetch
    /// `[from_block, covered_from - 1]` and `[covered_to + 1, to_block]`.
    Covered {
        /// Inclusive lower bound of the covered sub-range.
        covered_from: BlockNumber,
        /// Inclusive upper bound of the covered sub-range.
        covered_to: BlockNumber,
        /// Logs within the covered sub-range.
        logs: Vec<Log>,
    },
}

/// Cache port covering both cache entities described in §3: the log-range
/// store (K's primary role) and the call-result store (backing §4.C's
/// cache-through `readContract`).
#[async_trait]
pub trait Cache: Send + Sync {
    /// Query cached logs for `key`. See [`LogRangeAnswer`] for the
    /// contract a partial hit must satisfy.
    async fn get_logs(&self, key: &LogRangeKey) -> Result<LogRangeAnswer, CacheError>;

    /// Insert `logs` for the exact range `[key.from_block, key.to_block]`.
    /// Called after a successful RPC fetch, keyed by the range actually
    /// requested (§4.F "insert result into cache keyed by the exact
    /// requested range").
    async fn put_logs(&self, key: &LogRangeKey, logs: &[Log]) -> Result<(), CacheError>;

    /// Look up a cached call result (§4.C step 2).
    async fn get_call_result(&self, key: &CallResultKey) -> Result<Option<Bytes>, CacheError>;

    /// Cache a call result (§4.C step 3). Never called after a failed RPC
    /// call (§4.C: "the cache is never written on failure").
    async fn put_call_result(&self, key: &CallResultKey, result: &Bytes) -> Result<(), CacheError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALL RESULT CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Key identifying a call-result cache entry (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallResultKey {
    /// Chain this cache entry belongs to.
    pub chain_id: ChainId,
    /// Contract address called.
    pub address: Address,
    /// Function name called.
    pub function_name: String,
    /// Height the call was made at.
    pub block_number: BlockNumber,
    /// The encoded call data (part of the key since different args
    /// produce different results at the same height).
    pub data: Bytes,
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! In-memory cache for tests, with instrumented hit/miss counters.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use alloy::primitives::{Address, B256};

    use super::{Bytes, Cache, CacheError, CallResultKey, Log, LogRangeAnswer, LogRangeKey};

    /// A simple in-memory cache keyed by the exact range it was written
    /// with. Looking up `[f, t]` only hits when some previously-written
    /// range exactly equals, or is a superset of, `[f, t]` — real cache
    /// backends may be smarter (merging adjacent writes), but planner
    /// correctness must not depend on that, so the mock deliberately keeps
    /// the simplest possible behavior.
    #[derive(Debug, Default)]
    pub struct MockCache {
        log_ranges: Mutex<HashMap<(Address, Option<B256>), Vec<StoredRange>>>,
        call_results: Mutex<HashMap<CallResultKey, Bytes>>,
        /// Number of `get_logs` calls that found a covering range.
        pub hits: AtomicU64,
        /// Number of `get_logs` calls that found nothing.
        pub misses: AtomicU64,
    }

    #[derive(Debug, Clone)]
    struct StoredRange {
        from: u64,
        to: u64,
        logs: Vec<Log>,
    }

    impl MockCache {
        /// Create an empty mock cache.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait::async_trait]
    impl Cache for MockCache {
        async fn get_logs(&self, key: &LogRangeKey) -> Result<LogRangeAnswer, CacheError> {
            let ranges = self
                .log_ranges
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let Some(entries) = ranges.get(&(key.address, key.topic0)) else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(LogRangeAnswer::Miss);
            };

            let (from, to) = (key.from_block.value(), key.to_block.value());
            // Find a stored range overlapping the request; prefer one that
            // covers the request exactly or is contained within it.
            for range in entries {
                let overlap_from = range.from.max(from);
                let overlap_to = range.to.min(to);
                if overlap_from > overlap_to {
                    continue;
                }
                self.hits.fetch_add(1, Ordering::Relaxed);
                let logs = range
                    .logs
                    .iter()
                    .filter(|l| {
                        let b = l.block_number.value();
                        b >= overlap_from && b <= overlap_to
                    })
                    .cloned()
                    .collect();
                return Ok(LogRangeAnswer::Covered {
                    covered_from: crate::types::BlockNumber::new(overlap_from),
                    covered_to: crate::types::BlockNumber::new(overlap_to),
                    logs,
                });
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            Ok(LogRangeAnswer::Miss)
        }

        async fn put_logs(&self, key: &LogRangeKey, logs: &[Log]) -> Result<(), CacheError> {
            let mut ranges = self
                .log_ranges
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            ranges
                .entry((key.address, key.topic0))
                .or_default()
                .push(StoredRange {
                    from: key.from_block.value(),
                    to: key.to_block.value(),
                    logs: logs.to_vec(),
                });
            Ok(())
        }

        async fn get_call_result(&self, key: &CallResultKey) -> Result<Option<Bytes>, CacheError> {
            Ok(self
                .call_results
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(key)
                .cloned())
        }

        async fn put_call_result(
            &self,
            key: &CallResultKey,
            result: &Bytes,
        ) -> Result<(), CacheError> {
            self.call_results
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key.clone(), result.clone());
            Ok(())
        }
    }
}
