//! Fetch planner (§4.F `getSubscriptionEvents`): per-subscription log
//! fetching with cache-aware range splitting and adaptive bisection on
//! range-too-wide.

use std::collections::HashMap;

use crate::error::{IndexerError, RpcError};
use crate::ports::cache::{Cache, LogRangeAnswer, LogRangeKey};
use crate::ports::logger::{Level, Logger};
use crate::ports::rpc::{DEFAULT_RANGE_TOO_WIDE_MARKERS, RpcClient, is_range_too_wide_message};
use crate::types::{BlockNumber, ChainId, LogFilter, PendingEvent, Subscription};

/// Dependencies the planner needs for a single invocation, bundled so
/// callers don't have to thread five parameters through every recursive
/// call.
pub struct FetchPlanner<'a, R, C, L> {
    chain_id: ChainId,
    rpc: &'a R,
    cache: Option<&'a C>,
    logger: &'a L,
    range_too_wide_markers: &'a [&'a str],
}

impl<'a, R, C, L> FetchPlanner<'a, R, C, L>
where
    R: RpcClient,
    C: Cache,
    L: Logger,
{
    /// Build a planner for one poll tick.
    pub const fn new(chain_id: ChainId, rpc: &'a R, cache: Option<&'a C>, logger: &'a L) -> Self {
        Self {
            chain_id,
            rpc,
            cache,
            logger,
            range_too_wide_markers: DEFAULT_RANGE_TOO_WIDE_MARKERS,
        }
    }

    /// Use a custom range-too-wide marker list instead of the default
    /// (§6.1 "implementations may extend this list").
    #[must_use]
    pub const fn with_range_too_wide_markers(mut self, markers: &'a [&'a str]) -> Self {
        self.range_too_wide_markers = markers;
        self
    }

    /// Plan and fetch events for every subscription in `subscriptions`
    /// whose `fetched_to_block < min(target_block, to_block)`, pushing
    /// results into `push_event`.
    ///
    /// # Errors
    /// Propagates any RPC or cache error other than range-too-wide, which
    /// is handled internally via bisection.
    pub async fn plan(
        &self,
        subscriptions: &HashMap<String, Subscription>,
        topic0_by_contract: &HashMap<String, Vec<alloy::primitives::B256>>,
        target_block: BlockNumber,
        mut push_event: impl FnMut(PendingEvent),
    ) -> Result<(), IndexerError> {
        for sub in subscriptions.values() {
            let effective_target = sub.to_block.resolve(target_block);
            let already_fetched = sub.fetched_to_block.map_or(BlockNumber::ZERO, |b| b.next());

            let f = sub.from_block.max(already_fetched);
            let t = effective_target;
            if f.value() > t.value() {
                continue;
            }

            let topic0_hashes = topic0_by_contract
                .get(&sub.contract_name)
                .cloned()
                .unwrap_or_default();

            self.fetch_range(sub, &topic0_hashes, f, t, &mut push_event)
                .await?;
        }
        Ok(())
    }

    /// Cache-through read for `[from, to]` on one subscription (§4.F
    /// "Cache-through read"), recursing on partial cache hits.
    async fn fetch_range(
        &self,
        sub: &Subscription,
        topic0_hashes: &[alloy::primitives::B256],
        from: BlockNumber,
        to: BlockNumber,
        push_event: &mut impl FnMut(PendingEvent),
    ) -> Result<(), IndexerError> {
        if from.value() > to.value() {
            return Ok(());
        }

        let Some(cache) = self.cache else {
            return self
                .fetch_from_rpc(sub, topic0_hashes, from, to, push_event)
                .await;
        };

        let key = LogRangeKey {
            chain_id: self.chain_id,
            address: sub.contract_address,
            topic0: None,
            from_block: from,
            to_block: to,
        };
        let answer = cache.get_logs(&key).await.map_err(crate::error::IndexerError::from)?;

        match answer {
            LogRangeAnswer::Miss => {
                self.fetch_from_rpc(sub, topic0_hashes, from, to, push_event)
                    .await
            }
            LogRangeAnswer::Covered {
                covered_from,
                covered_to,
                logs,
            } => {
                for log in logs {
                    push_event(PendingEvent {
                        log,
                        subscription_id: sub.id.clone(),
                        contract_name: sub.contract_name.clone(),
                    });
                }
                if from.value() < covered_from.value() {
                    Box::pin(self.fetch_range(
                        sub,
                        topic0_hashes,
                        from,
                        covered_from.prev(),
                        push_event,
                    ))
                    .await?;
                }
                if covered_to.value() < to.value() {
                    Box::pin(self.fetch_range(
                        sub,
                        topic0_hashes,
                        covered_to.next(),
                        to,
                        push_event,
                    ))
                    .await?;
                }
                Ok(())
            }
        }
    }

    /// Fetch `[from, to]` from RPC, bisecting on range-too-wide (§4.F
    /// "Adaptive range splitting"), then insert the exact requested range
    /// into the cache if one is attached.
    async fn fetch_from_rpc(
        &self,
        sub: &Subscription,
        topic0_hashes: &[alloy::primitives::B256],
        from: BlockNumber,
        to: BlockNumber,
        push_event: &mut impl FnMut(PendingEvent),
    ) -> Result<(), IndexerError> {
        let filter = LogFilter::for_contract(
            sub.contract_address,
            topic0_hashes.to_vec(),
            from,
            to,
        );

        match self.rpc.get_logs(&filter).await {
            Ok(logs) => {
                if let Some(cache) = self.cache {
                    let key = LogRangeKey {
                        chain_id: self.chain_id,
                        address: sub.contract_address,
                        topic0: None,
                        from_block: from,
                        to_block: to,
                    };
                    cache
                        .put_logs(&key, &logs)
                        .await
                        .map_err(crate::error::IndexerError::from)?;
                }
                for log in logs {
                    push_event(PendingEvent {
                        log,
                        subscription_id: sub.id.clone(),
                        contract_name: sub.contract_name.clone(),
                    });
                }
                Ok(())
            }
            Err(RpcError::RangeTooWide(message)) => {
                debug_assert!(is_range_too_wide_message(&message, self.range_too_wide_markers));
                self.logger.log(
                    Level::Debug,
                    "range too wide, bisecting",
                    &[
                        ("from", &from.to_string()),
                        ("to", &to.to_string()),
                    ],
                );
                if from.value() == to.value() {
                    // A single-block range that the provider still refuses
                    // is an unrecoverable error; propagate rather than loop
                    // forever.
                    return Err(RpcError::RangeTooWide(message).into());
                }
                let mid = from.value() + (to.value() - from.value()) / 2;
                let mid = BlockNumber::new(mid);
                Box::pin(self.fetch_from_rpc(sub, topic0_hashes, from, mid, push_event)).await?;
                Box::pin(self.fetch_from_rpc(sub, topic0_hashes, mid.next(), to, push_event))
                    .await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256};

    use super::*;
    use crate::ports::cache::mocks::MockCache;
    use crate::ports::logger::NullLogger;
    use crate::ports::rpc::mocks::{LogsResponse, MockRpcClient};
    use crate::types::{Log, ToBlock};

    fn sub(id: &str, address: Address, from: u64) -> Subscription {
        Subscription::new(
            id.to_string(),
            "Erc20".into(),
            address,
            BlockNumber::new(from),
            ToBlock::Latest,
        )
    }

    fn log_at(address: Address, block: u64, idx: u64) -> Log {
        Log {
            address,
            block_hash: B256::ZERO,
            block_number: BlockNumber::new(block),
            log_index: idx,
            transaction_hash: B256::ZERO,
            transaction_index: 0,
            topics: vec![B256::repeat_byte(9)],
            data: alloy::primitives::Bytes::new(),
        }
    }

    #[tokio::test]
    async fn fresh_sync_fetches_whole_range_from_rpc() {
        let address = Address::repeat_byte(0xAB);
        let rpc = MockRpcClient::new(100);
        rpc.script_range(
            0,
            100,
            LogsResponse::Ok(vec![log_at(address, 10, 0), log_at(address, 20, 0)]),
        );
        let logger = NullLogger;
        let planner = FetchPlanner::<_, MockCache, _>::new(ChainId::new(1), &rpc, None, &logger);

        let mut subs = HashMap::new();
        subs.insert("a".to_string(), sub("a", address, 0));
        let topics = HashMap::from([("Erc20".to_string(), vec![B256::repeat_byte(9)])]);

        let mut pushed = vec![];
        planner
            .plan(&subs, &topics, BlockNumber::new(100), |e| pushed.push(e))
            .await
            .unwrap();

        assert_eq!(pushed.len(), 2);
    }

    #[tokio::test]
    async fn range_too_wide_bisects_and_recovers() {
        let address = Address::repeat_byte(0xCD);
        let rpc = MockRpcClient::new(100);
        rpc.script_range(0, 100, LogsResponse::RangeTooWide);
        rpc.script_range(0, 50, LogsResponse::Ok(vec![]));
        rpc.script_range(51, 100, LogsResponse::Ok(vec![log_at(address, 75, 0)]));
        let logger = NullLogger;
        let planner = FetchPlanner::<_, MockCache, _>::new(ChainId::new(1), &rpc, None, &logger);

        let mut subs = HashMap::new();
        subs.insert("a".to_string(), sub("a", address, 0));
        let topics = HashMap::from([("Erc20".to_string(), vec![B256::repeat_byte(9)])]);

        let mut pushed = vec![];
        planner
            .plan(&subs, &topics, BlockNumber::new(100), |e| pushed.push(e))
            .await
            .unwrap();

        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].log.block_number.value(), 75);
    }

    #[tokio::test]
    async fn cache_partial_hit_recurses_on_both_sides() {
        let address = Address::repeat_byte(0xEF);
        let rpc = MockRpcClient::new(100);
        rpc.script_range(0, 29, LogsResponse::Ok(vec![]));
        rpc.script_range(61, 100, LogsResponse::Ok(vec![log_at(address, 80, 0)]));
        let cache = MockCache::new();
        let key = LogRangeKey {
            chain_id: ChainId::new(1),
            address,
            topic0: None,
            from_block: BlockNumber::new(30),
            to_block: BlockNumber::new(60),
        };
        cache
            .put_logs(&key, &[log_at(address, 45, 0)])
            .await
            .unwrap();

        let logger = NullLogger;
        let planner = FetchPlanner::new(ChainId::new(1), &rpc, Some(&cache), &logger);

        let mut subs = HashMap::new();
        subs.insert("a".to_string(), sub("a", address, 0));
        let topics = HashMap::from([("Erc20".to_string(), vec![B256::repeat_byte(9)])]);

        let mut pushed = vec![];
        planner
            .plan(&subs, &topics, BlockNumber::new(100), |e| pushed.push(e))
            .await
            .unwrap();

        let mut blocks: Vec<u64> = pushed.iter().map(|p| p.log.block_number.value()).collect();
        blocks.sort_unstable();
        assert_eq!(blocks, vec![45, 80]);
    }

    #[tokio::test]
    async fn subscription_already_caught_up_is_skipped() {
        let address = Address::repeat_byte(0x11);
        let rpc = MockRpcClient::new(100);
        let logger = NullLogger;
        let planner = FetchPlanner::<_, MockCache, _>::new(ChainId::new(1), &rpc, None, &logger);

        let mut s = sub("a", address, 0);
        s.fetched_to_block = Some(BlockNumber::new(100));
        let mut subs = HashMap::new();
        subs.insert("a".to_string(), s);
        let topics = HashMap::new();

        let mut pushed = vec![];
        planner
            .plan(&subs, &topics, BlockNumber::new(100), |e| pushed.push(e))
            .await
            .unwrap();

        assert!(pushed.is_empty());
    }
}
