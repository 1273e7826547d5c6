//! Event Processor (§4.P `processEvents`): drains the queue in strict
//! cross-subscription order, dedups against each subscription's
//! watermark, decodes, and dispatches to the handler registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::IndexerError;
use crate::ports::logger::Level;
use crate::ports::{AbiRegistry, Cache, Logger, RpcClient};
use crate::queue::EventQueue;
use crate::types::{BlockNumber, Event, Subscription};

use super::contract_reader::ContractReader;
use super::emitter::{EngineHandle, EventEmitter};

/// What a completed (or early-stopped) drain leaves behind (§4.P
/// "Return").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// The watermark every subscription is known indexed through — the
    /// min `(block, logIndex)` across all subscriptions, including any
    /// added mid-drain (§9 "Cursor rewind on hasNewSubscriptions"). `None`
    /// if at least one tracked subscription (new or pre-existing) has not
    /// dispatched a single event yet.
    pub indexed_to_block: Option<BlockNumber>,
    /// Log index component of the watermark. Meaningless when
    /// `indexed_to_block` is `None`.
    pub indexed_to_log_index: u64,
    /// Whether a handler added at least one subscription during this
    /// drain, forcing it to stop early (§4.P step 6).
    pub has_new_subscriptions: bool,
}

/// Drains an [`EventQueue`] against the handler registry for one poll
/// tick (§4.P).
pub struct EventProcessor<'a, A, L> {
    abi: &'a A,
    logger: &'a L,
}

impl<'a, A, L> EventProcessor<'a, A, L>
where
    A: AbiRegistry,
    L: Logger,
{
    /// Build a processor for one poll tick.
    pub const fn new(abi: &'a A, logger: &'a L) -> Self {
        Self { abi, logger }
    }

    /// Drain `queue`, dispatching every event whose block is `<=
    /// target_block` in heap order, until the queue is exhausted, the
    /// target is passed, or a handler adds a new subscription (§4.P
    /// steps 1-6).
    ///
    /// # Errors
    /// Propagates the first handler error encountered (§7 "Handler
    /// errors"); this aborts the drain, but cursor advances already made
    /// for earlier events in this call remain committed.
    #[allow(clippy::too_many_arguments)]
    pub async fn process_events<R, C, Ctx>(
        &self,
        queue: &mut EventQueue,
        target_block: BlockNumber,
        subscriptions: &mut HashMap<String, Subscription>,
        emitter: &EventEmitter<R, C, A, L, Ctx>,
        reader: ContractReader<'_, R, C, A, L>,
        context: &Ctx,
        new_subscription_flag: &AtomicBool,
    ) -> Result<ProcessResult, IndexerError>
    where
        R: RpcClient,
        C: Cache,
        Ctx: Send + Sync,
    {
        loop {
            let Some(peeked) = queue.peek() else {
                break;
            };
            if peeked.log.block_number.value() > target_block.value() {
                break;
            }
            let pending = queue.pop().expect("just peeked");

            let Some(sub) = subscriptions.get(&pending.subscription_id) else {
                continue; // subscription no longer tracked (§4.P step 1)
            };
            let event_key = (pending.log.block_number.value(), pending.log.log_index);
            if sub.indexed_watermark().is_some_and(|wm| event_key <= wm) {
                continue; // already dispatched (§4.P step 2, dedup)
            }

            let decoded = match self.abi.decode_event(&pending.contract_name, &pending.log) {
                Ok(decoded) => decoded,
                Err(err) => {
                    self.logger.log(
                        Level::Warn,
                        "event decode failed, skipping",
                        &[
                            ("subscription", pending.subscription_id.as_str()),
                            ("error", &err.to_string()),
                        ],
                    );
                    continue; // decode errors never abort the drain (§7)
                }
            };

            let event = Event {
                log: pending.log,
                contract_name: pending.contract_name,
                decoded,
                subscription_id: pending.subscription_id,
            };

            {
                let mut handle = EngineHandle {
                    context,
                    reader,
                    subscriptions,
                    abi: self.abi,
                    new_subscription_flag,
                };
                emitter.dispatch(&event, &mut handle).await?;
            }

            if let Some(sub) = subscriptions.get_mut(&event.subscription_id) {
                sub.indexed_to_block = Some(event.log.block_number);
                sub.indexed_to_log_index = event.log.log_index;
            }

            if new_subscription_flag.load(Ordering::SeqCst) {
                break; // §4.P step 6: stop draining, force an immediate replan
            }
        }

        let has_new_subscriptions = new_subscription_flag.load(Ordering::SeqCst);
        // `None` (no subscriptions at all) falls back to the tick's target
        // so an empty subscription set still reports a concrete watermark;
        // a non-empty set where the minimum watermark is itself `None`
        // (at least one subscription hasn't dispatched anything) stays
        // `None` rather than being coerced into a fabricated real block.
        let watermark: Option<(u64, u64)> = if subscriptions.is_empty() {
            Some((target_block.value(), 0))
        } else {
            subscriptions
                .values()
                .map(Subscription::indexed_watermark)
                .min()
                .flatten()
        };

        Ok(ProcessResult {
            indexed_to_block: watermark.map(|(b, _)| BlockNumber::new(b)),
            indexed_to_log_index: watermark.map_or(0, |(_, l)| l),
            has_new_subscriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256, Bytes};

    use super::*;
    use crate::ports::abi::mocks::{MockAbiRegistry, MockEventDef};
    use crate::ports::cache::mocks::MockCache;
    use crate::ports::logger::NullLogger;
    use crate::ports::rpc::mocks::MockRpcClient;
    use crate::types::{ChainId, Log, PendingEvent, Subscription, SubscribeOptions, ToBlock};

    fn log(block: u64, idx: u64) -> Log {
        Log {
            address: Address::ZERO,
            block_hash: B256::ZERO,
            block_number: BlockNumber::new(block),
            log_index: idx,
            transaction_hash: B256::ZERO,
            transaction_index: 0,
            topics: vec![B256::repeat_byte(0xAB)],
            data: Bytes::new(),
        }
    }

    fn subscription(id: &str, from: u64) -> Subscription {
        Subscription::new(
            id.into(),
            "Erc20".into(),
            Address::ZERO,
            BlockNumber::new(from),
            ToBlock::Latest,
        )
    }

    #[tokio::test]
    async fn dedups_events_at_or_below_watermark() {
        let abi = MockAbiRegistry::new().with_contract(
            "Erc20",
            vec![MockEventDef { name: "Transfer".into(), topic0: B256::repeat_byte(0xAB) }],
        );
        let logger = NullLogger;
        let processor = EventProcessor::new(&abi, &logger);

        let mut queue = EventQueue::new();
        queue.push(PendingEvent { log: log(5, 0), subscription_id: "sub-1".into(), contract_name: "Erc20".into() });

        let mut subs = HashMap::new();
        let mut sub = subscription("sub-1", 0);
        sub.indexed_to_block = Some(BlockNumber::new(5));
        sub.indexed_to_log_index = 0; // already at (5, 0): next event must be skipped
        subs.insert("sub-1".into(), sub);

        let rpc = MockRpcClient::new(10);
        let cache = MockCache::new();
        let emitter: EventEmitter<MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()> =
            EventEmitter::new();
        let reader = ContractReader::new(ChainId::new(1), &rpc, Some(&cache), &abi, &logger);
        let flag = AtomicBool::new(false);
        let context = ();

        let result = processor
            .process_events(&mut queue, BlockNumber::new(10), &mut subs, &emitter, reader, &context, &flag)
            .await
            .unwrap();

        assert!(!result.has_new_subscriptions);
        assert_eq!(queue.len(), 0);
    }

    /// A subscription with `fromBlock = 0` starts with no watermark at
    /// all, not a watermark saturated to block `0` — otherwise a genuine
    /// event at `(0, 0)` would be indistinguishable from "already
    /// dispatched" and get silently dropped on the very first tick.
    #[tokio::test]
    async fn genesis_block_event_is_not_deduped_as_already_dispatched() {
        let abi = MockAbiRegistry::new().with_contract(
            "Erc20",
            vec![MockEventDef { name: "Transfer".into(), topic0: B256::repeat_byte(0xAB) }],
        );
        let logger = NullLogger;
        let processor = EventProcessor::new(&abi, &logger);

        let mut queue = EventQueue::new();
        queue.push(PendingEvent {
            log: log(0, 0),
            subscription_id: "sub-1".into(),
            contract_name: "Erc20".into(),
        });

        let mut subs = HashMap::new();
        subs.insert("sub-1".into(), subscription("sub-1", 0));

        let rpc = MockRpcClient::new(10);
        let cache = MockCache::new();
        let emitter: EventEmitter<MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()> =
            EventEmitter::new();
        let seen = std::sync::Arc::new(tokio::sync::Mutex::new(Vec::new()));
        emitter.on_event(std::sync::Arc::new(RecordingHandler(seen.clone())));
        let reader = ContractReader::new(ChainId::new(1), &rpc, Some(&cache), &abi, &logger);
        let flag = AtomicBool::new(false);
        let context = ();

        processor
            .process_events(&mut queue, BlockNumber::new(10), &mut subs, &emitter, reader, &context, &flag)
            .await
            .unwrap();

        assert_eq!(*seen.lock().await, vec![(0, 0)]);
        assert_eq!(subs["sub-1"].indexed_to_block, Some(BlockNumber::new(0)));
    }

    struct RecordingHandler(std::sync::Arc<tokio::sync::Mutex<Vec<(u64, u64)>>>);

    #[async_trait::async_trait]
    impl EventHandlerAlias for RecordingHandler {
        async fn handle(
            &self,
            event: &Event,
            _handle: &mut EngineHandle<'_, MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()>,
        ) -> Result<(), IndexerError> {
            self.0
                .lock()
                .await
                .push((event.log.block_number.value(), event.log.log_index));
            Ok(())
        }
    }

    #[tokio::test]
    async fn stops_draining_when_handler_adds_subscription() {
        let abi = MockAbiRegistry::new().with_contract(
            "Erc20",
            vec![MockEventDef { name: "Transfer".into(), topic0: B256::repeat_byte(0xAB) }],
        );
        let logger = NullLogger;
        let processor = EventProcessor::new(&abi, &logger);

        let mut queue = EventQueue::new();
        queue.push(PendingEvent { log: log(1, 0), subscription_id: "sub-1".into(), contract_name: "Erc20".into() });
        queue.push(PendingEvent { log: log(2, 0), subscription_id: "sub-1".into(), contract_name: "Erc20".into() });

        let mut subs = HashMap::new();
        subs.insert("sub-1".into(), subscription("sub-1", 0));

        let rpc = MockRpcClient::new(10);
        let cache = MockCache::new();
        let emitter: EventEmitter<MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()> =
            EventEmitter::new();
        emitter.on_event(std::sync::Arc::new(SubscribingHandler));
        let reader = ContractReader::new(ChainId::new(1), &rpc, Some(&cache), &abi, &logger);
        let flag = AtomicBool::new(false);
        let context = ();

        let result = processor
            .process_events(&mut queue, BlockNumber::new(10), &mut subs, &emitter, reader, &context, &flag)
            .await
            .unwrap();

        assert!(result.has_new_subscriptions);
        assert_eq!(queue.len(), 1); // second event left undrained
    }

    struct SubscribingHandler;

    #[async_trait::async_trait]
    impl EventHandlerAlias for SubscribingHandler {
        async fn handle(
            &self,
            _event: &Event,
            handle: &mut EngineHandle<'_, MockRpcClient, MockCache, MockAbiRegistry, NullLogger, ()>,
        ) -> Result<(), IndexerError> {
            handle.subscribe_to_contract(
                SubscribeOptions::new("Erc20", Address::ZERO)
                    .with_id("sub-2")
                    .from_block(BlockNumber::new(0)),
            )
        }
    }

    use super::super::emitter::EventHandler as EventHandlerAlias;
}
