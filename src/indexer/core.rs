//! Indexer Core (§4.I): the state machine and poll loop that orchestrates
//! the fetch planner, event processor, and contract reader over one
//! subscription set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use tokio::sync::{oneshot, Mutex, Notify};

use crate::error::{DomainError, IndexerError};
use crate::planner::FetchPlanner;
use crate::ports::logger::Level;
use crate::ports::{AbiRegistry, Cache, Logger, RpcClient, SubscriptionStore};
use crate::queue::EventQueue;
use crate::types::{BlockNumber, ChainId, Subscription, SubscribeOptions, ToBlock};

use super::config::IndexerConfig;
use super::contract_reader::{ContractReader, ReadContractArgs};
use super::emitter::{EventEmitter, Progress, Signal};
use super::processor::EventProcessor;

/// Construct a [`Subscription`] from user-supplied options, applying the
/// spec-mandated defaults and validating the contract name (§4.I
/// `subscribeToContract`).
///
/// # Errors
/// [`DomainError::UnknownContract`] if `opts.contract_name` has no entry
/// in the ABI registry.
pub(crate) fn build_subscription(
    opts: SubscribeOptions,
    abi: &impl AbiRegistry,
) -> Result<Subscription, DomainError> {
    if !abi.has_contract(&opts.contract_name) {
        return Err(DomainError::UnknownContract(opts.contract_name));
    }
    let from_block = opts.from_block.unwrap_or(BlockNumber::ZERO);
    let id = opts.id.unwrap_or_else(|| opts.contract_address.to_string());
    Ok(Subscription::new(
        id,
        opts.contract_name,
        opts.contract_address,
        from_block,
        opts.to_block.unwrap_or(ToBlock::Latest),
    ))
}

/// The indexer's lifecycle state (§4.I "States"), a tagged variant per
/// design note §9 rather than nullable fields.
enum IndexerState {
    /// No `watch()`/`index_to_block()` call has run yet.
    Initial,
    /// The poll loop is scheduled or executing.
    Running(RunningState),
    /// The engine has stopped; a fresh indexer must be built to resume
    /// (§4.I: "`running` is re-entered only from `stopped` is
    /// disallowed").
    Stopped,
}

/// What makes `running` distinct from a boolean flag: the poll target and
/// the callbacks specific to how this run was started (§9 "State
/// machine").
struct RunningState {
    target: PollTarget,
    stop_signal: Arc<Notify>,
    /// Present only for `index_to_block`; resolved when the engine
    /// reaches `stopped`, one way or another.
    completion: Option<oneshot::Sender<Result<(), Arc<IndexerError>>>>,
}

/// What a poll tick resolves its `targetBlock` against (§4.I step 1).
#[derive(Debug, Clone, Copy)]
enum PollTarget {
    Latest,
    Concrete(BlockNumber),
}

/// Outcome of one poll tick, steering the loop around it.
enum TickOutcome {
    /// Tick completed normally; sleep for the configured interval.
    Polled,
    /// A handler added a subscription; replan with no delay (§4.P step 6,
    /// §4.I step 6).
    ReplanImmediately,
    /// The configured concrete target was reached; the loop must exit.
    Stopped,
}

/// The blockchain log indexer engine (§2 "I — Indexer Core"): orchestrates
/// the fetch planner, event processor, and contract reader over a live
/// subscription set, exposing the public API of §6.4.
///
/// Generic over its five collaborator ports (`R`pc, `C`ache,
/// `S`ubscriptionStore, `A`biRegistry, `L`ogger) plus a user `Ctx`ext type
/// threaded unchanged into every handler invocation — the same
/// generic-parameter composition the fetch planner and contract reader
/// use, rather than trait objects, so a concrete deployment monomorphizes
/// into a single allocation-free call graph.
pub struct Indexer<R, C, S, A, L, Ctx = ()> {
    chain_id: ChainId,
    rpc: Arc<R>,
    cache: Option<Arc<C>>,
    store: Option<Arc<S>>,
    abi: Arc<A>,
    logger: Arc<L>,
    config: IndexerConfig,
    subscriptions: Arc<Mutex<HashMap<String, Subscription>>>,
    /// Events fetched but not yet dispatched, carried across ticks: a
    /// handler adding a subscription mid-drain (§4.P step 6) stops the
    /// drain early, and whatever is still queued must survive into the
    /// immediate replan tick rather than being discarded with a
    /// freshly-allocated queue (§8 scenario 5, "no duplicates").
    queue: Arc<Mutex<EventQueue>>,
    state: Arc<Mutex<IndexerState>>,
    new_subscription_flag: Arc<AtomicBool>,
    emitter: Arc<EventEmitter<R, C, A, L, Ctx>>,
    context: Ctx,
}

impl<R, C, S, A, L, Ctx> Clone for Indexer<R, C, S, A, L, Ctx>
where
    Ctx: Clone,
{
    fn clone(&self) -> Self {
        Self {
            chain_id: self.chain_id,
            rpc: Arc::clone(&self.rpc),
            cache: self.cache.clone(),
            store: self.store.clone(),
            abi: Arc::clone(&self.abi),
            logger: Arc::clone(&self.logger),
            config: self.config.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
            queue: Arc::clone(&self.queue),
            state: Arc::clone(&self.state),
            new_subscription_flag: Arc::clone(&self.new_subscription_flag),
            emitter: Arc::clone(&self.emitter),
            context: self.context.clone(),
        }
    }
}

impl<R, C, S, A, L, Ctx> Indexer<R, C, S, A, L, Ctx>
where
    R: RpcClient + 'static,
    C: Cache + 'static,
    S: SubscriptionStore + 'static,
    A: AbiRegistry + 'static,
    L: Logger + 'static,
    Ctx: Clone + Send + Sync + 'static,
{
    /// Build a new indexer, in `initial` state, with no subscriptions.
    #[must_use]
    pub fn new(
        chain_id: ChainId,
        rpc: R,
        abi: A,
        logger: L,
        config: IndexerConfig,
        context: Ctx,
    ) -> Self {
        Self {
            chain_id,
            rpc: Arc::new(rpc),
            cache: None,
            store: None,
            abi: Arc::new(abi),
            logger: Arc::new(logger),
            config,
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(EventQueue::new())),
            state: Arc::new(Mutex::new(IndexerState::Initial)),
            new_subscription_flag: Arc::new(AtomicBool::new(false)),
            emitter: Arc::new(EventEmitter::new()),
            context,
        }
    }

    /// Attach a log/call-result cache (§6.2, optional).
    #[must_use]
    pub fn with_cache(mut self, cache: C) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Attach a subscription store for cursor durability (§6.3, optional).
    #[must_use]
    pub fn with_store(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Register a handler invoked for every dispatched event.
    pub fn on_event(&self, handler: Arc<dyn super::emitter::EventHandler<R, C, A, L, Ctx>>) {
        self.emitter.on_event(handler);
    }

    /// Register a handler invoked only for `"{contract}:{event}"`.
    pub fn on(
        &self,
        contract_name: &str,
        event_name: &str,
        handler: Arc<dyn super::emitter::EventHandler<R, C, A, L, Ctx>>,
    ) {
        self.emitter.on(contract_name, event_name, handler);
    }

    /// Subscribe to lifecycle signals (§6.4).
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<Signal> {
        self.emitter.subscribe_events()
    }

    /// Subscribe to a new contract (§4.I `subscribeToContract`). Safe to
    /// call before or during a run.
    ///
    /// # Errors
    /// [`DomainError::UnknownContract`] if the contract name is unknown
    /// to the ABI registry.
    pub async fn subscribe_to_contract(&self, opts: SubscribeOptions) -> Result<(), IndexerError> {
        let sub = build_subscription(opts, self.abi.as_ref())?;
        self.subscriptions.lock().await.insert(sub.id.clone(), sub);
        Ok(())
    }

    /// Cache-through contract read (§4.C, §6.4 `readContract`).
    ///
    /// # Errors
    /// Propagates RPC, cache, and ABI errors as-is.
    pub async fn read_contract(
        &self,
        args: ReadContractArgs,
    ) -> Result<Vec<DynSolValue>, IndexerError> {
        let reader = self.reader();
        reader.read_contract(&args).await
    }

    fn reader(&self) -> ContractReader<'_, R, C, A, L> {
        ContractReader::new(
            self.chain_id,
            self.rpc.as_ref(),
            self.cache.as_deref(),
            self.abi.as_ref(),
            self.logger.as_ref(),
        )
    }

    /// Start following the chain tip (§4.I `watch()`): loads subscriptions
    /// from the store (if configured), transitions to `running` with
    /// `targetBlock = latest`, emits `started`, and schedules the poll
    /// loop.
    ///
    /// # Errors
    /// [`DomainError::InvalidStateTransition`] if not `initial`; store
    /// errors from the initial load.
    pub async fn watch(&self) -> Result<(), IndexerError> {
        self.begin_running(PollTarget::Latest, None).await
    }

    /// Index up to `target` and stop (§4.I `indexToBlock`). Returns once
    /// the engine has naturally reached `stopped` after catching up, or
    /// an error if a tick failed fatally.
    ///
    /// # Errors
    /// [`DomainError::InvalidStateTransition`] if not `initial`; whatever
    /// error caused the run to abort.
    pub async fn index_to_block(&self, target: ToBlock) -> Result<(), IndexerError> {
        let resolved = match target {
            ToBlock::Number(n) => n,
            ToBlock::Latest => self
                .rpc
                .get_last_block_number()
                .await
                .map_err(IndexerError::from)?,
        };
        let (tx, rx) = oneshot::channel();
        self.begin_running(PollTarget::Concrete(resolved), Some(tx))
            .await?;
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Arc::unwrap_or_clone_err(err)),
            Err(_) => Ok(()), // sender dropped without sending: loop exited cleanly
        }
    }

    async fn begin_running(
        &self,
        target: PollTarget,
        completion: Option<oneshot::Sender<Result<(), Arc<IndexerError>>>>,
    ) -> Result<(), IndexerError> {
        {
            let state = self.state.lock().await;
            if !matches!(&*state, IndexerState::Initial) {
                return Err(DomainError::InvalidStateTransition {
                    action: "watch/index_to_block".into(),
                    state: "not initial".into(),
                }
                .into());
            }
        }

        self.load_subscriptions_from_store().await?;

        {
            let mut state = self.state.lock().await;
            *state = IndexerState::Running(RunningState {
                target,
                stop_signal: Arc::new(Notify::new()),
                completion,
            });
        }
        self.emitter.emit(Signal::Started);

        let engine = self.clone();
        tokio::spawn(async move { engine.run_poll_loop().await });
        Ok(())
    }

    /// Stop a running engine (§4.I `stop()`).
    ///
    /// # Errors
    /// [`DomainError::InvalidStateTransition`] if not `running`.
    pub async fn stop(&self) -> Result<(), IndexerError> {
        let mut state = self.state.lock().await;
        let IndexerState::Running(running) = &*state else {
            return Err(DomainError::InvalidStateTransition {
                action: "stop".into(),
                state: "not running".into(),
            }
            .into());
        };
        running.stop_signal.notify_one();
        *state = IndexerState::Stopped;
        drop(state);
        self.emitter.emit(Signal::Stopped);
        Ok(())
    }

    async fn load_subscriptions_from_store(&self) -> Result<(), IndexerError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let stored = store.all().await.map_err(IndexerError::from)?;
        let mut subs = self.subscriptions.lock().await;
        for s in stored {
            let sub = Subscription::from_stored(s);
            subs.insert(sub.id.clone(), sub);
        }
        Ok(())
    }

    async fn save_subscriptions(
        &self,
        subscriptions: &HashMap<String, Subscription>,
    ) -> Result<(), IndexerError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let stored: Vec<_> = subscriptions.values().map(Subscription::to_stored).collect();
        store.save(&stored).await.map_err(IndexerError::from)
    }

    async fn run_poll_loop(self) {
        loop {
            let (target, stop_signal) = {
                let state = self.state.lock().await;
                match &*state {
                    IndexerState::Running(r) => (r.target, Arc::clone(&r.stop_signal)),
                    IndexerState::Initial | IndexerState::Stopped => return,
                }
            };

            match self.tick(target).await {
                Ok(TickOutcome::ReplanImmediately) => {}
                Ok(TickOutcome::Stopped) => return,
                Ok(TickOutcome::Polled) => {
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval) => {}
                        () = stop_signal.notified() => { return; }
                    }
                }
                Err(err) => {
                    if self.report_tick_error(err).await {
                        return;
                    }
                }
            }
        }
    }

    /// Report a tick failure (§7 "Propagation"). Returns `true` if the
    /// engine transitioned to `stopped` (only happens for
    /// `index_to_block` runs).
    async fn report_tick_error(&self, err: IndexerError) -> bool {
        self.logger.log(
            Level::Error,
            "poll tick failed",
            &[("error", &err.to_string())],
        );
        let shared = Arc::new(err);
        self.emitter.emit(Signal::Error(Arc::clone(&shared)));

        let mut state = self.state.lock().await;
        if let IndexerState::Running(running) = &mut *state {
            if let Some(tx) = running.completion.take() {
                *state = IndexerState::Stopped;
                drop(state);
                self.emitter.emit(Signal::Stopped);
                let _ = tx.send(Err(shared));
                return true;
            }
        }
        false
    }

    async fn tick(&self, target: PollTarget) -> Result<TickOutcome, IndexerError> {
        let target_block = match target {
            PollTarget::Latest => self
                .rpc
                .get_last_block_number()
                .await
                .map_err(IndexerError::from)?,
            PollTarget::Concrete(n) => n,
        };

        let mut subs = self.subscriptions.lock().await;

        let topic0_by_contract = build_topic0_map(&subs, self.abi.as_ref())?;
        let planner = FetchPlanner::new(
            self.chain_id,
            self.rpc.as_ref(),
            self.cache.as_deref(),
            self.logger.as_ref(),
        );
        let mut queue = self.queue.lock().await;
        planner
            .plan(&subs, &topic0_by_contract, target_block, |event| {
                queue.push(event);
            })
            .await?;

        for sub in subs.values_mut() {
            sub.fetched_to_block = Some(target_block);
        }

        self.new_subscription_flag.store(false, Ordering::SeqCst);
        let processor = EventProcessor::new(self.abi.as_ref(), self.logger.as_ref());
        let result = processor
            .process_events(
                &mut queue,
                target_block,
                &mut subs,
                self.emitter.as_ref(),
                self.reader(),
                &self.context,
                &self.new_subscription_flag,
            )
            .await?;

        // §4.I step 5: the processor's watermark always lands on every
        // subscription, including one a handler just added mid-drain
        // (§9 "Cursor rewind on hasNewSubscriptions").
        for sub in subs.values_mut() {
            sub.indexed_to_block = result.indexed_to_block;
            sub.indexed_to_log_index = result.indexed_to_log_index;
        }

        if result.has_new_subscriptions {
            self.save_subscriptions(&subs).await?;
            return Ok(TickOutcome::ReplanImmediately);
        }

        // §4.I step 7: fully caught up. Clamp per subscription to its own
        // effective target rather than the raw `target_block`, so a
        // subscription with a concrete `to_block` below `target_block`
        // doesn't have its cursor pushed past the cursor-safety invariant
        // (§8 "indexedToBlock ≤ toBlock").
        for sub in subs.values_mut() {
            sub.indexed_to_block = Some(sub.to_block.resolve(target_block));
            sub.indexed_to_log_index = 0;
        }

        // Every subscription has a concrete cursor by now (the clamp loop
        // above just set one on each), so the reported watermark is a real
        // block rather than the pre-clamp `Option` the processor returned.
        let current_block = subs
            .values()
            .filter_map(|sub| sub.indexed_to_block)
            .min()
            .unwrap_or(target_block);

        self.emitter.emit(Signal::Progress(Progress {
            current_block,
            target_block,
            pending_events_count: queue.len(),
        }));
        self.save_subscriptions(&subs).await?;

        if let PollTarget::Concrete(configured) = target {
            if target_block.value() == configured.value() {
                drop(subs);
                let mut state = self.state.lock().await;
                if let IndexerState::Running(running) = &mut *state {
                    let completion = running.completion.take();
                    *state = IndexerState::Stopped;
                    drop(state);
                    self.emitter.emit(Signal::Stopped);
                    if let Some(tx) = completion {
                        let _ = tx.send(Ok(()));
                    }
                }
                return Ok(TickOutcome::Stopped);
            }
        }

        Ok(TickOutcome::Polled)
    }
}

/// Collect every subscription's declared event topic-0 hashes, keyed by
/// contract name, for the planner's `getLogs` filter (§4.F step 2).
fn build_topic0_map(
    subscriptions: &HashMap<String, Subscription>,
    abi: &impl AbiRegistry,
) -> Result<HashMap<String, Vec<alloy::primitives::B256>>, IndexerError> {
    let mut map = HashMap::new();
    for sub in subscriptions.values() {
        if map.contains_key(&sub.contract_name) {
            continue;
        }
        let hashes = abi
            .topic0_hashes(&sub.contract_name)
            .map_err(IndexerError::from)?;
        map.insert(sub.contract_name.clone(), hashes);
    }
    Ok(map)
}

/// Small helper: `Arc<IndexerError>` has no public API to reclaim
/// ownership, so callers that hold the only reference unwrap it; any
/// other case falls back to `Display`-based reconstruction, which never
/// happens in practice since `begin_running`'s completion sender is only
/// ever cloned into the one place that sends on it.
trait UnwrapOrCloneErr {
    fn unwrap_or_clone_err(self) -> IndexerError;
}

impl UnwrapOrCloneErr for Arc<IndexerError> {
    fn unwrap_or_clone_err(self) -> IndexerError {
        match Arc::try_unwrap(self) {
            Ok(err) => err,
            Err(shared) => IndexerError::Infra(crate::error::InfraError::Handler(
                shared.to_string().into(),
            )),
        }
    }
}
