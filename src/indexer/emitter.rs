//! Event Emitter (§4.E, new): lifecycle signals and the decoded-event
//! handler registry, factored out of the processor/core because they are
//! a distinct pub/sub concern (§2 "Addition").

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::IndexerError;
use crate::ports::{AbiRegistry, Cache, Logger, RpcClient};
use crate::types::{BlockNumber, Event, Subscription, SubscribeOptions};

use super::contract_reader::{ContractReader, ReadContractArgs};

/// Capacity of the lifecycle signal broadcast channel. Lagging receivers
/// drop the oldest signal rather than block the engine (§4.E, §9 "Signal
/// delivery semantics").
const SIGNAL_CHANNEL_CAPACITY: usize = 64;

/// One completed tick's summary (§4.I step 7, §6.4 `progress` signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// The watermark every subscription is known indexed through.
    pub current_block: BlockNumber,
    /// The block this tick resolved as its target.
    pub target_block: BlockNumber,
    /// Events still queued but undispatched when this signal fired.
    pub pending_events_count: usize,
}

/// Lifecycle signals the engine emits (§6.4).
#[derive(Debug, Clone)]
pub enum Signal {
    /// `watch()`/`index_to_block()` transitioned the engine to running.
    Started,
    /// The engine transitioned to stopped.
    Stopped,
    /// A tick failed; carries the error that was reported (§7).
    Error(Arc<IndexerError>),
    /// One completed tick's summary.
    Progress(Progress),
}

/// Passed to every [`EventHandler`] invocation (§9 "Handler
/// re-entrancy"): exposes the two operations a handler may perform mid-
/// dispatch, a cache-through contract read and subscribing to a new
/// contract (which forces the processor to stop draining, §4.P step 6).
pub struct EngineHandle<'a, R, C, A, L, Ctx> {
    /// The user-supplied context value, threaded through unchanged.
    pub context: &'a Ctx,
    pub(super) reader: ContractReader<'a, R, C, A, L>,
    pub(super) subscriptions: &'a mut HashMap<String, Subscription>,
    pub(super) abi: &'a A,
    pub(super) new_subscription_flag: &'a AtomicBool,
}

impl<'a, R, C, A, L, Ctx> EngineHandle<'a, R, C, A, L, Ctx>
where
    R: RpcClient,
    C: Cache,
    A: AbiRegistry,
    L: Logger,
{
    /// Cache-through contract read (§4.C), safe to call from a handler.
    ///
    /// # Errors
    /// Propagates RPC, cache, or ABI errors.
    pub async fn read_contract(
        &self,
        args: ReadContractArgs,
    ) -> Result<Vec<alloy::dyn_abi::DynSolValue>, IndexerError> {
        self.reader.read_contract(&args).await
    }

    /// Subscribe to a new contract mid-dispatch (§6.4
    /// `subscribe_to_contract`, §9 "Handler re-entrancy"). Forces the
    /// processor to stop draining after the current event.
    ///
    /// # Errors
    /// Returns [`crate::error::DomainError::UnknownContract`] if `opts`
    /// names a contract absent from the ABI registry.
    pub fn subscribe_to_contract(&mut self, opts: SubscribeOptions) -> Result<(), IndexerError> {
        let sub = super::core::build_subscription(opts, self.abi)?;
        self.subscriptions.insert(sub.id.clone(), sub);
        self.new_subscription_flag.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A handler of decoded events (§4.P step 4, §9 "dynamic event dispatch
/// by key"). Registered either generically (`on_event`, fires for every
/// dispatched event) or keyed to one `"{contractName}:{eventName}"` pair
/// (`on`).
///
/// Handlers are awaited serially in registration order (§5: "Handlers are
/// awaited serially"); an `Err` aborts the current tick's drain and
/// surfaces through the `error` signal or the `index_to_block` completion
/// (§7).
#[async_trait]
pub trait EventHandler<R, C, A, L, Ctx>: Send + Sync
where
    R: RpcClient,
    C: Cache,
    A: AbiRegistry,
    L: Logger,
    Ctx: Send + Sync,
{
    /// Handle one decoded event.
    ///
    /// # Errors
    /// Any `Err` aborts the processor's current drain (§7 "Handler
    /// errors").
    async fn handle(
        &self,
        event: &Event,
        handle: &mut EngineHandle<'_, R, C, A, L, Ctx>,
    ) -> Result<(), IndexerError>;
}

/// Lifecycle signal broadcast plus the dynamic handler registry (§4.E).
pub struct EventEmitter<R, C, A, L, Ctx> {
    signals: broadcast::Sender<Signal>,
    generic_handlers: Mutex<Vec<Arc<dyn EventHandler<R, C, A, L, Ctx>>>>,
    keyed_handlers: Mutex<HashMap<String, Vec<Arc<dyn EventHandler<R, C, A, L, Ctx>>>>>,
}

impl<R, C, A, L, Ctx> std::fmt::Debug for EventEmitter<R, C, A, L, Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

impl<R, C, A, L, Ctx> Default for EventEmitter<R, C, A, L, Ctx>
where
    R: RpcClient,
    C: Cache,
    A: AbiRegistry,
    L: Logger,
    Ctx: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C, A, L, Ctx> EventEmitter<R, C, A, L, Ctx>
where
    R: RpcClient,
    C: Cache,
    A: AbiRegistry,
    L: Logger,
    Ctx: Send + Sync,
{
    /// Create an emitter with no registered handlers.
    #[must_use]
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            signals,
            generic_handlers: Mutex::new(Vec::new()),
            keyed_handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a handler invoked for every dispatched event.
    pub fn on_event(&self, handler: Arc<dyn EventHandler<R, C, A, L, Ctx>>) {
        self.generic_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Register a handler invoked only for `"{contract}:{event}"`.
    pub fn on(
        &self,
        contract_name: &str,
        event_name: &str,
        handler: Arc<dyn EventHandler<R, C, A, L, Ctx>>,
    ) {
        self.keyed_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(format!("{contract_name}:{event_name}"))
            .or_default()
            .push(handler);
    }

    /// Subscribe to lifecycle signals. Lossy under a slow subscriber
    /// (§9 "Signal delivery semantics").
    pub fn subscribe_events(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Broadcast a lifecycle signal. A "no receivers" error is ignored:
    /// signals are fire-and-forget.
    pub(super) fn emit(&self, signal: Signal) {
        let _ = self.signals.send(signal);
    }

    /// Dispatch `event` to every matching handler, serially, in
    /// registration order: generic handlers first, then keyed ones
    /// (§4.P step 4).
    ///
    /// # Errors
    /// Returns the first handler error encountered, aborting the
    /// remaining dispatch (§7 "Handler errors").
    pub(super) async fn dispatch(
        &self,
        event: &Event,
        handle: &mut EngineHandle<'_, R, C, A, L, Ctx>,
    ) -> Result<(), IndexerError> {
        let generic = self
            .generic_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &generic {
            handler.handle(event, handle).await?;
        }

        let keyed = self
            .keyed_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.handler_key())
            .cloned();
        if let Some(keyed) = keyed {
            for handler in &keyed {
                handler.handle(event, handle).await?;
            }
        }
        Ok(())
    }
}
