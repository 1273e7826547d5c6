//! Domain types for the chain indexer.
//!
//! - [`primitives`] — `BlockNumber`, `ToBlock`, `ChainId`.
//! - [`log`] — the raw [`log::Log`] shape as received from the RPC client.
//! - [`event`] — decoded [`event::Event`]s delivered to handlers, and the
//!   undecoded [`event::PendingEvent`] envelope that flows through the
//!   queue.
//! - [`subscription`] — [`subscription::Subscription`] and its persisted
//!   form, [`subscription::StoredSubscription`].

pub mod event;
pub mod log;
pub mod primitives;
pub mod subscription;

pub use event::{DecodedArg, DecodedEvent, Event, PendingEvent};
pub use log::{Log, LogFilter, TopicFilter};
pub use primitives::{BlockNumber, ChainId, ToBlock};
pub use subscription::{StoredSubscription, Subscription, SubscribeOptions};
