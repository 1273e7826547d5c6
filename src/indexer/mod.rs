//! Indexer Core (§2 "I", §4.I): the state machine and poll loop that
//! orchestrates the fetch planner, event queue, event processor, and
//! contract reader over one subscription set.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Indexer (core)                          │
//! │                                                                   │
//! │   tick:  targetBlock ──▶ FetchPlanner ──▶ EventQueue ──▶         │
//! │                                           EventProcessor ──▶      │
//! │                                           EventEmitter (signals,  │
//! │                                           handler registry)       │
//! │                                                                   │
//! │   read_contract: ContractReader (cache-through point read)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`core::Indexer`] is the type embedding applications construct;
//! [`config::IndexerConfig`] holds its tunables; the other submodules are
//! internal collaborators the core orchestrates each tick.

pub mod config;
pub mod contract_reader;
pub mod core;
pub mod emitter;
pub mod processor;

pub use config::IndexerConfig;
pub use contract_reader::{ContractReader, ReadContractArgs};
pub use core::Indexer;
pub use emitter::{EngineHandle, EventEmitter, EventHandler, Progress, Signal};
pub use processor::{EventProcessor, ProcessResult};
