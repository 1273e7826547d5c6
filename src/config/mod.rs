//! Configuration loading for an embedding application.
//!
//! The engine itself takes an [`crate::indexer::IndexerConfig`] and plain
//! port implementations directly — it has no opinion on *how* those values
//! are sourced. [`Settings`] is the conventional way to get there: load
//! from multiple sources in order of precedence, the way the rest of the
//! corpus's long-running services do it.
//!
//! 1. Environment variables (highest, `CHAIN_INDEXER__` prefix)
//! 2. Environment-specific file (e.g. `config/production.toml`)
//! 3. Default file (`config/default.toml`)
//!
//! # Example
//!
//! ```ignore
//! use chain_indexer::config::Settings;
//!
//! let settings = Settings::load("production")?;
//! let indexer_config = settings.indexing.to_indexer_config();
//! ```

mod settings;

pub use settings::{CacheSettings, IndexingSettings, LoggingSettings, RpcSettings, Settings};
