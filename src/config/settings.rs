//! Settings structs and loading logic.
//!
//! All settings have sensible defaults and can be overridden via
//! environment variables or configuration files.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::indexer::IndexerConfig;
use crate::ports::logger::Level;

/// Root configuration structure for an embedding application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// RPC transport configuration (§6.1: retry and concurrency bounds).
    pub rpc: RpcSettings,
    /// Poll loop configuration (§4.I).
    pub indexing: IndexingSettings,
    /// Cache configuration, for embedding applications that attach one.
    pub cache: CacheSettings,
    /// Logging configuration (§4.L).
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// Files are loaded in this order (later overrides earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (if exists)
    /// 3. Environment variables with the `CHAIN_INDEXER` prefix
    ///
    /// # Arguments
    /// * `environment` - Environment name (e.g., "development", "production").
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration is invalid or cannot be loaded.
    pub fn load(environment: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let builder = Config::builder()
            // RPC transport (§6.1): retry is the transport's concern, but
            // spec.md names concrete defaults ("retries ... up to 5 times
            // with 1s delay", "concurrency-limiting wrapper (default bound
            // 5)"), so they live here rather than hardcoded in the adapter.
            .set_default("rpc.url", "http://localhost:8545")?
            .set_default("rpc.chain_id", 1)?
            .set_default("rpc.max_retries", 5)?
            .set_default("rpc.retry_delay_ms", 1000)?
            .set_default("rpc.request_timeout_ms", 30000)?
            .set_default("rpc.concurrency_limit", 5)?
            // Poll loop (§4.I step 8: "default 1000 ms").
            .set_default("indexing.poll_interval_ms", 1000)?
            // Cache (§6.2, optional).
            .set_default("cache.enabled", false)?
            .set_default("cache.log_range_ttl_ms", Option::<i64>::None)?
            // Logging (§4.L).
            .set_default("logging.level", "info")?
            // Load default configuration file
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            // Load environment-specific file
            .add_source(File::with_name(&format!("{config_dir}/{environment}")).required(false))
            // Override with environment variables (CHAIN_INDEXER__ prefix)
            .add_source(
                Environment::with_prefix("CHAIN_INDEXER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load settings from a specific file path.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    /// Validate settings and return any validation errors.
    ///
    /// # Errors
    /// Returns a list of validation error messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.rpc.url.is_empty() {
            errors.push("rpc.url cannot be empty".into());
        }
        if self.rpc.chain_id == 0 {
            errors.push("rpc.chain_id must be non-zero".into());
        }
        if self.rpc.concurrency_limit == 0 {
            errors.push("rpc.concurrency_limit must be non-zero".into());
        }
        if self.indexing.poll_interval_ms == 0 {
            errors.push("indexing.poll_interval_ms must be non-zero".into());
        }
        if Level::parse(&self.logging.level).is_err() {
            errors.push(format!("logging.level '{}' is not a known level", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// RPC transport configuration (§6.1). The engine consumes these values
/// only indirectly, through whichever [`crate::ports::RpcClient`] adapter
/// the embedding application builds with them — e.g.
/// [`crate::ports::rpc::ConcurrencyLimitedRpcClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct RpcSettings {
    /// HTTP RPC endpoint URL.
    pub url: String,
    /// Chain ID this indexer instance follows.
    pub chain_id: u64,
    /// Maximum retry attempts for transient failures (not range-too-wide,
    /// which the fetch planner recovers from locally).
    pub max_retries: u32,
    /// Delay between retries in milliseconds.
    pub retry_delay_ms: u64,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum in-flight RPC calls (§5 "RPC concurrency", default bound 5).
    pub concurrency_limit: usize,
}

impl RpcSettings {
    /// Get the retry delay as a `Duration`.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Poll loop configuration (§4.I).
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingSettings {
    /// Delay between poll ticks once caught up, in milliseconds.
    pub poll_interval_ms: u64,
}

impl IndexingSettings {
    /// Get the poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Project these settings into the [`IndexerConfig`] the engine
    /// actually consumes.
    #[must_use]
    pub const fn to_indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            poll_interval: self.poll_interval(),
        }
    }
}

/// Cache configuration (§6.2, optional). The engine's [`crate::ports::Cache`]
/// port has no notion of TTL itself — this is a hint for cache adapters
/// that want one (e.g. an in-memory LRU with expiry).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Whether an embedding application should attach a cache at all.
    pub enabled: bool,
    /// Optional TTL for cached log ranges, in milliseconds. `None` means
    /// entries never expire.
    pub log_range_ttl_ms: Option<i64>,
}

impl CacheSettings {
    /// Get the log-range TTL as a `Duration`, if configured.
    #[must_use]
    pub fn log_range_ttl(&self) -> Option<Duration> {
        self.log_range_ttl_ms
            .map(|ms| Duration::from_millis(ms.max(0).unsigned_abs()))
    }
}

/// Logging configuration (§4.L).
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level threshold (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl LoggingSettings {
    /// Parse the configured level.
    ///
    /// # Errors
    /// [`crate::error::DomainError::InvalidLevel`] if `level` is not a
    /// recognized level name.
    pub fn level(&self) -> Result<Level, crate::error::DomainError> {
        Level::parse(&self.level)
    }
}
