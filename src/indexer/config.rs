//! Indexer tunables (§4.I poll loop, §6.1 "default bound 5" / "retries …
//! with 1s delay"): the handful of defaults spec.md leaves unspecified
//! rather than engine state.
//!
//! An embedding application typically builds this from
//! [`crate::config::Settings`] rather than constructing it directly, but
//! nothing in the engine requires that path — tests build it inline.

use std::time::Duration;

/// Tunables for one [`super::core::Indexer`] instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Delay between successive poll ticks once the engine has caught up
    /// to its target (§4.I step 8). Spec default: 1000 ms.
    pub poll_interval: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_interval_is_one_second() {
        assert_eq!(IndexerConfig::default().poll_interval, Duration::from_millis(1000));
    }
}
