//! Logger port (§4.L): a minimal, swappable logging seam independent of
//! any particular logging backend. The default adapter bridges to
//! `tracing`, matching the rest of the crate's observability stack; an
//! embedding application that already owns its own logger can implement
//! [`Logger`] directly instead.

use std::fmt;

/// A logging severity, ordered `Trace < Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Fine-grained diagnostic detail (e.g. cache hit/miss, individual RPC
    /// calls).
    Trace,
    /// Developer-facing detail useful while debugging (e.g. resolved fetch
    /// ranges).
    Debug,
    /// Normal operational messages (e.g. a subscription reached its target
    /// block).
    Info,
    /// Recoverable problems (e.g. a decode failure the processor skipped).
    Warn,
    /// Failures that surface through the `error` signal.
    Error,
}

impl Level {
    /// Parse a level from its lowercase name, as accepted by configuration
    /// (§4.config "log level").
    pub fn parse(s: &str) -> Result<Self, crate::error::DomainError> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(crate::error::DomainError::InvalidLevel(other.to_string())),
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A swappable logging sink (§4.L).
///
/// Implementations receive every message the engine emits at or above
/// their own threshold; messages below threshold are never constructed
/// (callers check [`Logger::enabled`] first), so a discarded `trace` line
/// costs nothing beyond the `enabled` check.
pub trait Logger: Send + Sync {
    /// The minimum level this logger will accept.
    fn threshold(&self) -> Level;

    /// Whether a message at `level` would be accepted. Call sites should
    /// check this before formatting an expensive message.
    fn enabled(&self, level: Level) -> bool {
        level >= self.threshold()
    }

    /// Emit a message at `level`, with optional structured fields
    /// (subscription id, block range, event name, …) rendered as
    /// `key=value` pairs by the default adapter.
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]);
}

/// The default [`Logger`] adapter, bridging to the `tracing` crate.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    threshold: Level,
}

impl TracingLogger {
    /// Create an adapter that accepts messages at or above `threshold`.
    #[must_use]
    pub const fn new(threshold: Level) -> Self {
        Self { threshold }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl Logger for TracingLogger {
    fn threshold(&self) -> Level {
        self.threshold
    }

    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]) {
        if !self.enabled(level) {
            return;
        }
        let rendered: String = fields
            .iter()
            .map(|(k, v)| format!(" {k}={v}"))
            .collect();
        match level {
            Level::Trace => tracing::trace!("{message}{rendered}"),
            Level::Debug => tracing::debug!("{message}{rendered}"),
            Level::Info => tracing::info!("{message}{rendered}"),
            Level::Warn => tracing::warn!("{message}{rendered}"),
            Level::Error => tracing::error!("{message}{rendered}"),
        }
    }
}

/// A logger that discards everything, for tests that don't care about log
/// output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn threshold(&self) -> Level {
        Level::Error
    }

    fn enabled(&self, _level: Level) -> bool {
        false
    }

    fn log(&self, _level: Level, _message: &str, _fields: &[(&str, &str)]) {}
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! A recording logger for assertions on what was logged.

    use std::sync::Mutex;

    use super::{Level, Logger};

    /// A logger that records every accepted message.
    #[derive(Debug, Default)]
    pub struct RecordingLogger {
        threshold: Level,
        entries: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingLogger {
        /// Create a recorder that accepts messages at or above `threshold`.
        #[must_use]
        pub fn new(threshold: Level) -> Self {
            Self {
                threshold,
                entries: Mutex::new(Vec::new()),
            }
        }

        /// Snapshot everything recorded so far.
        pub fn entries(&self) -> Vec<(Level, String)> {
            self.entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    impl Logger for RecordingLogger {
        fn threshold(&self) -> Level {
            self.threshold
        }

        fn log(&self, level: Level, message: &str, _fields: &[(&str, &str)]) {
            if !self.enabled(level) {
                return;
            }
            self.entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::RecordingLogger;
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn parse_accepts_known_names_case_insensitively() {
        assert_eq!(Level::parse("INFO").unwrap(), Level::Info);
        assert_eq!(Level::parse("warning").unwrap(), Level::Warn);
    }

    #[test]
    fn parse_rejects_unknown_name() {
        assert!(Level::parse("verbose").is_err());
    }

    #[test]
    fn threshold_filters_below_level() {
        let logger = RecordingLogger::new(Level::Warn);
        logger.log(Level::Info, "ignored", &[]);
        logger.log(Level::Error, "kept", &[]);
        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, "kept");
    }

    #[test]
    fn null_logger_discards_everything() {
        let logger = NullLogger;
        assert!(!logger.enabled(Level::Error));
    }
}
