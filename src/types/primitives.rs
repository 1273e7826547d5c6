//! Block-height primitives.
//!
//! Block height fits comfortably in a 64-bit unsigned range; we keep it
//! there internally and only widen at the boundary where a caller might
//! hand us an arbitrary-precision value (`ChainId::from_u256`,
//! `BlockNumber::try_from_u256`).

use std::fmt;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK NUMBER
// ═══════════════════════════════════════════════════════════════════════════════

/// A concrete, 64-bit block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber(u64);

impl BlockNumber {
    /// The genesis block.
    pub const ZERO: Self = Self(0);

    /// Create a new block number.
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns the next block number (saturating at `u64::MAX`).
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the previous block number (saturating at 0).
    #[must_use]
    pub const fn prev(&self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Try to narrow an arbitrary-precision height down to 64 bits.
    ///
    /// # Errors
    /// Returns [`BlockNumberOverflow`] if `value` does not fit in a `u64`.
    pub fn try_from_u256(value: U256) -> Result<Self, BlockNumberOverflow> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| BlockNumberOverflow)
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockNumber {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl From<BlockNumber> for u64 {
    fn from(b: BlockNumber) -> Self {
        b.0
    }
}

/// An arbitrary-precision block height did not fit in 64 bits.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("block number does not fit in 64 bits")]
pub struct BlockNumberOverflow;

// ═══════════════════════════════════════════════════════════════════════════════
// TO-BLOCK SENTINEL
// ═══════════════════════════════════════════════════════════════════════════════

/// The upper bound of a subscription or fetch range: either a concrete
/// height, or the `latest` sentinel that tracks the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToBlock {
    /// A concrete block height.
    Number(BlockNumber),
    /// Track the chain head; resolved against `getLastBlockNumber` on each
    /// tick.
    Latest,
}

impl ToBlock {
    /// Resolve against a concrete chain head, producing the effective
    /// upper bound for this tick.
    #[must_use]
    pub const fn resolve(&self, head: BlockNumber) -> BlockNumber {
        match self {
            Self::Number(n) => {
                // A concrete toBlock never exceeds the actual chain head.
                if n.value() < head.value() {
                    *n
                } else {
                    head
                }
            }
            Self::Latest => head,
        }
    }

    /// Whether this is a concrete height equal to `target`.
    #[must_use]
    pub const fn is_concrete(&self, target: BlockNumber) -> bool {
        matches!(self, Self::Number(n) if n.value() == target.value())
    }
}

impl From<BlockNumber> for ToBlock {
    fn from(b: BlockNumber) -> Self {
        Self::Number(b)
    }
}

impl From<u64> for ToBlock {
    fn from(n: u64) -> Self {
        Self::Number(BlockNumber::new(n))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN ID
// ═══════════════════════════════════════════════════════════════════════════════

/// The chain this indexer instance follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(u64);

impl ChainId {
    /// Create a new chain id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
