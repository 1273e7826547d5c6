//! The raw log shape as received from the RPC client (§3).

use alloy::primitives::{Address, B256, Bytes};

use super::primitives::{BlockNumber, ToBlock};

// ═══════════════════════════════════════════════════════════════════════════════
// LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// A single event log as returned by `getLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    /// Contract that emitted the log.
    pub address: Address,
    /// Hash of the block containing this log.
    pub block_hash: B256,
    /// Height of the block containing this log.
    pub block_number: BlockNumber,
    /// Index of this log within its block.
    pub log_index: u64,
    /// Hash of the transaction that produced this log.
    pub transaction_hash: B256,
    /// Index of that transaction within its block.
    pub transaction_index: u64,
    /// Indexed topics, `topics[0]` is the event signature hash when present.
    /// At most four entries.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed event data.
    pub data: Bytes,
}

impl Log {
    /// The event signature hash (`topics[0]`), if present.
    #[must_use]
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOG FILTER
// ═══════════════════════════════════════════════════════════════════════════════

/// A filter position that may be absent, a single hash, or a disjunction of
/// hashes (§6.1: "each position may be absent, a single hash, or a
/// disjunction list").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TopicFilter {
    /// No constraint on this position.
    #[default]
    Any,
    /// Exactly one hash.
    One(B256),
    /// Any of several hashes (logical OR).
    OneOf(Vec<B256>),
}

impl TopicFilter {
    /// Build a topic-0 disjunction filter from the event signature hashes
    /// declared in an ABI (§4.F step 2: "single topic-0 disjunction").
    #[must_use]
    pub fn topic0_disjunction(hashes: Vec<B256>) -> Self {
        match hashes.len() {
            0 => Self::Any,
            1 => Self::One(hashes[0]),
            _ => Self::OneOf(hashes),
        }
    }

    /// Whether `topic` matches this filter.
    #[must_use]
    pub fn matches(&self, topic: Option<B256>) -> bool {
        match self {
            Self::Any => true,
            Self::One(h) => topic == Some(*h),
            Self::OneOf(hs) => topic.is_some_and(|t| hs.contains(&t)),
        }
    }
}

/// Parameters for a `getLogs` request (§6.1).
#[derive(Debug, Clone)]
pub struct LogFilter {
    /// Contract addresses to filter on. Empty means all addresses.
    pub addresses: Vec<Address>,
    /// Per-position topic filters, `topics[0]` is the event signature.
    pub topics: Vec<TopicFilter>,
    /// Inclusive lower bound.
    pub from_block: BlockNumber,
    /// Inclusive upper bound.
    pub to_block: ToBlock,
}

impl LogFilter {
    /// Build a filter for a single contract's topic-0 disjunction over
    /// `[from_block, to_block]`, the shape the fetch planner issues (§4.F).
    #[must_use]
    pub fn for_contract(
        address: Address,
        topic0_hashes: Vec<B256>,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Self {
        Self {
            addresses: vec![address],
            topics: vec![TopicFilter::topic0_disjunction(topic0_hashes)],
            from_block,
            to_block: ToBlock::Number(to_block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_filter_any_matches_everything() {
        assert!(TopicFilter::Any.matches(None));
        assert!(TopicFilter::Any.matches(Some(B256::repeat_byte(1))));
    }

    #[test]
    fn topic_filter_one_matches_only_that_hash() {
        let h = B256::repeat_byte(7);
        let f = TopicFilter::One(h);
        assert!(f.matches(Some(h)));
        assert!(!f.matches(Some(B256::repeat_byte(8))));
        assert!(!f.matches(None));
    }

    #[test]
    fn topic0_disjunction_collapses_single_hash() {
        let h = B256::repeat_byte(3);
        assert_eq!(TopicFilter::topic0_disjunction(vec![h]), TopicFilter::One(h));
        assert_eq!(TopicFilter::topic0_disjunction(vec![]), TopicFilter::Any);
    }
}
