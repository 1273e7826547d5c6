//! Per-contract subscriptions: the cursor plus filter the engine tracks for
//! each followed contract (§3).

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::primitives::{BlockNumber, ToBlock};

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A live, in-memory subscription tracked by the indexer core.
///
/// Mutated only by the indexer core's cursor-advance primitive (§3
/// "Lifecycle"); the fetch planner and event processor read it and report
/// progress back through that primitive rather than mutating it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Stable identifier, defaults to the checksummed contract address.
    pub id: String,
    /// Key into the ABI registry.
    pub contract_name: String,
    /// Checksummed contract address.
    pub contract_address: Address,
    /// Inclusive lower bound.
    pub from_block: BlockNumber,
    /// Inclusive upper bound, or `latest`.
    pub to_block: ToBlock,
    /// Highest block whose logs have been placed on the queue.
    /// Starts at a sentinel one below `from_block` (never negative since we
    /// store it as `Option<BlockNumber>`, `None` meaning "nothing fetched
    /// yet", matching the spec's `init -1`).
    pub fetched_to_block: Option<BlockNumber>,
    /// Highest block whose events have been fully dispatched. `None` is
    /// the spec's `fromBlock - 1` sentinel ("nothing indexed yet"), kept
    /// as an explicit sentinel distinct from any real block rather than a
    /// saturating subtraction, which can't represent `-1` when
    /// `fromBlock == 0` without colliding with a genuine genesis-block
    /// event.
    pub indexed_to_block: Option<BlockNumber>,
    /// Last dispatched log index within `indexed_to_block`.
    pub indexed_to_log_index: u64,
}

impl Subscription {
    /// Construct a freshly created subscription with spec-mandated
    /// defaults (§4.I `subscribeToContract`):
    /// `fetchedToBlock = -1`, `indexedToBlock = fromBlock - 1`,
    /// `indexedToLogIndex = 0`.
    #[must_use]
    pub fn new(
        id: String,
        contract_name: String,
        contract_address: Address,
        from_block: BlockNumber,
        to_block: ToBlock,
    ) -> Self {
        Self {
            id,
            contract_name,
            contract_address,
            from_block,
            to_block,
            fetched_to_block: None,
            indexed_to_block: None,
            indexed_to_log_index: 0,
        }
    }

    /// Rehydrate a subscription loaded from the store. Per §6.3,
    /// `fetchedToBlock` is not persisted and is recomputed as "nothing
    /// fetched yet" on load.
    #[must_use]
    pub fn from_stored(stored: StoredSubscription) -> Self {
        Self {
            id: stored.id,
            contract_name: stored.contract_name,
            contract_address: stored.contract_address,
            from_block: stored.from_block,
            to_block: stored.to_block,
            fetched_to_block: None,
            indexed_to_block: stored.indexed_to_block,
            indexed_to_log_index: stored.indexed_to_log_index,
        }
    }

    /// Project the persisted fields out of this subscription (§6.3).
    #[must_use]
    pub fn to_stored(&self) -> StoredSubscription {
        StoredSubscription {
            id: self.id.clone(),
            contract_name: self.contract_name.clone(),
            contract_address: self.contract_address,
            from_block: self.from_block,
            to_block: self.to_block,
            indexed_to_block: self.indexed_to_block,
            indexed_to_log_index: self.indexed_to_log_index,
        }
    }

    /// Whether this subscription has a concrete upper bound it has fully
    /// caught up to, and should never be polled again (§3 invariant 4).
    /// A subscription that hasn't indexed anything yet is never complete,
    /// regardless of `to_block`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.indexed_to_block
            .is_some_and(|b| self.to_block.is_concrete(b))
    }

    /// The `(block, logIndex)` watermark already dispatched for this
    /// subscription, used by the processor's dedup check (§4.P step 2).
    /// `None` sorts below every real watermark (via `Option`'s derived
    /// `Ord`), so "nothing indexed yet" never wins a dedup comparison
    /// against a real event.
    #[must_use]
    pub fn indexed_watermark(&self) -> Option<(u64, u64)> {
        self.indexed_to_block
            .map(|b| (b.value(), self.indexed_to_log_index))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORED SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// The subset of a subscription's fields durably persisted by the
/// subscription store (§6.3). `fetchedToBlock` is intentionally absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    /// Stable identifier.
    pub id: String,
    /// Key into the ABI registry.
    pub contract_name: String,
    /// Checksummed contract address.
    pub contract_address: Address,
    /// Inclusive lower bound.
    pub from_block: BlockNumber,
    /// Inclusive upper bound, or `latest`.
    pub to_block: ToBlock,
    /// Highest block whose events have been fully dispatched. `None` is
    /// the `fromBlock - 1` sentinel ("nothing indexed yet").
    pub indexed_to_block: Option<BlockNumber>,
    /// Last dispatched log index within `indexed_to_block`.
    pub indexed_to_log_index: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIBE OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Options accepted by `Indexer::subscribe_to_contract` (§4.I).
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Custom subscription id. Defaults to the checksummed address when
    /// absent, so subscribing twice to the same address with no custom id
    /// is idempotent (§9 "Subscription id defaulting").
    pub id: Option<String>,
    /// Key into the ABI registry. Validated against the registry at
    /// subscribe time; an unknown name is a fatal [`crate::error::DomainError`].
    pub contract_name: String,
    /// Contract address to follow.
    pub contract_address: Address,
    /// Inclusive lower bound. Defaults to 0.
    pub from_block: Option<BlockNumber>,
    /// Inclusive upper bound. Defaults to `latest`.
    pub to_block: Option<ToBlock>,
}

impl SubscribeOptions {
    /// Start building options for following `contract_name` at
    /// `contract_address`.
    #[must_use]
    pub fn new(contract_name: impl Into<String>, contract_address: Address) -> Self {
        Self {
            id: None,
            contract_name: contract_name.into(),
            contract_address,
            from_block: None,
            to_block: None,
        }
    }

    /// Override the subscription id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the lower bound.
    #[must_use]
    pub const fn from_block(mut self, from_block: BlockNumber) -> Self {
        self.from_block = Some(from_block);
        self
    }

    /// Override the upper bound.
    #[must_use]
    pub const fn to_block(mut self, to_block: ToBlock) -> Self {
        self.to_block = Some(to_block);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::repeat_byte(0xAB)
    }

    #[test]
    fn new_subscription_has_spec_defaults() {
        let sub = Subscription::new(
            addr().to_string(),
            "Erc20".into(),
            addr(),
            BlockNumber::new(10),
            ToBlock::Latest,
        );
        assert_eq!(sub.fetched_to_block, None);
        assert_eq!(sub.indexed_to_block, None);
        assert_eq!(sub.indexed_to_log_index, 0);
    }

    /// A genesis-block event `(0, 0)` must never be mistaken for already
    /// dispatched just because `fromBlock == 0`: the sentinel has to be
    /// strictly below every real watermark, not a saturated `0` that
    /// collides with it.
    #[test]
    fn new_subscription_at_genesis_has_no_watermark_collision() {
        let sub = Subscription::new(
            addr().to_string(),
            "Erc20".into(),
            addr(),
            BlockNumber::ZERO,
            ToBlock::Latest,
        );
        assert_eq!(sub.indexed_to_block, None);
        assert_eq!(sub.indexed_watermark(), None);
        assert!(Some((0u64, 0u64)) > sub.indexed_watermark());
    }

    #[test]
    fn roundtrip_through_store_drops_fetched_to_block() {
        let mut sub = Subscription::new(
            addr().to_string(),
            "Erc20".into(),
            addr(),
            BlockNumber::ZERO,
            ToBlock::Latest,
        );
        sub.fetched_to_block = Some(BlockNumber::new(100));
        sub.indexed_to_block = Some(BlockNumber::new(50));
        let stored = sub.to_stored();
        let reloaded = Subscription::from_stored(stored);
        assert_eq!(reloaded.fetched_to_block, None);
        assert_eq!(reloaded.indexed_to_block, sub.indexed_to_block);
    }

    #[test]
    fn is_complete_only_for_concrete_to_block_reached() {
        let mut sub = Subscription::new(
            addr().to_string(),
            "Erc20".into(),
            addr(),
            BlockNumber::ZERO,
            ToBlock::Number(BlockNumber::new(50)),
        );
        assert!(!sub.is_complete());
        sub.indexed_to_block = Some(BlockNumber::new(50));
        assert!(sub.is_complete());
    }

    #[test]
    fn is_complete_false_while_nothing_indexed() {
        let sub = Subscription::new(
            addr().to_string(),
            "Erc20".into(),
            addr(),
            BlockNumber::ZERO,
            ToBlock::Number(BlockNumber::ZERO),
        );
        // Even though `toBlock == 0` and `fromBlock == 0` coincide, a
        // subscription that has dispatched nothing yet is not complete.
        assert!(!sub.is_complete());
    }
}
