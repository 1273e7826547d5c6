//! Decoded events delivered to handlers, and the undecoded envelope that
//! flows through the event queue (§3, §4.F, §4.P).

use alloy::dyn_abi::DynSolValue;

use super::log::Log;

// ═══════════════════════════════════════════════════════════════════════════════
// PENDING EVENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A log placed on the queue by the fetch planner, not yet decoded.
///
/// Decoding is deferred until dispatch time (§4.F step 4: "decoding is
/// deferred until dispatch") so that a log fetched once is never decoded
/// more than once even when duplicates reach the queue from overlapping
/// cache and RPC fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    /// The raw log.
    pub log: Log,
    /// Id of the subscription this log was fetched for.
    pub subscription_id: String,
    /// Key into the ABI registry, copied from the subscription at fetch
    /// time so the processor does not need to re-look-up the subscription
    /// just to decode (it still looks it up for the dedup check, §4.P
    /// step 1-2).
    pub contract_name: String,
}

impl PendingEvent {
    /// The ordering key used by the event queue and the global ordering
    /// invariant (§3 invariant 3, §4.Q): `(blockNumber, logIndex,
    /// subscriptionId)`.
    #[must_use]
    pub fn ordering_key(&self) -> (u64, u64, &str) {
        (
            self.log.block_number.value(),
            self.log.log_index,
            self.subscription_id.as_str(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECODED EVENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A single decoded argument of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArg {
    /// The argument's name as declared in the ABI.
    pub name: String,
    /// The decoded value.
    pub value: DynSolValue,
}

/// The result of decoding a [`Log`] against its contract's ABI.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    /// The event's name as declared in the ABI (e.g. `"Transfer"`).
    pub event_name: String,
    /// Decoded arguments in declaration order.
    pub args: Vec<DecodedArg>,
}

/// A fully decoded event, the shape delivered to user handlers (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The raw log this event was decoded from.
    pub log: Log,
    /// Key into the ABI registry.
    pub contract_name: String,
    /// The decoded event name and arguments.
    pub decoded: DecodedEvent,
    /// Id of the subscription this event was dispatched for.
    pub subscription_id: String,
}

impl Event {
    /// The handler registry key for this event: `"{contractName}:{eventName}"`
    /// (§4.P step 4, §9 "dynamic event dispatch by key").
    #[must_use]
    pub fn handler_key(&self) -> String {
        format!("{}:{}", self.contract_name, self.decoded.event_name)
    }

    /// The `(blockNumber, logIndex)` pair this event advances its
    /// subscription's cursor to (§4.P step 5).
    #[must_use]
    pub const fn watermark(&self) -> (u64, u64) {
        (self.log.block_number.value(), self.log.log_index)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256, Bytes};

    use super::*;
    use crate::types::primitives::BlockNumber;

    fn log(block: u64, idx: u64) -> Log {
        Log {
            address: Address::ZERO,
            block_hash: B256::ZERO,
            block_number: BlockNumber::new(block),
            log_index: idx,
            transaction_hash: B256::ZERO,
            transaction_index: 0,
            topics: vec![B256::repeat_byte(1)],
            data: Bytes::new(),
        }
    }

    #[test]
    fn pending_event_ordering_key_matches_block_log_sub() {
        let pe = PendingEvent {
            log: log(10, 2),
            subscription_id: "0xabc".into(),
            contract_name: "Erc20".into(),
        };
        assert_eq!(pe.ordering_key(), (10, 2, "0xabc"));
    }

    #[test]
    fn event_handler_key_is_contract_colon_event() {
        let ev = Event {
            log: log(1, 0),
            contract_name: "Erc20".into(),
            decoded: DecodedEvent {
                event_name: "Transfer".into(),
                args: vec![],
            },
            subscription_id: "0xabc".into(),
        };
        assert_eq!(ev.handler_key(), "Erc20:Transfer");
        assert_eq!(ev.watermark(), (1, 0));
    }
}
