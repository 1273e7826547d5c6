//! The event queue: a min-heap of fetched-but-undecoded logs, drained by
//! the processor in the global ordering invariant (§3 invariant 3, §4.Q)
//! `(blockNumber, logIndex, subscriptionId)`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::types::PendingEvent;

/// A single queued entry, ordered by its `(blockNumber, logIndex,
/// subscriptionId)` key so the heap pops in ascending order via
/// [`Reverse`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry(PendingEvent);

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let key = |e: &Self| {
            (
                e.0.log.block_number.value(),
                e.0.log.log_index,
                e.0.subscription_id.clone(),
            )
        };
        key(self).cmp(&key(other))
    }
}

/// A priority queue of pending events, ordered ascending by block number,
/// then log index, then subscription id.
///
/// Every log the fetch planner retrieves — whether from cache or RPC — is
/// pushed here undecoded; the processor pops in order and decodes lazily
/// (§4.F step 4).
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one pending event onto the queue.
    pub fn push(&mut self, event: PendingEvent) {
        self.heap.push(Reverse(QueueEntry(event)));
    }

    /// Push many pending events at once.
    pub fn extend(&mut self, events: impl IntoIterator<Item = PendingEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// Look at the next event in drain order without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&PendingEvent> {
        self.heap.peek().map(|Reverse(e)| &e.0)
    }

    /// Pop the next event in drain order.
    pub fn pop(&mut self) -> Option<PendingEvent> {
        self.heap.pop().map(|Reverse(e)| e.0)
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
