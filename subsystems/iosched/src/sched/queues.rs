//! Queue views over the request arena.
//!
//! A queued request lives once in the arena and is referenced by
//! [`RequestId`] from an insertion-ordered FIFO and, when sortable, from an
//! ordered index keyed by start sector.

use alloc::collections::{BTreeMap, BTreeSet};
use core::ops::Bound;

use crate::request::{Direction, IoRequest, RequestId};
use crate::time::Timestamp;

// ============================================================================
// ARENA ENTRY
// ============================================================================

/// Where a queued request currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Direction FIFO
    Fifo(Direction),
    /// Coalesce staging area
    Staging,
    /// Critical read FIFO
    #[cfg(feature = "critical-queue")]
    Critical,
}

/// Arena entry for a queued request
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    /// Host descriptor, kept current through merge notifications
    pub rq: IoRequest,
    /// FIFO expiry
    pub deadline: Timestamp,
    /// Current queue
    pub slot: Slot,
    /// FIFO sequence number, unused while staged
    pub seq: u64,
    /// Present in the ordered index (keyed by `rq.sector`)
    pub indexed: bool,
}

// ============================================================================
// ORDERED INDEX
// ============================================================================

/// Sector-ordered index for one direction
#[derive(Debug, Default)]
pub(crate) struct SortIndex {
    tree: BTreeSet<(u64, RequestId)>,
}

impl SortIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sector: u64, id: RequestId) {
        self.tree.insert((sector, id));
    }

    pub fn remove(&mut self, sector: u64, id: RequestId) -> bool {
        self.tree.remove(&(sector, id))
    }

    /// In-order successor
    pub fn next_after(&self, sector: u64, id: RequestId) -> Option<RequestId> {
        self.tree
            .range((Bound::Excluded((sector, id)), Bound::Unbounded))
            .next()
            .map(|&(_, next)| next)
    }

    /// In-order predecessor
    pub fn prev_before(&self, sector: u64, id: RequestId) -> Option<RequestId> {
        self.tree
            .range((Bound::Unbounded, Bound::Excluded((sector, id))))
            .next_back()
            .map(|&(_, prev)| prev)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }
}

// ============================================================================
// FIFO
// ============================================================================

/// Insertion-ordered queue.
///
/// Each push takes the next sequence number, and the arena entry remembers
/// it, so removal from any position is a keyed lookup.
#[derive(Debug, Default)]
pub(crate) struct Fifo {
    queue: BTreeMap<u64, RequestId>,
    next_seq: u64,
}

impl Fifo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id`, returning its sequence number
    pub fn push_back(&mut self, id: RequestId) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert(seq, id);
        seq
    }

    pub fn front(&self) -> Option<RequestId> {
        self.queue.first_key_value().map(|(_, &id)| id)
    }

    /// Remove the entry at `seq` if it still belongs to `id`
    pub fn remove(&mut self, seq: u64, id: RequestId) -> bool {
        if self.queue.get(&seq) != Some(&id) {
            return false;
        }
        self.queue.remove(&seq);
        true
    }

    /// Move `id` from `from` into the place held by `to`, evicting its holder
    pub fn take_place(&mut self, from: u64, to: u64, id: RequestId) -> bool {
        if !self.remove(from, id) {
            return false;
        }
        self.queue.insert(to, id);
        true
    }

    /// Drop `id` if it sits at the head
    pub fn discard_front(&mut self, id: RequestId) -> bool {
        match self.queue.first_key_value() {
            Some((&seq, &head)) if head == id => {
                self.queue.remove(&seq);
                true
            },
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.queue.values().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
