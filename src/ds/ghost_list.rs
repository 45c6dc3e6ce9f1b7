//! Bounded FIFO record of recently evicted keys.
//!
//! Backs the CLOCK-Pro *test* ring: a key evicted from the cold ring is
//! remembered here without its value. If the key is admitted again while it
//! is still remembered, the eviction engine treats that as proof of reuse.
//!
//! ## Layout
//!
//! ```text
//!   index: FxHashMap<K, stamp>        order: VecDeque<(K, stamp)>
//!   ┌─────────┬─────┐                 front ─► (A,1) (B,2) (C,4) (B,5) ◄─ back
//!   │  key A  │  1  │                          oldest   stale?       newest
//!   │  key B  │  5  │
//!   │  key C  │  4  │                 (B,2) is stale: B was forgotten and
//!   └─────────┴─────┘                 recorded again under stamp 5
//! ```
//!
//! Ghost hits forget keys from the middle of the FIFO. Instead of unlinking,
//! `remove` drops the key from the index only; the queue slot goes stale and
//! is skipped when it reaches the front. Stale slots are compacted away once
//! they outnumber the live ones, so the queue stays within a constant factor
//! of the bound.
//!
//! ## Behavior
//! - `record(k)`: remembers `k` as newest, dropping the oldest key when full;
//!   recording a key that is already present keeps its position
//! - `remove(k)`: forgets `k`, returning whether it was remembered
//! - `set_capacity(n)`: changes the bound, dropping oldest keys as needed
//!
//! ## Performance
//! - `record` / `remove` / `contains`: O(1) amortized
use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Stale queue slots tolerated before a compaction, on top of the live count.
const COMPACT_SLACK: usize = 32;

/// Bounded FIFO of keys (no values) used for ghost tracking.
#[derive(Debug)]
pub struct GhostList<K> {
    order: VecDeque<(K, u64)>,
    index: FxHashMap<K, u64>,
    next_stamp: u64,
    capacity: usize,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            next_stamp: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of remembered keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` as the newest ghost, dropping the oldest if needed.
    pub fn record(&mut self, key: K) {
        if self.capacity == 0 || self.index.contains_key(&key) {
            return;
        }
        while self.index.len() >= self.capacity && self.forget_oldest().is_some() {}

        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.order.push_back((key.clone(), stamp));
        self.index.insert(key, stamp);
        self.compact_if_sparse();
    }

    /// Forgets `key`; returns `true` if it was remembered.
    pub fn remove(&mut self, key: &K) -> bool {
        let removed = self.index.remove(key).is_some();
        if removed {
            self.compact_if_sparse();
        }
        removed
    }

    /// Changes the bound, forgetting the oldest keys beyond it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.index.len() > capacity && self.forget_oldest().is_some() {}
        self.compact_if_sparse();
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    /// Pops queue slots until a live one turns up and forgets its key.
    fn forget_oldest(&mut self) -> Option<K> {
        while let Some((key, stamp)) = self.order.pop_front() {
            if self.index.get(&key) == Some(&stamp) {
                self.index.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn compact_if_sparse(&mut self) {
        if self.order.len() > 2 * self.index.len() + COMPACT_SLACK {
            let index = &self.index;
            self.order
                .retain(|(key, stamp)| index.get(key) == Some(stamp));
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.index.len() <= self.capacity);
        assert!(self.order.len() <= 2 * self.index.len() + COMPACT_SLACK);
        let mut live = 0;
        let mut last = None;
        for (key, stamp) in &self.order {
            assert!(last < Some(*stamp), "queue stamps out of order");
            last = Some(*stamp);
            if self.index.get(key) == Some(stamp) {
                live += 1;
            }
        }
        assert_eq!(live, self.index.len(), "indexed key missing from queue");
    }
}
