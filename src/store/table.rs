//! Sharded entry table.
//!
//! ## Architecture
//! - One `RwLock<FxHashMap<K, Arc<Entry>>>` per shard; the shard is picked by
//!   a [`ShardSelector`], so every caller racing on a key meets behind the
//!   same lock.
//! - The table only maps keys to entries. Values, expiry and ring membership
//!   live on the [`Entry`] itself.
//! - Length is tracked with an atomic so `len()` never takes a lock.
//!
//! ## Core Operations
//! - `get_or_create`: atomic create-or-get; racing creators converge on one
//!   entry. A destroyed occupant is replaced in place.
//! - `remove`: compare-and-remove; only succeeds if the mapped entry is the
//!   caller's (`Arc::ptr_eq`).
//! - `shard_entries` / `entries` / `snapshot_keys`: weakly consistent
//!   per-shard snapshots.
//!
//! ## Thread Safety
//! - `Send + Sync` when `K` and `V` are.
//! - Shard locks are never held while an entry lock is taken.
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ds::shard::ShardSelector;
use crate::entry::Entry;

type Shard<K, V> = RwLock<FxHashMap<K, Arc<Entry<K, V>>>>;

/// Concurrent key → entry map with at most one live entry per key.
#[derive(Debug)]
pub(crate) struct EntryTable<K, V> {
    shards: Vec<Shard<K, V>>,
    selector: ShardSelector,
    len: AtomicUsize,
}

impl<K, V> EntryTable<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty table with `shards` shards sized for `capacity_hint`.
    pub(crate) fn new(shards: usize, capacity_hint: usize) -> Self {
        let selector = ShardSelector::new(shards, 0);
        let per_shard = capacity_hint / selector.shard_count() + 1;
        let shards = (0..selector.shard_count())
            .map(|_| {
                RwLock::new(FxHashMap::with_capacity_and_hasher(
                    per_shard,
                    Default::default(),
                ))
            })
            .collect();
        Self {
            shards,
            selector,
            len: AtomicUsize::new(0),
        }
    }

    fn shard(&self, key: &K) -> &Shard<K, V> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    /// Live (not destroyed) entry for `key`.
    pub(crate) fn get(&self, key: &K) -> Option<Arc<Entry<K, V>>> {
        self.shard(key)
            .read()
            .get(key)
            .filter(|entry| !entry.is_destroyed())
            .cloned()
    }

    /// Returns the live entry for `key`, creating one if absent.
    ///
    /// The flag is `true` when this call installed the entry.
    pub(crate) fn get_or_create(&self, key: &K) -> (Arc<Entry<K, V>>, bool) {
        if let Some(entry) = self.get(key) {
            return (entry, false);
        }

        let mut shard = self.shard(key).write();
        match shard.get_mut(key) {
            Some(existing) if !existing.is_destroyed() => (existing.clone(), false),
            Some(stale) => {
                // The remover of `stale` will fail its compare-and-remove, so
                // the length stays as is.
                let fresh = Arc::new(Entry::new(key.clone()));
                *stale = fresh.clone();
                (fresh, true)
            },
            None => {
                let fresh = Arc::new(Entry::new(key.clone()));
                shard.insert(key.clone(), fresh.clone());
                self.len.fetch_add(1, Ordering::Relaxed);
                (fresh, true)
            },
        }
    }

    /// Removes `key` only if it still maps to `expected`.
    pub(crate) fn remove(&self, key: &K, expected: &Arc<Entry<K, V>>) -> bool {
        let mut shard = self.shard(key).write();
        match shard.get(key) {
            Some(current) if Arc::ptr_eq(current, expected) => {
                shard.remove(key);
                self.len.fetch_sub(1, Ordering::Relaxed);
                true
            },
            _ => false,
        }
    }

    /// Number of mapped entries, including ones being destroyed right now.
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Snapshot of the live entries of one shard.
    pub(crate) fn shard_entries(&self, shard: usize) -> Vec<Arc<Entry<K, V>>> {
        self.shards.get(shard).map_or_else(Vec::new, |shard| {
            shard
                .read()
                .values()
                .filter(|entry| !entry.is_destroyed())
                .cloned()
                .collect()
        })
    }

    /// Snapshot of every live entry.
    pub(crate) fn entries(&self) -> Vec<Arc<Entry<K, V>>> {
        (0..self.shard_count())
            .flat_map(|shard| self.shard_entries(shard))
            .collect()
    }

    /// Snapshot of every mapped key.
    pub(crate) fn snapshot_keys(&self) -> Vec<K> {
        self.entries()
            .into_iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
