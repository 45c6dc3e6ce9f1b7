//! Deterministic key-to-shard mapping for the entry table.
//!
//! ## Architecture
//!
//! ```text
//!   key ──► FxHasher(seed, key) ──► hash % shards ──► shard index
//!
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │
//!   │  keys   │  keys   │  keys   │  keys   │
//!   │  A, E   │  B, F   │  C, G   │  D, H   │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! Same `(key, seed, shards)` always yields the same shard, so every caller
//! racing on one key ends up behind the same shard lock.
//!
//! ## Example Usage
//!
//! ```
//! use hotcold::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4, 0);
//! let shard = selector.shard_for_key(&"user:123");
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key(&"user:123"), shard);
//! ```

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Deterministic shard selector using a seeded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with the given `seed`.
    ///
    /// The shard count is clamped to at least 1.
    ///
    /// ```
    /// use hotcold::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(16, 0).shard_count(), 16);
    /// assert_eq!(ShardSelector::new(0, 0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards
    }
}

impl Default for ShardSelector {
    /// One shard per available CPU, seed 0.
    fn default() -> Self {
        Self::new(default_shard_count(), 0)
    }
}

/// Shard count used when none is configured.
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}
