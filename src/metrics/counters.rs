//! Atomic operation counters owned by a cache segment.
use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::{CacheStatistics, EvictionSnapshot};

/// Operation counters for one cache segment.
///
/// Relaxed atomics: counters are observational and never drive decisions.
#[derive(Debug, Default)]
pub(crate) struct CoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    load_waits: AtomicU64,
}

impl CoreCounters {
    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_evictions(&self, n: u64) {
        self.evictions.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_expirations(&self, n: u64) {
        self.expirations.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn inc_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_load_wait(&self) {
        self.load_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters over a base snapshot (kept across `remove_all`).
    pub(crate) fn snapshot(&self, base: &CacheStatistics, eviction: EvictionSnapshot) -> CacheStatistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStatistics {
            hits: base.hits + load(&self.hits),
            misses: base.misses + load(&self.misses),
            puts: base.puts + load(&self.puts),
            removes: base.removes + load(&self.removes),
            evictions: base.evictions + load(&self.evictions),
            expirations: base.expirations + load(&self.expirations),
            loads: base.loads + load(&self.loads),
            load_failures: base.load_failures + load(&self.load_failures),
            load_waits: base.load_waits + load(&self.load_waits),
            eviction,
        }
    }
}
