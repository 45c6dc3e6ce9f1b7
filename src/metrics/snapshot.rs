use std::time::SystemTime;

/// Gauges and counters reported by an eviction engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvictionSnapshot {
    pub cold_len: usize,
    pub hot_len: usize,
    pub ghost_len: usize,
    pub ghost_capacity: usize,
    pub total_weight: u64,
    pub limit: u64,

    pub admissions: u64,
    pub ghost_hits: u64,
    pub promotions: u64,
    pub demotions: u64,
    pub eviction_runs: u64,
    pub evicted: u64,
    pub evicted_expired: u64,
    pub largest_chunk: u64,
    pub busy_skips: u64, // entries skipped because another thread held them
    pub scan_steps: u64,
}

/// Point-in-time statistics of a cache.
///
/// `clear()` starts the counters over; `remove_all()` keeps them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub removes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub load_waits: u64,

    pub eviction: EvictionSnapshot,
}

impl CacheStatistics {
    /// Fraction of reads that hit, or 0.0 before the first read.
    pub fn hit_rate(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}

/// Descriptive information about a cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub name: String,
    /// Eviction implementation in use.
    pub implementation: &'static str,
    pub size: usize,
    pub entry_capacity: Option<u64>,
    pub maximum_weight: Option<u64>,
    pub total_weight: u64,
    /// Active limit, entries or weight.
    pub capacity_limit: u64,
    pub created: SystemTime,
    pub cleared: Option<SystemTime>,
    pub loader: bool,
    pub weigher: bool,
}
