//! Builder for [`CacheCore`].
//!
//! Collects options into a [`CoreConfig`], validates them once and creates
//! the cache.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use hotcold::builder::CacheBuilder;
//! use hotcold::policy::EvictionKind;
//!
//! let cache = CacheBuilder::<u64, String>::new()
//!     .name("sessions")
//!     .entry_capacity(1_000)
//!     .expire_after_write(Duration::from_secs(60))
//!     .eviction(EvictionKind::ClockPro)
//!     .build()
//!     .unwrap();
//! cache.put(1, "alice".to_string());
//! assert_eq!(cache.get(&1).as_deref(), Some("alice"));
//! ```
//!
//! Weight-bounded caches need both a maximum weight and a weigher:
//!
//! ```rust
//! use hotcold::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::<u64, Vec<u8>>::new()
//!     .maximum_weight(1 << 20)
//!     .weigher(|_: &u64, v: &Vec<u8>| v.len() as u64)
//!     .build()
//!     .unwrap();
//! cache.put(1, vec![0; 512]);
//! assert_eq!(cache.info().total_weight, 512);
//! ```

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CoreConfig;
use crate::cache::CacheCore;
use crate::error::ConfigError;
use crate::expiry::{Clock, SystemClock};
use crate::policy::EvictionKind;
use crate::traits::{CacheLoader, Weigher};

/// Fluent builder for [`CacheCore`].
pub struct CacheBuilder<K, V> {
    config: CoreConfig,
    clock: Option<Arc<dyn Clock>>,
    loader: Option<Arc<dyn CacheLoader<K, V>>>,
    weigher: Option<Arc<dyn Weigher<K, V>>>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
            clock: None,
            loader: None,
            weigher: None,
            _marker: PhantomData,
        }
    }

    /// Starts from a prepared configuration.
    pub fn from_config(config: CoreConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Bounds the cache by entry count.
    pub fn entry_capacity(mut self, capacity: u64) -> Self {
        self.config.entry_capacity = Some(capacity);
        self
    }

    /// Bounds the cache by summed entry weight; requires a weigher.
    pub fn maximum_weight(mut self, weight: u64) -> Self {
        self.config.maximum_weight = Some(weight);
        self
    }

    pub fn weigher<W>(mut self, weigher: W) -> Self
    where
        W: Weigher<K, V> + 'static,
    {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    pub fn loader<L>(mut self, loader: L) -> Self
    where
        L: CacheLoader<K, V> + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn expire_after_write(mut self, after: Duration) -> Self {
        self.config.expire_after_write = Some(after);
        self
    }

    pub fn sharp_expiry(mut self, sharp: bool) -> Self {
        self.config.sharp_expiry = sharp;
        self
    }

    pub fn lenient_grace(mut self, grace: Duration) -> Self {
        self.config.lenient_grace = grace;
        self
    }

    pub fn keep_data_after_expired(mut self, keep: bool) -> Self {
        self.config.keep_data_after_expired = keep;
        self
    }

    /// Lets the clock hands take expired entries before live ones.
    pub fn preserve_non_expired(mut self, preserve: bool) -> Self {
        self.config.tuning.preserve_non_expired = preserve;
        self
    }

    pub fn eviction(mut self, kind: EvictionKind) -> Self {
        self.config.eviction = kind;
        self
    }

    pub fn hit_counter_decrease_shift(mut self, shift: u32) -> Self {
        self.config.tuning.hit_counter_decrease_shift = shift;
        self
    }

    pub fn max_hit_count(mut self, max: u32) -> Self {
        self.config.tuning.max_hit_count = max;
        self
    }

    pub fn hot_max_ratio(mut self, ratio: f64) -> Self {
        self.config.tuning.hot_max_ratio = ratio;
        self
    }

    pub fn ghost_ratio(mut self, ratio: f64) -> Self {
        self.config.tuning.ghost_ratio = ratio;
        self
    }

    /// Fixed ghost record bound, overriding the ratio.
    pub fn ghost_capacity(mut self, capacity: usize) -> Self {
        self.config.tuning.ghost_capacity = Some(capacity);
        self
    }

    /// Chunked-eviction bounds: a pass evicts `clamp(limit × ratio, min, max)`.
    pub fn eviction_chunk(mut self, min: usize, max: usize, ratio: f64) -> Self {
        self.config.tuning.min_chunk_size = min;
        self.config.tuning.max_chunk_size = max;
        self.config.tuning.chunk_ratio = ratio;
        self
    }

    pub fn shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Longest time a caller waits on another caller's load.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.load_timeout = Some(timeout);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn build(self) -> Result<CacheCore<K, V>, ConfigError> {
        self.config.validate(self.weigher.is_some())?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        Ok(CacheCore::new(self.config, clock, self.loader, self.weigher))
    }
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
