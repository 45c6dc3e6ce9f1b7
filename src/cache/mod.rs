//! Cache core: orchestrates the entry table, expiry policy and eviction
//! engine behind `get`/`put`/`remove`/`invoke`.
//!
//! ## Architecture
//!
//! ```text
//!   CacheCore
//!   ├── segment: RwLock<Arc<Segment>>   swapped wholesale by clear()
//!   │     ├── table: EntryTable         key → Arc<Entry>
//!   │     ├── eviction: Eviction        rings, hands, ghosts
//!   │     ├── counters: CoreCounters
//!   │     └── closed: AtomicBool        set once detached
//!   ├── expiry: ExpiryPolicy
//!   ├── clock: Arc<dyn Clock>
//!   └── loader / weigher (optional)
//! ```
//!
//! ## Operation shape
//!
//! Every keyed operation follows the same loop:
//!
//! ```text
//!   loop:
//!     segment = current segment
//!     entry   = table.get / get_or_create(key)
//!     lock entry
//!       destroyed?      → retry (someone removed or evicted it first)
//!       segment closed? → retry or miss (clear() raced with us)
//!       load pending?   → wait for it (or share it), then retry
//!       do the work, report admit / access / remove to the engine
//!     unlock
//!     run eviction if the engine reported overflow
//! ```
//!
//! Lock order is *entry → engine → table shard*. The engine only
//! `try_lock`s entries and shard locks never wait on entries, so a table
//! removal may happen under an entry lock; the normal paths still unmap
//! after unlocking and only unwinding callbacks do it in place.

mod invoke;
mod keys;
pub(crate) mod load;

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

pub use invoke::MutableEntry;
pub use keys::Keys;

use crate::config::{CoreConfig, validate_capacity};
use crate::cache::invoke::Action;
use crate::cache::load::{CompleteOnUnwind, PendingLoad};
use crate::entry::{Entry, EntryState, ProcessingState};
use crate::error::{BoxError, CacheError, ConfigError, InvariantError};
use crate::expiry::{AccessKind, Clock, ExpiryPolicy};
use crate::metrics::counters::CoreCounters;
use crate::metrics::snapshot::{CacheInfo, CacheStatistics};
use crate::policy::{Capacity, Eviction, EvictionPolicy};
use crate::store::EntryTable;
use crate::traits::{CacheLoader, Weigher};

/// Eviction passes attempted before giving up on busy candidates.
const MAX_EVICTION_ROUNDS: usize = 8;

/// Table, engine and counters that `clear()` replaces together.
pub(crate) struct Segment<K, V> {
    pub(crate) table: EntryTable<K, V>,
    eviction: Eviction<K, V>,
    counters: CoreCounters,
    closed: AtomicBool,
}

impl<K, V> Segment<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn new(config: &CoreConfig, capacity: Capacity) -> Self {
        let hint = match capacity {
            Capacity::Entries(n) => usize::try_from(n).unwrap_or(usize::MAX).min(1 << 16),
            Capacity::Weight(_) => 0,
        };
        Self {
            table: EntryTable::new(config.shards, hint),
            eviction: Eviction::new(config.eviction, capacity, config.tuning.clone()),
            counters: CoreCounters::default(),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Concurrent key/value cache with CLOCK-Pro eviction and per-entry expiry.
///
/// Created through [`CacheBuilder`](crate::builder::CacheBuilder).
///
/// ```
/// use hotcold::builder::CacheBuilder;
///
/// let cache = CacheBuilder::<u64, String>::new().entry_capacity(100).build().unwrap();
/// assert_eq!(cache.put(1, "one".to_string()), None);
/// assert_eq!(cache.get(&1).as_deref(), Some("one"));
/// assert_eq!(cache.remove(&1).as_deref(), Some("one"));
/// assert!(cache.get(&1).is_none());
/// ```
pub struct CacheCore<K, V> {
    segment: RwLock<Arc<Segment<K, V>>>,
    config: CoreConfig,
    expiry: ExpiryPolicy,
    clock: Arc<dyn Clock>,
    loader: Option<Arc<dyn CacheLoader<K, V>>>,
    weigher: Option<Arc<dyn Weigher<K, V>>>,
    limit: AtomicU64,
    base_stats: Mutex<CacheStatistics>,
    created: SystemTime,
    cleared: Mutex<Option<SystemTime>>,
}

impl<K, V> CacheCore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub(crate) fn new(
        config: CoreConfig,
        clock: Arc<dyn Clock>,
        loader: Option<Arc<dyn CacheLoader<K, V>>>,
        weigher: Option<Arc<dyn Weigher<K, V>>>,
    ) -> Self {
        let capacity = config.capacity();
        let segment = Arc::new(Segment::new(&config, capacity));
        debug!(
            name = %config.name,
            ?capacity,
            eviction = segment.eviction.name(),
            "cache created"
        );
        Self {
            segment: RwLock::new(segment),
            expiry: config.expiry_policy(),
            config,
            clock,
            loader,
            weigher,
            limit: AtomicU64::new(capacity.value()),
            base_stats: Mutex::new(CacheStatistics::default()),
            created: SystemTime::now(),
            cleared: Mutex::new(None),
        }
    }

    fn segment(&self) -> Arc<Segment<K, V>> {
        self.segment.read().clone()
    }

    fn now(&self) -> u64 {
        self.clock.millis()
    }

    fn weigh(&self, key: &K, value: &V) -> u64 {
        self.weigher
            .as_ref()
            .map_or(1, |weigher| weigher.weigh(key, value))
    }

    // -----------------------------------------------------------------------
    // Entry helpers (called with the entry lock held)
    // -----------------------------------------------------------------------

    /// Installs `value` and reports it to the engine; returns engine overflow.
    fn store_value(
        &self,
        segment: &Segment<K, V>,
        entry: &Arc<Entry<K, V>>,
        state: &mut EntryState<V>,
        value: V,
        kind: AccessKind,
        now: u64,
    ) -> bool {
        let weight = match panic::catch_unwind(AssertUnwindSafe(|| self.weigh(entry.key(), &value))) {
            Ok(weight) => weight,
            Err(payload) => {
                self.release_after_unwind(segment, entry, state);
                panic::resume_unwind(payload)
            },
        };
        state.value = Some(value);
        state.expiry = self.expiry.compute_expiry(state.expiry, kind, now);
        state.processing = ProcessingState::Stable;
        self.track(segment, entry, state, weight)
    }

    fn track(
        &self,
        segment: &Segment<K, V>,
        entry: &Arc<Entry<K, V>>,
        state: &mut EntryState<V>,
        weight: u64,
    ) -> bool {
        if !state.admitted {
            state.admitted = true;
            entry.set_weight(weight);
            return segment.eviction.on_admit(entry);
        }
        segment.eviction.on_access(entry);
        if entry.weight() != weight {
            entry.set_weight(weight);
            return segment.eviction.on_weight_change(entry, weight);
        }
        false
    }

    /// Releases an entry after a user callback unwound while it was locked.
    /// A placeholder that never held a value is destroyed and unmapped on
    /// the spot; anything else goes back to stable.
    fn release_after_unwind(&self, segment: &Segment<K, V>, entry: &Arc<Entry<K, V>>, state: &mut EntryState<V>) {
        if state.is_destroyed() {
            return;
        }
        if state.value.is_none() && !state.admitted {
            entry.destroy(state, ProcessingState::Removing);
            segment.table.remove(entry.key(), entry);
            debug!("discarded placeholder left by a panicking callback");
        } else {
            state.processing = ProcessingState::Stable;
        }
    }

    /// Waits for a load started by another caller, at most `load_timeout`.
    ///
    /// On timeout the load is abandoned so the key does not stay blocked
    /// behind a stalled loader: every waiter gets the timeout, an inserting
    /// placeholder is destroyed and an updating entry goes back to stable.
    /// The loader's late result is then discarded.
    fn await_load(
        &self,
        segment: &Segment<K, V>,
        entry: &Arc<Entry<K, V>>,
        pending: &Arc<PendingLoad<V>>,
    ) -> Result<V, CacheError> {
        let outcome = pending.wait(self.config.load_timeout);
        if !matches!(outcome, Err(CacheError::LoadTimeout(_))) {
            return outcome;
        }
        let mut state = entry.lock();
        let owned = !state.is_destroyed()
            && state
                .pending
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, pending));
        if !owned {
            return outcome;
        }
        state.pending = None;
        let destroyed = if state.processing == ProcessingState::Inserting {
            self.destroy(segment, entry, &mut state);
            true
        } else {
            state.processing = ProcessingState::Stable;
            false
        };
        drop(state);
        if destroyed {
            segment.table.remove(entry.key(), entry);
        }
        segment.counters.inc_load_failure();
        debug!(timeout = ?self.config.load_timeout, "abandoned load after timeout");
        pending.complete(outcome.clone());
        outcome
    }

    /// Destroys a locked entry and detaches it from the engine. The caller
    /// removes it from the table after unlocking.
    fn destroy(&self, segment: &Segment<K, V>, entry: &Entry<K, V>, state: &mut EntryState<V>) -> Option<V> {
        let value = entry.destroy(state, ProcessingState::Removing);
        if state.admitted {
            segment.eviction.on_remove(entry);
        }
        value
    }

    /// Reclaims an expired entry unless expired data is kept.
    ///
    /// Returns `true` if the entry was destroyed; the caller still owns the
    /// table removal.
    fn reclaim_expired(
        &self,
        segment: &Segment<K, V>,
        entry: &Entry<K, V>,
        state: &mut EntryState<V>,
        now: u64,
    ) -> bool {
        if self.expiry.keep_data_after_expired() || !state.is_expired(&self.expiry, now) {
            return false;
        }
        self.destroy(segment, entry, state);
        segment.counters.add_expirations(1);
        trace!("reclaimed expired entry on access");
        true
    }

    /// Runs eviction passes until the engine is back under its limit.
    fn run_eviction(&self, segment: &Segment<K, V>) {
        for _ in 0..MAX_EVICTION_ROUNDS {
            let outcome = segment.eviction.evict(&self.expiry, self.now());
            let mut evicted = 0;
            let mut expired = 0;
            for victim in &outcome.victims {
                segment.table.remove(victim.entry().key(), victim.entry());
                if victim.expired() {
                    expired += 1;
                } else {
                    evicted += 1;
                }
            }
            segment.counters.add_evictions(evicted);
            segment.counters.add_expirations(expired);
            if !outcome.over_limit {
                return;
            }
            std::thread::yield_now();
        }
        warn!(
            name = %self.config.name,
            rounds = MAX_EVICTION_ROUNDS,
            "eviction could not get back under the limit; candidates busy"
        );
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Returns the live value for `key`, recording a hit or miss. Never loads.
    pub fn get(&self, key: &K) -> Option<V> {
        loop {
            let segment = self.segment();
            let Some(entry) = segment.table.get(key) else {
                segment.counters.inc_miss();
                return None;
            };
            let mut state = entry.lock();
            if state.is_destroyed() {
                trace!("get raced with removal, retrying");
                continue;
            }
            if segment.is_closed() {
                segment.counters.inc_miss();
                return None;
            }
            let now = self.now();
            if let Some(value) = state.live_value(&self.expiry, now).cloned() {
                drop(state);
                segment.eviction.on_access(&entry);
                segment.counters.inc_hit();
                return Some(value);
            }
            let reclaimed = self.reclaim_expired(&segment, &entry, &mut state, now);
            drop(state);
            if reclaimed {
                segment.table.remove(key, &entry);
            }
            segment.counters.inc_miss();
            return None;
        }
    }

    /// Live value for `key` without recording an access.
    pub fn peek(&self, key: &K) -> Option<V> {
        let segment = self.segment();
        let entry = segment.table.get(key)?;
        let state = entry.lock();
        if state.is_destroyed() || segment.is_closed() {
            return None;
        }
        state.live_value(&self.expiry, self.now()).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Returns the value for `key`, loading it with `loader` on a miss.
    ///
    /// Concurrent callers missing on the same key share one `loader` call
    /// and its outcome. A failed load leaves the key absent.
    pub fn get_with<F>(&self, key: &K, loader: F) -> Result<V, CacheError>
    where
        F: FnOnce(&K) -> Result<V, BoxError>,
    {
        loop {
            let segment = self.segment();
            let (entry, _) = segment.table.get_or_create(key);
            let mut state = entry.lock();
            if state.is_destroyed() || segment.is_closed() {
                trace!("load raced with removal or clear, retrying");
                continue;
            }
            if let Some(value) = state.live_value(&self.expiry, self.now()).cloned() {
                drop(state);
                segment.eviction.on_access(&entry);
                segment.counters.inc_hit();
                return Ok(value);
            }
            if let Some(pending) = state.pending.clone() {
                drop(state);
                segment.counters.inc_miss();
                segment.counters.inc_load_wait();
                return self.await_load(&segment, &entry, &pending);
            }

            state.processing = if state.value.is_some() {
                ProcessingState::Updating
            } else {
                ProcessingState::Inserting
            };
            let pending = Arc::new(PendingLoad::new());
            state.pending = Some(pending.clone());
            drop(state);
            segment.counters.inc_miss();
            return self.run_load(&segment, &entry, pending, loader);
        }
    }

    /// Returns the value for `key`, loading it with the configured loader.
    pub fn get_or_load(&self, key: &K) -> Result<V, CacheError> {
        let Some(loader) = self.loader.clone() else {
            return Err(ConfigError::new("no loader configured").into());
        };
        self.get_with(key, |key| loader.load(key))
    }

    fn run_load<F>(
        &self,
        segment: &Segment<K, V>,
        entry: &Arc<Entry<K, V>>,
        pending: Arc<PendingLoad<V>>,
        loader: F,
    ) -> Result<V, CacheError>
    where
        F: FnOnce(&K) -> Result<V, BoxError>,
    {
        segment.counters.inc_load();
        let _unwinding = CompleteOnUnwind(&pending);
        let key = entry.key();
        let result = panic::catch_unwind(AssertUnwindSafe(|| loader(key)));

        let mut state = entry.lock();
        // A waiter that gave up on this load may have taken the entry back.
        let owned = !state.is_destroyed()
            && state
                .pending
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &pending));
        let (outcome, panic_payload) = match result {
            Ok(Ok(value)) if owned => {
                state.pending = None;
                let over = self.store_value(
                    segment,
                    entry,
                    &mut state,
                    value.clone(),
                    AccessKind::Load,
                    self.now(),
                );
                drop(state);
                pending.complete(Ok(value.clone()));
                if over {
                    self.run_eviction(segment);
                }
                return Ok(value);
            },
            Ok(Ok(value)) => (Ok(value), None),
            Ok(Err(err)) => (Err(CacheError::load(err)), None),
            Err(payload) => (Err(CacheError::LoaderPanicked), Some(payload)),
        };

        let destroyed = if !owned {
            false
        } else if state.processing == ProcessingState::Inserting {
            self.destroy(segment, entry, &mut state);
            true
        } else {
            state.processing = ProcessingState::Stable;
            state.pending = None;
            false
        };
        drop(state);
        if destroyed {
            segment.table.remove(key, entry);
        }
        if let Err(err) = &outcome {
            segment.counters.inc_load_failure();
            debug!(error = %err, "load failed");
        }
        pending.complete(outcome.clone());
        if let Some(payload) = panic_payload {
            panic::resume_unwind(payload);
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Stores `value` under `key`, returning the previous live value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        loop {
            let segment = self.segment();
            let (entry, _) = segment.table.get_or_create(&key);
            let mut state = entry.lock();
            if state.is_destroyed() || segment.is_closed() {
                trace!("put raced with removal or clear, retrying");
                continue;
            }
            if let Some(pending) = state.pending.clone() {
                drop(state);
                let _ = self.await_load(&segment, &entry, &pending);
                continue;
            }
            let now = self.now();
            let previous = state.live_value(&self.expiry, now).cloned();
            let kind = if state.value.is_some() {
                AccessKind::Update
            } else {
                AccessKind::Insert
            };
            let over = self.store_value(&segment, &entry, &mut state, value, kind, now);
            drop(state);
            segment.counters.inc_put();
            if over {
                self.run_eviction(&segment);
            }
            return previous;
        }
    }

    /// Removes `key`, returning its live value.
    pub fn remove(&self, key: &K) -> Option<V> {
        loop {
            let segment = self.segment();
            let entry = segment.table.get(key)?;
            let mut state = entry.lock();
            if state.is_destroyed() {
                continue;
            }
            if let Some(pending) = state.pending.clone() {
                drop(state);
                let _ = self.await_load(&segment, &entry, &pending);
                continue;
            }
            if state.value.is_none() {
                return None;
            }
            let live = state.live_value(&self.expiry, self.now()).is_some();
            let value = self.destroy(&segment, &entry, &mut state);
            drop(state);
            segment.table.remove(key, &entry);
            if live {
                segment.counters.inc_remove();
                return value;
            }
            segment.counters.add_expirations(1);
            return None;
        }
    }

    /// Runs `mutator` with exclusive access to the entry of `key`.
    ///
    /// The mutator sees the live value (if any) and may set a new value,
    /// remove the entry or override its expiry; the change is applied when
    /// it returns. If it panics instead, nothing it recorded is applied and
    /// the panic continues.
    pub fn invoke<R, F>(&self, key: &K, mut mutator: F) -> R
    where
        F: FnOnce(&mut MutableEntry<'_, K, V>) -> R,
    {
        loop {
            match self.try_invoke(key, mutator) {
                Ok(result) => return result,
                Err(back) => {
                    trace!("invoke raced with removal, load or clear, retrying");
                    mutator = back;
                },
            }
        }
    }

    fn try_invoke<R, F>(&self, key: &K, mutator: F) -> Result<R, F>
    where
        F: FnOnce(&mut MutableEntry<'_, K, V>) -> R,
    {
        let segment = self.segment();
        let (entry, created) = segment.table.get_or_create(key);
        let mut state = entry.lock();
        if state.is_destroyed() || segment.is_closed() {
            return Err(mutator);
        }
        if let Some(pending) = state.pending.clone() {
            drop(state);
            let _ = self.await_load(&segment, &entry, &pending);
            return Err(mutator);
        }

        let now = self.now();
        let current = state.live_value(&self.expiry, now).cloned();
        let mut view = MutableEntry::new(key, current, state.expiry, now);
        let result = match panic::catch_unwind(AssertUnwindSafe(|| mutator(&mut view))) {
            Ok(result) => result,
            Err(payload) => {
                self.release_after_unwind(&segment, &entry, &mut state);
                panic::resume_unwind(payload)
            },
        };

        let mut over = false;
        let mut detach = false;
        match std::mem::replace(&mut view.action, Action::Keep) {
            Action::Set(value) => {
                let kind = if state.value.is_some() {
                    AccessKind::Update
                } else {
                    AccessKind::Insert
                };
                over = self.store_value(&segment, &entry, &mut state, value, kind, now);
                if let Some(expiry) = view.explicit_expiry {
                    state.expiry = expiry;
                }
                segment.counters.inc_put();
            },
            Action::Remove => {
                if state.value.is_some() {
                    self.destroy(&segment, &entry, &mut state);
                    detach = true;
                    if view.had_value() {
                        segment.counters.inc_remove();
                    }
                } else if created {
                    entry.destroy(&mut state, ProcessingState::Removing);
                    detach = true;
                }
            },
            Action::Keep => {
                if view.had_value() {
                    if let Some(expiry) = view.explicit_expiry {
                        state.expiry = expiry;
                    }
                    segment.eviction.on_access(&entry);
                } else if state.value.is_some() {
                    detach = self.reclaim_expired(&segment, &entry, &mut state, now);
                } else if created {
                    entry.destroy(&mut state, ProcessingState::Removing);
                    detach = true;
                }
            },
        }
        drop(state);
        if detach {
            segment.table.remove(key, &entry);
        }
        if over {
            self.run_eviction(&segment);
        }
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Whole-cache operations
    // -----------------------------------------------------------------------

    fn detach_segment(&self) -> Arc<Segment<K, V>> {
        let capacity = self.capacity();
        let fresh = Arc::new(Segment::new(&self.config, capacity));
        let old = std::mem::replace(&mut *self.segment.write(), fresh);
        old.closed.store(true, Ordering::Release);
        *self.cleared.lock() = Some(SystemTime::now());
        old
    }

    /// Drops every entry and all ring state, and resets the statistics.
    pub fn clear(&self) {
        let old = self.detach_segment();
        *self.base_stats.lock() = CacheStatistics::default();
        debug!(name = %self.config.name, dropped = old.table.len(), "cache cleared");
    }

    /// Drops every entry, keeping the statistics.
    pub fn remove_all(&self) {
        let old = self.detach_segment();
        let mut base = self.base_stats.lock();
        *base = old.counters.snapshot(&base, Default::default());
        debug!(name = %self.config.name, dropped = old.table.len(), "all entries removed");
    }

    /// Replaces the active limit (entries or weight) and evicts down to it.
    pub fn change_capacity(&self, limit: u64) -> Result<(), ConfigError> {
        validate_capacity(limit)?;
        let segment = self.segment();
        let previous = self.limit.swap(limit, Ordering::AcqRel);
        segment.eviction.change_capacity(limit);
        debug!(name = %self.config.name, previous, limit, "capacity changed");
        self.run_eviction(&segment);
        Ok(())
    }

    /// Active limit.
    pub fn capacity(&self) -> Capacity {
        self.config
            .capacity()
            .with_value(self.limit.load(Ordering::Acquire))
    }

    /// Removes expired entries. Returns how many were reclaimed.
    pub fn purge_expired(&self) -> usize {
        if self.expiry.keep_data_after_expired() {
            return 0;
        }
        let segment = self.segment();
        let now = self.now();
        let mut purged = 0;
        for entry in segment.table.entries() {
            let mut state = entry.lock();
            if state.is_destroyed() || state.pending.is_some() {
                continue;
            }
            let reclaimed = self.reclaim_expired(&segment, &entry, &mut state, now);
            drop(state);
            if reclaimed {
                segment.table.remove(entry.key(), &entry);
                purged += 1;
            }
        }
        if purged > 0 {
            debug!(name = %self.config.name, purged, "purged expired entries");
        }
        purged
    }

    /// Lazy iterator over live keys.
    pub fn keys(&self) -> Keys<K, V> {
        Keys::new(self.segment(), self.expiry.clone(), self.now())
    }

    /// Number of entries held, including expired ones kept by
    /// `keep_data_after_expired`.
    pub fn len(&self) -> usize {
        self.segment().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn statistics(&self) -> CacheStatistics {
        let segment = self.segment();
        let base = *self.base_stats.lock();
        segment.counters.snapshot(&base, segment.eviction.snapshot())
    }

    pub fn info(&self) -> CacheInfo {
        let segment = self.segment();
        let capacity = self.capacity();
        let (entry_capacity, maximum_weight) = match capacity {
            Capacity::Entries(n) => (Some(n), None),
            Capacity::Weight(w) => (None, Some(w)),
        };
        CacheInfo {
            name: self.config.name.clone(),
            implementation: segment.eviction.name(),
            size: segment.table.len(),
            entry_capacity,
            maximum_weight,
            total_weight: segment.eviction.snapshot().total_weight,
            capacity_limit: capacity.value(),
            created: self.created,
            cleared: *self.cleared.lock(),
            loader: self.loader.is_some(),
            weigher: self.weigher.is_some(),
        }
    }

    /// Cross-checks the table against the eviction engine.
    ///
    /// Meaningful only while no other thread mutates the cache.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let segment = self.segment();
        segment.eviction.check_invariants()?;
        let mut tracked = 0usize;
        for entry in segment.table.entries() {
            let state = entry.lock();
            if state.is_destroyed() || !state.admitted {
                continue;
            }
            if entry.node().is_none() {
                return Err(InvariantError::new("admitted entry is not tracked by any ring"));
            }
            tracked += 1;
        }
        let keys = segment.table.snapshot_keys();
        let distinct: FxHashSet<&K> = keys.iter().collect();
        if distinct.len() != keys.len() {
            return Err(InvariantError::new("a key maps to more than one live entry"));
        }
        let snapshot = segment.eviction.snapshot();
        if snapshot.cold_len + snapshot.hot_len != tracked {
            return Err(InvariantError::new(format!(
                "engine tracks {} entries, table holds {tracked}",
                snapshot.cold_len + snapshot.hot_len
            )));
        }
        Ok(())
    }
}

impl<K, V> std::fmt::Debug for CacheCore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCore")
            .field("name", &self.config.name)
            .field("limit", &self.limit.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
