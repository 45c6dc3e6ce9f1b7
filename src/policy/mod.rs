//! Eviction engines.
//!
//! Every engine implements [`EvictionPolicy`], the narrow capability set the
//! cache core talks to: admissions, accesses, weight changes, removals,
//! eviction passes and capacity changes. [`Eviction`] is the tagged variant
//! selected by configuration.
//!
//! ## Locking
//!
//! Each engine serializes hand movement behind one internal mutex. Callers
//! may hold an entry lock while calling in; engines only ever `try_lock`
//! entries, so the order *engine → entry* never blocks.
//!
//! ```text
//!   core (holds entry lock) ──► engine lock ──► try_lock(other entries)
//!                                   │
//!                                   └─ busy entry? skip it, move the hand on
//! ```
//!
//! Victims are returned to the caller already destroyed and unlinked from
//! the rings; removing them from the entry table happens after the engine
//! lock is released.

pub mod clock;
pub mod clock_pro;

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

pub use clock::ClockEviction;
pub use clock_pro::ClockProEviction;

use crate::entry::Entry;
use crate::error::InvariantError;
use crate::expiry::ExpiryPolicy;
use crate::metrics::snapshot::EvictionSnapshot;

/// The limit an engine enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Maximum number of resident entries.
    Entries(u64),
    /// Maximum summed weight of resident entries.
    Weight(u64),
}

impl Capacity {
    pub fn value(self) -> u64 {
        match self {
            Self::Entries(n) | Self::Weight(n) => n,
        }
    }

    pub fn is_weighted(self) -> bool {
        matches!(self, Self::Weight(_))
    }

    /// Same kind of limit with a new value.
    pub fn with_value(self, value: u64) -> Self {
        match self {
            Self::Entries(_) => Self::Entries(value),
            Self::Weight(_) => Self::Weight(value),
        }
    }

    /// Current usage measured in this limit's unit.
    pub(crate) fn usage(self, resident: usize, total_weight: u64) -> u64 {
        match self {
            Self::Entries(_) => resident as u64,
            Self::Weight(_) => total_weight,
        }
    }
}

/// Knobs shared by the eviction engines.
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionTuning {
    pub hit_counter_decrease_shift: u32,
    pub max_hit_count: u32,
    pub hot_max_ratio: f64,
    pub ghost_ratio: f64,
    pub ghost_capacity: Option<usize>,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub chunk_ratio: f64,
    pub preserve_non_expired: bool,
}

impl EvictionTuning {
    /// Victims evicted per pass: `clamp(limit × ratio, min, max)`.
    pub fn chunk_size(&self, limit: u64) -> usize {
        let scaled = (limit as f64 * self.chunk_ratio) as usize;
        scaled.clamp(self.min_chunk_size, self.max_chunk_size)
    }

    /// Upper bound of hand steps in one pass over `resident` entries.
    pub(crate) fn scan_budget(&self, resident: usize) -> usize {
        resident.saturating_mul(8).max(64)
    }
}

impl Default for EvictionTuning {
    fn default() -> Self {
        Self {
            hit_counter_decrease_shift: 6,
            max_hit_count: 1 << 20,
            hot_max_ratio: 0.97,
            ghost_ratio: 0.5,
            ghost_capacity: None,
            min_chunk_size: 1,
            max_chunk_size: 64,
            chunk_ratio: 0.001,
            preserve_non_expired: false,
        }
    }
}

/// An entry removed by an eviction pass.
#[derive(Debug)]
pub struct Victim<K, V> {
    entry: Arc<Entry<K, V>>,
    expired: bool,
}

impl<K, V> Victim<K, V> {
    pub(crate) fn new(entry: Arc<Entry<K, V>>, expired: bool) -> Self {
        Self { entry, expired }
    }

    pub fn entry(&self) -> &Arc<Entry<K, V>> {
        &self.entry
    }

    /// `true` when the victim was chosen because it had expired.
    pub fn expired(&self) -> bool {
        self.expired
    }
}

/// Result of one eviction pass.
#[derive(Debug)]
pub struct EvictionOutcome<K, V> {
    pub victims: Vec<Victim<K, V>>,
    /// Still over the limit after the pass (every candidate was busy).
    pub over_limit: bool,
}

impl<K, V> EvictionOutcome<K, V> {
    pub(crate) fn nothing(over_limit: bool) -> Self {
        Self {
            victims: Vec::new(),
            over_limit,
        }
    }
}

/// Capability interface of an eviction engine.
pub trait EvictionPolicy<K, V>: Send + Sync {
    /// Implementation name reported by cache info.
    fn name(&self) -> &'static str;

    /// Records an access; never takes the engine lock.
    fn on_access(&self, entry: &Entry<K, V>);

    /// Starts tracking a newly established entry. Returns `true` if the
    /// engine is now over its limit.
    fn on_admit(&self, entry: &Arc<Entry<K, V>>) -> bool;

    /// Re-weighs a tracked entry. Returns `true` if now over the limit.
    fn on_weight_change(&self, entry: &Entry<K, V>, weight: u64) -> bool;

    /// Stops tracking an entry destroyed outside of eviction.
    fn on_remove(&self, entry: &Entry<K, V>);

    /// Runs one eviction pass if over the limit.
    fn evict(&self, expiry: &ExpiryPolicy, now: u64) -> EvictionOutcome<K, V>;

    /// Replaces the limit value; the caller runs the eviction pass.
    fn change_capacity(&self, limit: u64);

    fn capacity(&self) -> Capacity;

    fn snapshot(&self) -> EvictionSnapshot;

    fn check_invariants(&self) -> Result<(), InvariantError>;
}

/// Which eviction engine a cache runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionKind {
    /// Hot, cold and ghost rings with decayed hit counters.
    #[default]
    ClockPro,
    /// Single ring, second chance.
    Clock,
}

/// Engine selected by configuration.
pub enum Eviction<K, V> {
    ClockPro(ClockProEviction<K, V>),
    Clock(ClockEviction<K, V>),
}

impl<K, V> Eviction<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    pub fn new(kind: EvictionKind, capacity: Capacity, tuning: EvictionTuning) -> Self {
        match kind {
            EvictionKind::ClockPro => Self::ClockPro(ClockProEviction::new(capacity, tuning)),
            EvictionKind::Clock => Self::Clock(ClockEviction::new(capacity, tuning)),
        }
    }
}

impl<K, V> EvictionPolicy<K, V> for Eviction<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn name(&self) -> &'static str {
        match self {
            Self::ClockPro(engine) => engine.name(),
            Self::Clock(engine) => engine.name(),
        }
    }

    fn on_access(&self, entry: &Entry<K, V>) {
        match self {
            Self::ClockPro(engine) => engine.on_access(entry),
            Self::Clock(engine) => engine.on_access(entry),
        }
    }

    fn on_admit(&self, entry: &Arc<Entry<K, V>>) -> bool {
        match self {
            Self::ClockPro(engine) => engine.on_admit(entry),
            Self::Clock(engine) => engine.on_admit(entry),
        }
    }

    fn on_weight_change(&self, entry: &Entry<K, V>, weight: u64) -> bool {
        match self {
            Self::ClockPro(engine) => engine.on_weight_change(entry, weight),
            Self::Clock(engine) => engine.on_weight_change(entry, weight),
        }
    }

    fn on_remove(&self, entry: &Entry<K, V>) {
        match self {
            Self::ClockPro(engine) => engine.on_remove(entry),
            Self::Clock(engine) => engine.on_remove(entry),
        }
    }

    fn evict(&self, expiry: &ExpiryPolicy, now: u64) -> EvictionOutcome<K, V> {
        match self {
            Self::ClockPro(engine) => engine.evict(expiry, now),
            Self::Clock(engine) => engine.evict(expiry, now),
        }
    }

    fn change_capacity(&self, limit: u64) {
        match self {
            Self::ClockPro(engine) => engine.change_capacity(limit),
            Self::Clock(engine) => engine.change_capacity(limit),
        }
    }

    fn capacity(&self) -> Capacity {
        match self {
            Self::ClockPro(engine) => engine.capacity(),
            Self::Clock(engine) => engine.capacity(),
        }
    }

    fn snapshot(&self) -> EvictionSnapshot {
        match self {
            Self::ClockPro(engine) => engine.snapshot(),
            Self::Clock(engine) => engine.snapshot(),
        }
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        match self {
            Self::ClockPro(engine) => engine.check_invariants(),
            Self::Clock(engine) => engine.check_invariants(),
        }
    }
}

impl<K, V> fmt::Debug for Eviction<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClockPro(_) => "ClockPro",
            Self::Clock(_) => "Clock",
        };
        f.debug_tuple("Eviction").field(&name).finish()
    }
}
