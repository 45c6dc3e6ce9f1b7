//! The unit of storage and its lifecycle state.
//!
//! An [`Entry`] is shared (`Arc`) between the entry table, the eviction
//! rings and any operation currently working on its key. Its mutable parts
//! are split by who is allowed to touch them:
//!
//! | Field        | Guarded by               | Written by                    |
//! |--------------|--------------------------|-------------------------------|
//! | `state`      | per-entry `Mutex`        | operations on the key, victims|
//! | `hits`       | atomic, lock-free        | every access; decayed by hands|
//! | `weight`     | atomic                   | writers of the value          |
//! | `node`/`membership` | eviction engine lock | the eviction engine only   |
//! | `destroyed`  | set under `state` lock   | remove, evict, reclaim        |
//!
//! ## Processing states
//!
//! ```text
//!   Inserting ──► Stable ◄──► Updating
//!       │           │
//!       │           ├──► Removing   (explicit remove, expiry reclaim)
//!       │           └──► Evicting   (chosen as victim)
//!       └──────────────► Removing   (failed first load)
//! ```
//!
//! `Removing` and `Evicting` are terminal: the entry is detached from the
//! table and rings and any holder of a stale reference must retry against
//! the table.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::cache::load::PendingLoad;
use crate::ds::slot_arena::SlotId;
use crate::expiry::{ExpiryPolicy, ExpiryTime};

const NO_NODE: u64 = u64::MAX;

/// In-flight structural work on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// Created on a miss, first value not yet established.
    Inserting,
    /// A load is replacing the value of an existing entry.
    Updating,
    /// No structural work in flight.
    Stable,
    /// Being removed (explicitly, by expiry, or after a failed first load).
    Removing,
    /// Selected as an eviction victim.
    Evicting,
}

impl ProcessingState {
    /// `true` once the entry has left the table for good.
    pub fn is_destroyed(self) -> bool {
        matches!(self, Self::Removing | Self::Evicting)
    }
}

/// Which eviction ring currently tracks an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Membership {
    Untracked = 0,
    Cold = 1,
    Hot = 2,
    /// Evicted; only its key lives on in the ghost record.
    Ghost = 3,
}

impl Membership {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Cold,
            2 => Self::Hot,
            3 => Self::Ghost,
            _ => Self::Untracked,
        }
    }
}

/// Lock-protected part of an entry.
pub(crate) struct EntryState<V> {
    pub(crate) value: Option<V>,
    pub(crate) expiry: ExpiryTime,
    pub(crate) processing: ProcessingState,
    pub(crate) pending: Option<Arc<PendingLoad<V>>>,
    /// Set by whoever establishes the first value; that caller admits the
    /// entry to the eviction engine.
    pub(crate) admitted: bool,
}

impl<V> EntryState<V> {
    /// Value if present and not expired under `policy`.
    pub(crate) fn live_value(&self, policy: &ExpiryPolicy, now: u64) -> Option<&V> {
        self.value
            .as_ref()
            .filter(|_| policy.is_live(self.expiry, now))
    }

    /// Value present but past its expiry.
    pub(crate) fn is_expired(&self, policy: &ExpiryPolicy, now: u64) -> bool {
        self.value.is_some() && policy.is_expired(self.expiry, now)
    }

    /// Value present and its deadline reached, grace or not.
    pub(crate) fn is_past_deadline(&self, policy: &ExpiryPolicy, now: u64) -> bool {
        self.value.is_some() && policy.is_past_deadline(self.expiry, now)
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.processing.is_destroyed()
    }
}

/// Cache entry: key, value, expiry, hit counter and ring membership.
pub struct Entry<K, V> {
    key: K,
    state: Mutex<EntryState<V>>,
    hits: AtomicU32,
    weight: AtomicU64,
    /// Packed [`SlotId`] of the ring node, `NO_NODE` when untracked.
    node: AtomicU64,
    membership: AtomicU8,
    destroyed: AtomicBool,
}

impl<K, V> Entry<K, V> {
    /// Fresh entry in `Inserting` state with no value.
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            state: Mutex::new(EntryState {
                value: None,
                expiry: ExpiryTime::Eternal,
                processing: ProcessingState::Inserting,
                pending: None,
                admitted: false,
            }),
            hits: AtomicU32::new(0),
            weight: AtomicU64::new(1),
            node: AtomicU64::new(NO_NODE),
            membership: AtomicU8::new(Membership::Untracked as u8),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, EntryState<V>> {
        self.state.lock()
    }

    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, EntryState<V>>> {
        self.state.try_lock()
    }

    /// Current processing state (takes the entry lock briefly).
    pub fn processing_state(&self) -> ProcessingState {
        self.state.lock().processing
    }

    /// Recent-access intensity.
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Bumps the hit counter, saturating at `max`.
    pub(crate) fn record_hit(&self, max: u32) {
        let _ = self
            .hits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |hits| {
                (hits < max).then_some(hits + 1)
            });
    }

    /// Right-shifts the hit counter and returns the value before decay.
    pub(crate) fn decay_hits(&self, shift: u32) -> u32 {
        let before = self.hits.load(Ordering::Relaxed);
        self.hits.store(before >> shift, Ordering::Relaxed);
        before
    }

    pub(crate) fn reset_hits(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }

    pub fn weight(&self) -> u64 {
        self.weight.load(Ordering::Relaxed)
    }

    pub(crate) fn set_weight(&self, weight: u64) {
        self.weight.store(weight, Ordering::Relaxed);
    }

    /// `true` once the entry was removed, reclaimed or evicted.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Moves the entry into a terminal state and hands back its value.
    ///
    /// Must be called with the entry lock held (`state` is the guarded data).
    pub(crate) fn destroy(&self, state: &mut EntryState<V>, reason: ProcessingState) -> Option<V> {
        debug_assert!(reason.is_destroyed());
        state.processing = reason;
        state.pending = None;
        self.destroyed.store(true, Ordering::Release);
        state.value.take()
    }

    pub fn membership(&self) -> Membership {
        Membership::from_u8(self.membership.load(Ordering::Acquire))
    }

    pub(crate) fn node(&self) -> Option<SlotId> {
        match self.node.load(Ordering::Acquire) {
            NO_NODE => None,
            bits => Some(SlotId::from_bits(bits)),
        }
    }

    /// Records ring placement. Only the eviction engine calls this, under its lock.
    pub(crate) fn set_tracking(&self, membership: Membership, node: Option<SlotId>) {
        self.node
            .store(node.map_or(NO_NODE, SlotId::to_bits), Ordering::Release);
        self.membership
            .store(membership as u8, Ordering::Release);
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("hits", &self.hits())
            .field("weight", &self.weight())
            .field("membership", &self.membership())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
