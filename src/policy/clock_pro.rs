//! CLOCK-Pro eviction engine.
//!
//! Resident entries live on two rings, each with its own hand. Recently
//! evicted keys are remembered, value-less, in a bounded ghost record.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                   ClockProEviction<K, V> (one Mutex)                  │
//! │                                                                       │
//! │   cold: ClockRing<Node>      recently admitted or demoted             │
//! │        hand ─► [a] ─► [b] ─► [c] ─► ... ─┐                            │
//! │                ▲                        │                             │
//! │                └────────────────────────┘                             │
//! │                                                                       │
//! │   hot:  ClockRing<Node>      demonstrated reuse                       │
//! │        hand ─► [x] ─► [y] ─► ... ─┐                                   │
//! │                ▲                 │                                    │
//! │                └─────────────────┘                                    │
//! │                                                                       │
//! │   ghosts: GhostList<K>       keys evicted from cold, FIFO-bounded     │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hit counters live on the entries and are bumped lock-free by
//! [`on_access`](EvictionPolicy::on_access); only the hands read and decay
//! them.
//!
//! ## Algorithm
//!
//! ```text
//! ADMIT(e):
//!   if key(e) in ghosts: forget ghost, link e into hot   (ghost hit)
//!   else:                link e into cold
//!
//! EVICT():
//!   target = max(overflow, chunk)
//!   while over limit or victims < target:
//!     if cold empty or hot > hot_max_ratio × resident:
//!       HOT STEP:  hits >>= shift
//!                  if hits == 0 (or expired and preserving): demote to cold
//!     else COLD STEP:
//!       skip busy or non-stable entries
//!       if preserving and expired:  evict, no ghost
//!       elif hits == 0:             evict, remember key in ghosts
//!       else:                       promote to hot, hits >>= shift
//! ```
//!
//! "Expired" here means the deadline has passed, even while a lenient grace
//! still lets readers see the value. When preserving, the cold hand passes
//! over live unreferenced entries for up to one revolution looking for an
//! expired one before it settles on the first live candidate.
//!
//! Equal hit state resolves by hand position: the hand meets entries in
//! insertion order, so eviction is deterministic for a given access trace.
//!
//! ## Chunking
//!
//! A pass evicts at least `clamp(limit × chunk_ratio, min, max)` victims and
//! always continues until usage is back at or under the limit, unless the
//! scan budget runs out because candidates are busy; the outcome then
//! reports `over_limit` and the caller retries.
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::ds::clock_ring::ClockRing;
use crate::ds::ghost_list::GhostList;
use crate::ds::slot_arena::SlotId;
use crate::entry::{Entry, Membership, ProcessingState};
use crate::error::InvariantError;
use crate::expiry::ExpiryPolicy;
use crate::metrics::snapshot::EvictionSnapshot;
use crate::policy::{Capacity, EvictionOutcome, EvictionPolicy, EvictionTuning, Victim};

#[derive(Debug)]
struct Node<K, V> {
    entry: Arc<Entry<K, V>>,
    weight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    admissions: u64,
    ghost_hits: u64,
    promotions: u64,
    demotions: u64,
    eviction_runs: u64,
    evicted: u64,
    evicted_expired: u64,
    largest_chunk: u64,
    busy_skips: u64,
    scan_steps: u64,
}

/// What the cold hand did with the entry it visited.
enum ColdVisit<K, V> {
    Evicted(Victim<K, V>),
    /// Live and unreferenced; evicted only if no expired entry turns up.
    Passed,
    Kept,
}

#[derive(Debug)]
struct State<K, V> {
    cold: ClockRing<Node<K, V>>,
    hot: ClockRing<Node<K, V>>,
    ghosts: GhostList<K>,
    limit: Capacity,
    total_weight: u64,
    counters: Counters,
}

impl<K, V> State<K, V>
where
    K: Eq + Hash + Clone,
{
    fn resident(&self) -> usize {
        self.cold.len() + self.hot.len()
    }

    fn usage(&self) -> u64 {
        self.limit.usage(self.resident(), self.total_weight)
    }

    fn over_limit(&self) -> bool {
        self.usage() > self.limit.value()
    }

    fn ring_mut(&mut self, membership: Membership) -> Option<&mut ClockRing<Node<K, V>>> {
        match membership {
            Membership::Cold => Some(&mut self.cold),
            Membership::Hot => Some(&mut self.hot),
            Membership::Untracked | Membership::Ghost => None,
        }
    }

    /// Unlinks a tracked entry; panics if the ring does not hold it.
    fn unlink(&mut self, entry: &Entry<K, V>) -> Option<Node<K, V>> {
        let id = entry.node()?;
        let membership = entry.membership();
        let ring = self.ring_mut(membership)?;
        let node = match ring.remove(id) {
            Some(node) if std::ptr::eq(Arc::as_ptr(&node.entry), entry) => node,
            _ => panic!("entry tracked in {membership:?} ring is not linked there"),
        };
        self.total_weight = self.total_weight.saturating_sub(node.weight);
        entry.set_tracking(Membership::Untracked, None);
        Some(node)
    }

    fn link(&mut self, node: Node<K, V>, membership: Membership) -> SlotId {
        let entry = node.entry.clone();
        self.total_weight += node.weight;
        let id = match membership {
            Membership::Hot => self.hot.insert(node),
            _ => self.cold.insert(node),
        };
        entry.set_tracking(membership, Some(id));
        id
    }

    fn move_node(&mut self, id: SlotId, from: Membership, to: Membership) {
        let node = match self.ring_mut(from).and_then(|ring| ring.remove(id)) {
            Some(node) => node,
            None => panic!("hand position {id:?} vacant in {from:?} ring"),
        };
        self.total_weight -= node.weight;
        self.link(node, to);
    }

    fn ghost_capacity(&self, tuning: &EvictionTuning) -> usize {
        if let Some(explicit) = tuning.ghost_capacity {
            return explicit;
        }
        let base = match self.limit {
            Capacity::Entries(n) => n as f64,
            Capacity::Weight(_) => self.resident() as f64,
        };
        (base * tuning.ghost_ratio) as usize
    }

    /// Weight mode sizes the ghost record from the resident count, so it is
    /// refreshed around every pass.
    fn refresh_ghost_capacity(&mut self, tuning: &EvictionTuning) {
        let ghost_capacity = self.ghost_capacity(tuning);
        if ghost_capacity != self.ghosts.capacity() {
            self.ghosts.set_capacity(ghost_capacity);
        }
    }

    fn hot_is_full(&self, tuning: &EvictionTuning) -> bool {
        self.hot.len() as f64 > tuning.hot_max_ratio * self.resident() as f64
    }

    fn hot_step(&mut self, tuning: &EvictionTuning, expiry: &ExpiryPolicy, now: u64) {
        let Some(id) = self.hot.advance() else {
            return;
        };
        let Some(entry) = self.hot.get(id).map(|node| node.entry.clone()) else {
            return;
        };
        let remaining = entry.decay_hits(tuning.hit_counter_decrease_shift)
            >> tuning.hit_counter_decrease_shift;
        let expired = tuning.preserve_non_expired
            && entry
                .try_lock()
                .is_some_and(|state| state.is_past_deadline(expiry, now));
        if remaining == 0 || expired {
            self.move_node(id, Membership::Hot, Membership::Cold);
            self.counters.demotions += 1;
            trace!(expired, "demoted hot entry to cold");
        }
    }

    /// Visits the cold entry at `id`. With `defer_live`, a live entry without
    /// hits is passed over instead of evicted.
    fn visit_cold(
        &mut self,
        id: SlotId,
        defer_live: bool,
        tuning: &EvictionTuning,
        expiry: &ExpiryPolicy,
        now: u64,
    ) -> ColdVisit<K, V> {
        let Some(entry) = self.cold.get(id).map(|node| node.entry.clone()) else {
            return ColdVisit::Kept;
        };
        let Some(mut state) = entry.try_lock() else {
            self.counters.busy_skips += 1;
            trace!("cold hand skipped busy entry");
            return ColdVisit::Kept;
        };
        if state.processing != ProcessingState::Stable {
            self.counters.busy_skips += 1;
            trace!(processing = ?state.processing, "cold hand skipped entry in flight");
            return ColdVisit::Kept;
        }

        let expired = state.is_past_deadline(expiry, now);
        let remember = if tuning.preserve_non_expired && expired {
            false
        } else if entry.hits() == 0 {
            if defer_live {
                return ColdVisit::Passed;
            }
            true
        } else {
            drop(state);
            entry.decay_hits(tuning.hit_counter_decrease_shift);
            self.move_node(id, Membership::Cold, Membership::Hot);
            self.counters.promotions += 1;
            trace!("promoted cold entry to hot");
            return ColdVisit::Kept;
        };

        entry.destroy(&mut state, ProcessingState::Evicting);
        drop(state);
        self.unlink(&entry);
        if remember {
            self.ghosts.record(entry.key().clone());
            entry.set_tracking(Membership::Ghost, None);
        }
        self.counters.evicted += 1;
        if expired {
            self.counters.evicted_expired += 1;
        }
        ColdVisit::Evicted(Victim::new(entry, expired))
    }

    /// One cold-hand step; returns a victim if the visited entry was evicted.
    fn cold_step(
        &mut self,
        tuning: &EvictionTuning,
        expiry: &ExpiryPolicy,
        now: u64,
    ) -> Option<Victim<K, V>> {
        let id = self.cold.advance()?;
        match self.visit_cold(id, false, tuning, expiry, now) {
            ColdVisit::Evicted(victim) => Some(victim),
            ColdVisit::Passed | ColdVisit::Kept => None,
        }
    }

    /// Cold-hand search while preserving non-expired entries: live entries
    /// are passed over for one revolution, and only if nothing past its
    /// deadline turns up is the first of them evicted.
    fn cold_sweep(
        &mut self,
        tuning: &EvictionTuning,
        expiry: &ExpiryPolicy,
        now: u64,
        steps: &mut usize,
    ) -> Option<Victim<K, V>> {
        let mut fallback = None;
        for _ in 0..self.cold.len() {
            let id = self.cold.advance()?;
            *steps += 1;
            match self.visit_cold(id, true, tuning, expiry, now) {
                ColdVisit::Evicted(victim) => return Some(victim),
                ColdVisit::Passed => {
                    fallback.get_or_insert(id);
                },
                ColdVisit::Kept => {},
            }
        }
        match self.visit_cold(fallback?, false, tuning, expiry, now) {
            ColdVisit::Evicted(victim) => Some(victim),
            ColdVisit::Passed | ColdVisit::Kept => None,
        }
    }
}

/// CLOCK-Pro engine with hot, cold and ghost rings.
#[derive(Debug)]
pub struct ClockProEviction<K, V> {
    state: Mutex<State<K, V>>,
    tuning: EvictionTuning,
}

impl<K, V> ClockProEviction<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: Capacity, tuning: EvictionTuning) -> Self {
        let mut state = State {
            cold: ClockRing::new(),
            hot: ClockRing::new(),
            ghosts: GhostList::new(0),
            limit: capacity,
            total_weight: 0,
            counters: Counters::default(),
        };
        state.refresh_ghost_capacity(&tuning);
        Self {
            state: Mutex::new(state),
            tuning,
        }
    }

    pub fn cold_len(&self) -> usize {
        self.state.lock().cold.len()
    }

    pub fn hot_len(&self) -> usize {
        self.state.lock().hot.len()
    }

    pub fn ghost_len(&self) -> usize {
        self.state.lock().ghosts.len()
    }

    /// `true` if `key` is remembered as recently evicted.
    pub fn is_ghost(&self, key: &K) -> bool {
        self.state.lock().ghosts.contains(key)
    }
}

impl<K, V> EvictionPolicy<K, V> for ClockProEviction<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn name(&self) -> &'static str {
        "clock-pro"
    }

    #[inline]
    fn on_access(&self, entry: &Entry<K, V>) {
        entry.record_hit(self.tuning.max_hit_count);
    }

    fn on_admit(&self, entry: &Arc<Entry<K, V>>) -> bool {
        let mut state = self.state.lock();
        if entry.is_destroyed() || entry.node().is_some() {
            return state.over_limit();
        }
        state.counters.admissions += 1;
        let membership = if state.ghosts.remove(entry.key()) {
            state.counters.ghost_hits += 1;
            trace!("ghost hit, admitting entry hot");
            Membership::Hot
        } else {
            Membership::Cold
        };
        let node = Node {
            entry: entry.clone(),
            weight: entry.weight(),
        };
        state.link(node, membership);
        state.over_limit()
    }

    fn on_weight_change(&self, entry: &Entry<K, V>, weight: u64) -> bool {
        let mut state = self.state.lock();
        let membership = entry.membership();
        if let Some(id) = entry.node() {
            let old = state
                .ring_mut(membership)
                .and_then(|ring| ring.get_mut(id))
                .map(|node| std::mem::replace(&mut node.weight, weight));
            match old {
                Some(old) => state.total_weight = state.total_weight - old + weight,
                None => panic!("entry tracked in {membership:?} ring is not linked there"),
            }
        }
        state.over_limit()
    }

    fn on_remove(&self, entry: &Entry<K, V>) {
        let mut state = self.state.lock();
        state.unlink(entry);
    }

    fn evict(&self, expiry: &ExpiryPolicy, now: u64) -> EvictionOutcome<K, V> {
        let mut state = self.state.lock();
        if !state.over_limit() {
            return EvictionOutcome::nothing(false);
        }
        state.counters.eviction_runs += 1;

        let limit = state.limit.value();
        let chunk = self.tuning.chunk_size(limit);
        let overflow = usize::try_from(state.usage() - limit).unwrap_or(usize::MAX);
        let target = if state.limit.is_weighted() { chunk } else { overflow.max(chunk) };
        let budget = self.tuning.scan_budget(state.resident());
        state.refresh_ghost_capacity(&self.tuning);

        let mut victims = Vec::new();
        let mut steps = 0;
        while (state.over_limit() || victims.len() < target)
            && steps < budget
            && state.resident() > 0
        {
            steps += 1;
            if state.cold.is_empty() || state.hot_is_full(&self.tuning) {
                state.hot_step(&self.tuning, expiry, now);
                continue;
            }
            let victim = if self.tuning.preserve_non_expired {
                state.cold_sweep(&self.tuning, expiry, now, &mut steps)
            } else {
                state.cold_step(&self.tuning, expiry, now)
            };
            if let Some(victim) = victim {
                victims.push(victim);
            }
        }

        state.refresh_ghost_capacity(&self.tuning);
        state.counters.scan_steps += steps as u64;
        state.counters.largest_chunk = state.counters.largest_chunk.max(victims.len() as u64);

        let over_limit = state.over_limit();
        if victims.len() > 1 || over_limit {
            debug!(
                chunk,
                victims = victims.len(),
                steps,
                over_limit,
                "clock-pro eviction pass"
            );
        }
        EvictionOutcome {
            victims,
            over_limit,
        }
    }

    fn change_capacity(&self, limit: u64) {
        let mut state = self.state.lock();
        state.limit = state.limit.with_value(limit);
        state.refresh_ghost_capacity(&self.tuning);
    }

    fn capacity(&self) -> Capacity {
        self.state.lock().limit
    }

    fn snapshot(&self) -> EvictionSnapshot {
        let state = self.state.lock();
        let c = &state.counters;
        EvictionSnapshot {
            cold_len: state.cold.len(),
            hot_len: state.hot.len(),
            ghost_len: state.ghosts.len(),
            ghost_capacity: state.ghosts.capacity(),
            total_weight: state.total_weight,
            limit: state.limit.value(),
            admissions: c.admissions,
            ghost_hits: c.ghost_hits,
            promotions: c.promotions,
            demotions: c.demotions,
            eviction_runs: c.eviction_runs,
            evicted: c.evicted,
            evicted_expired: c.evicted_expired,
            largest_chunk: c.largest_chunk,
            busy_skips: c.busy_skips,
            scan_steps: c.scan_steps,
        }
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.lock();
        let mut weight = 0u64;
        for (ring, membership) in [(&state.cold, Membership::Cold), (&state.hot, Membership::Hot)] {
            for (id, node) in ring.iter() {
                let entry = &node.entry;
                if entry.membership() != membership || entry.node() != Some(id) {
                    return Err(InvariantError::new(format!(
                        "entry in {membership:?} ring reports {:?} at {:?}",
                        entry.membership(),
                        entry.node()
                    )));
                }
                if entry.is_destroyed() {
                    return Err(InvariantError::new(format!(
                        "destroyed entry still linked in {membership:?} ring"
                    )));
                }
                if state.ghosts.contains(entry.key()) {
                    return Err(InvariantError::new(format!(
                        "resident entry in {membership:?} ring also recorded as ghost"
                    )));
                }
                weight += node.weight;
            }
        }
        if weight != state.total_weight {
            return Err(InvariantError::new(format!(
                "tracked weight {} differs from ring sum {weight}",
                state.total_weight
            )));
        }
        if state.ghosts.len() > state.ghosts.capacity() {
            return Err(InvariantError::new("ghost record exceeds its bound"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::ExpiryTime;

    type Engine = ClockProEviction<u32, u32>;

    fn engine(capacity: u64) -> Engine {
        ClockProEviction::new(Capacity::Entries(capacity), EvictionTuning::default())
    }

    fn stable(key: u32) -> Arc<Entry<u32, u32>> {
        let entry = Arc::new(Entry::new(key));
        {
            let mut state = entry.lock();
            state.value = Some(key);
            state.processing = ProcessingState::Stable;
        }
        entry
    }

    fn evicted_keys(outcome: &EvictionOutcome<u32, u32>) -> Vec<u32> {
        outcome.victims.iter().map(|v| *v.entry().key()).collect()
    }

    #[test]
    fn admissions_start_cold() {
        let engine = engine(4);
        for key in 0..3 {
            assert!(!engine.on_admit(&stable(key)));
        }
        assert_eq!(engine.cold_len(), 3);
        assert_eq!(engine.hot_len(), 0);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn evicts_oldest_unreferenced_cold_entry() {
        let engine = engine(3);
        let entries: Vec<_> = (0..4).map(stable).collect();
        let mut over = false;
        for entry in &entries {
            over = engine.on_admit(entry);
        }
        assert!(over);

        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(evicted_keys(&outcome), vec![0]);
        assert!(!outcome.over_limit);
        assert!(entries[0].is_destroyed());
        assert_eq!(entries[0].membership(), Membership::Ghost);
        assert!(engine.is_ghost(&0));
        engine.check_invariants().unwrap();
    }

    #[test]
    fn referenced_cold_entry_is_promoted() {
        let engine = engine(3);
        let entries: Vec<_> = (0..4).map(stable).collect();
        for entry in &entries {
            engine.on_admit(entry);
        }
        engine.on_access(&entries[0]);

        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(evicted_keys(&outcome), vec![1]);
        assert_eq!(entries[0].membership(), Membership::Hot);
        assert_eq!(engine.hot_len(), 1);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn ghost_hit_admits_hot() {
        let engine = engine(2);
        let entries: Vec<_> = (0..3).map(stable).collect();
        for entry in &entries {
            engine.on_admit(entry);
        }
        engine.evict(&ExpiryPolicy::eternal(), 0);
        assert!(engine.is_ghost(&0));

        let again = stable(0);
        engine.on_admit(&again);
        assert_eq!(again.membership(), Membership::Hot);
        assert!(!engine.is_ghost(&0));
        assert_eq!(engine.snapshot().ghost_hits, 1);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn busy_entries_are_skipped() {
        let engine = engine(2);
        let entries: Vec<_> = (0..3).map(stable).collect();
        for entry in &entries {
            engine.on_admit(entry);
        }
        let guard = entries[0].lock();
        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        drop(guard);
        assert_eq!(evicted_keys(&outcome), vec![1]);
        assert!(!entries[0].is_destroyed());
        assert!(engine.snapshot().busy_skips >= 1);
    }

    #[test]
    fn entries_in_flight_are_not_evicted() {
        let engine = engine(1);
        let updating = stable(0);
        updating.lock().processing = ProcessingState::Updating;
        engine.on_admit(&updating);
        engine.on_admit(&stable(1));
        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(evicted_keys(&outcome), vec![1]);
        assert!(!updating.is_destroyed());
    }

    #[test]
    fn preserve_non_expired_evicts_expired_first() {
        let tuning = EvictionTuning {
            preserve_non_expired: true,
            ..EvictionTuning::default()
        };
        let engine: Engine = ClockProEviction::new(Capacity::Entries(2), tuning);
        let policy = ExpiryPolicy::new(
            Some(std::time::Duration::from_millis(1)),
            true,
            std::time::Duration::ZERO,
            true,
        );
        let live = stable(0);
        let expired = stable(1);
        expired.lock().expiry = ExpiryTime::At(5);
        let fresh = stable(2);
        engine.on_admit(&live);
        engine.on_access(&live);
        engine.on_admit(&expired);
        engine.on_access(&expired);
        engine.on_admit(&fresh);

        let outcome = engine.evict(&policy, 10);
        assert_eq!(evicted_keys(&outcome), vec![1]);
        assert!(outcome.victims[0].expired());
        assert!(!engine.is_ghost(&1));
    }

    fn preserving(capacity: u64) -> Engine {
        let tuning = EvictionTuning {
            preserve_non_expired: true,
            ..EvictionTuning::default()
        };
        ClockProEviction::new(Capacity::Entries(capacity), tuning)
    }

    fn lenient() -> ExpiryPolicy {
        ExpiryPolicy::new(
            Some(std::time::Duration::from_millis(1)),
            false,
            std::time::Duration::from_secs(1),
            true,
        )
    }

    #[test]
    fn preserving_passes_live_entries_to_reach_one_within_grace() {
        let engine = preserving(2);
        let live = stable(0);
        let expired = stable(1);
        expired.lock().expiry = ExpiryTime::At(5);
        let fresh = stable(2);
        for entry in [&live, &expired, &fresh] {
            engine.on_admit(entry);
        }

        let outcome = engine.evict(&lenient(), 10);
        assert_eq!(evicted_keys(&outcome), vec![1]);
        assert!(outcome.victims[0].expired());
        assert!(!live.is_destroyed());
        assert!(!engine.is_ghost(&1));
        engine.check_invariants().unwrap();
    }

    #[test]
    fn preserving_falls_back_to_first_live_candidate() {
        let engine = preserving(2);
        let entries: Vec<_> = (0..3).map(stable).collect();
        for entry in &entries {
            engine.on_admit(entry);
        }
        let outcome = engine.evict(&lenient(), 10);
        assert_eq!(evicted_keys(&outcome), vec![0]);
        assert!(!outcome.victims[0].expired());
        assert!(engine.is_ghost(&0));
    }

    #[test]
    fn hot_entry_past_deadline_is_demoted_despite_hits() {
        let engine = preserving(1);
        engine.on_admit(&stable(0));
        let other = stable(1);
        engine.on_admit(&other);
        engine.evict(&lenient(), 0);
        assert!(engine.is_ghost(&0));

        let hot = stable(0);
        hot.lock().expiry = ExpiryTime::At(5);
        engine.on_admit(&hot);
        assert_eq!(hot.membership(), Membership::Hot);
        for _ in 0..200 {
            engine.on_access(&hot);
        }
        engine.on_access(&other);

        let outcome = engine.evict(&lenient(), 10);
        assert_eq!(evicted_keys(&outcome), vec![0]);
        assert!(outcome.victims[0].expired());
        assert_eq!(other.membership(), Membership::Hot);
        assert_eq!(engine.snapshot().demotions, 1);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn hot_hand_demotes_when_cold_is_empty() {
        let engine = engine(2);
        let entries: Vec<_> = (0..2).map(stable).collect();
        for entry in &entries {
            engine.on_admit(entry);
            engine.on_access(entry);
        }
        // Both get promoted, then the hot hand demotes one for the cold hand.
        engine.change_capacity(1);
        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(outcome.victims.len(), 1);
        assert!(!outcome.over_limit);
        assert!(engine.snapshot().demotions >= 1);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn weight_limit_counts_weights() {
        let engine: Engine = ClockProEviction::new(Capacity::Weight(10), EvictionTuning::default());
        let heavy = stable(0);
        heavy.set_weight(8);
        assert!(!engine.on_admit(&heavy));
        let light = stable(1);
        light.set_weight(2);
        assert!(!engine.on_admit(&light));
        assert!(engine.on_weight_change(&light, 3));

        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(evicted_keys(&outcome), vec![0]);
        assert_eq!(engine.snapshot().total_weight, 3);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn weight_mode_remembers_first_victims() {
        let engine: Engine = ClockProEviction::new(Capacity::Weight(4), EvictionTuning::default());
        assert_eq!(engine.snapshot().ghost_capacity, 0);
        for key in 1..=5 {
            engine.on_admit(&stable(key));
        }
        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(evicted_keys(&outcome), vec![1]);
        assert!(engine.is_ghost(&1));
        assert_eq!(engine.ghost_len(), 1);
        assert_eq!(engine.snapshot().ghost_capacity, 2);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn chunked_pass_evicts_batch() {
        let tuning = EvictionTuning {
            chunk_ratio: 0.5,
            ..EvictionTuning::default()
        };
        let engine: Engine = ClockProEviction::new(Capacity::Entries(8), tuning);
        for key in 0..9 {
            engine.on_admit(&stable(key));
        }
        let outcome = engine.evict(&ExpiryPolicy::eternal(), 0);
        assert_eq!(evicted_keys(&outcome), vec![0, 1, 2, 3]);
        assert_eq!(engine.snapshot().largest_chunk, 4);
    }

    #[test]
    fn remove_unlinks_entry() {
        let engine = engine(4);
        let entry = stable(0);
        engine.on_admit(&entry);
        engine.on_remove(&entry);
        assert_eq!(entry.membership(), Membership::Untracked);
        assert_eq!(engine.cold_len(), 0);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn ghost_capacity_follows_capacity() {
        let engine = engine(100);
        assert_eq!(engine.snapshot().ghost_capacity, 50);
        engine.change_capacity(10);
        assert_eq!(engine.snapshot().ghost_capacity, 5);
    }
}
