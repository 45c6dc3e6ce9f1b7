//! Plain CLOCK (second-chance) eviction engine.
//!
//! One ring, one hand, no hot/ghost distinction. An entry with a non-zero
//! hit counter gets a second chance: the hand clears the counter and moves
//! on; an entry with no hits since the last visit is evicted.
//!
//! ```text
//!   hand ─► [A:2] ─► [B:0] ─► [C:1] ─► [D:0] ─┐
//!            ▲                                │
//!            └────────────────────────────────┘
//!
//!   evict(): A hits=2 → clear, skip
//!            B hits=0 → victim
//! ```
//!
//! With `preserve_non_expired` an entry past its deadline is taken
//! regardless of its counter, and the hand looks one revolution ahead for
//! such an entry before taking a live one. Chunking and the scan budget
//! behave as in the CLOCK-Pro engine.
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::ds::clock_ring::ClockRing;
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

enum Visit<K, V> {
    Evicted(Victim<K, V>),
    Passed,
    Kept,
}

#[derive(Debug)]
struct State<K, V> {
    ring: ClockRing<Node<K, V>>,
    limit: Capacity,
    total_weight: u64,
    snapshot: EvictionSnapshot,
}

impl<K, V> State<K, V> {
    fn over_limit(&self) -> bool {
        self.limit.usage(self.ring.len(), self.total_weight) > self.limit.value()
    }

    fn unlink(&mut self, entry: &Entry<K, V>) {
        let Some(id) = entry.node() else {
            return;
        };
        match self.ring.remove(id) {
            Some(node) if std::ptr::eq(Arc::as_ptr(&node.entry), entry) => {
                self.total_weight = self.total_weight.saturating_sub(node.weight);
            },
            _ => panic!("entry tracked by clock ring is not linked there"),
        }
        entry.set_tracking(Membership::Untracked, None);
    }

    /// Visits the entry at `id`. With `defer_live`, a live entry without
    /// hits is passed over instead of evicted.
    fn visit(
        &mut self,
        id: SlotId,
        preserve: bool,
        defer_live: bool,
        expiry: &ExpiryPolicy,
        now: u64,
    ) -> Visit<K, V> {
        let Some(entry) = self.ring.get(id).map(|node| node.entry.clone()) else {
            return Visit::Kept;
        };
        let Some(mut state) = entry.try_lock() else {
            self.snapshot.busy_skips += 1;
            trace!("clock hand skipped busy entry");
            return Visit::Kept;
        };
        if state.processing != ProcessingState::Stable {
            self.snapshot.busy_skips += 1;
            return Visit::Kept;
        }
        let expired = state.is_past_deadline(expiry, now);
        if !(preserve && expired) {
            if entry.hits() > 0 {
                entry.reset_hits();
                return Visit::Kept;
            }
            if defer_live {
                return Visit::Passed;
            }
        }
        entry.destroy(&mut state, ProcessingState::Evicting);
        drop(state);
        self.unlink(&entry);
        self.snapshot.evicted += 1;
        if expired {
            self.snapshot.evicted_expired += 1;
        }
        Visit::Evicted(Victim::new(entry, expired))
    }

    fn step(&mut self, expiry: &ExpiryPolicy, now: u64) -> Option<Victim<K, V>> {
        let id = self.ring.advance()?;
        match self.visit(id, false, false, expiry, now) {
            Visit::Evicted(victim) => Some(victim),
            Visit::Passed | Visit::Kept => None,
        }
    }

    /// Preserving search: one revolution for an expired entry, then the
    /// first live candidate passed on the way.
    fn sweep(&mut self, expiry: &ExpiryPolicy, now: u64, steps: &mut usize) -> Option<Victim<K, V>> {
        let mut fallback = None;
        for _ in 0..self.ring.len() {
            let id = self.ring.advance()?;
            *steps += 1;
            match self.visit(id, true, true, expiry, now) {
                Visit::Evicted(victim) => return Some(victim),
                Visit::Passed => {
                    fallback.get_or_insert(id);
                },
                Visit::Kept => {},
            }
        }
        match self.visit(fallback?, true, false, expiry, now) {
            Visit::Evicted(victim) => Some(victim),
            Visit::Passed | Visit::Kept => None,
        }
    }
}

/// Second-chance CLOCK over a single ring.
#[derive(Debug)]
pub struct ClockEviction<K, V> {
    state: Mutex<State<K, V>>,
    tuning: EvictionTuning,
}

impl<K, V> ClockEviction<K, V> {
    pub fn new(capacity: Capacity, tuning: EvictionTuning) -> Self {
        Self {
            state: Mutex::new(State {
                ring: ClockRing::new(),
                limit: capacity,
                total_weight: 0,
                snapshot: EvictionSnapshot::default(),
            }),
            tuning,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> EvictionPolicy<K, V> for ClockEviction<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn name(&self) -> &'static str {
        "clock"
    }

    #[inline]
    fn on_access(&self, entry: &Entry<K, V>) {
        entry.record_hit(self.tuning.max_hit_count);
    }

    fn on_admit(&self, entry: &Arc<Entry<K, V>>) -> bool {
        let mut state = self.state.lock();
        if !entry.is_destroyed() && entry.node().is_none() {
            let weight = entry.weight();
            let id = state.ring.insert(Node {
                entry: entry.clone(),
                weight,
            });
            state.total_weight += weight;
            state.snapshot.admissions += 1;
            entry.set_tracking(Membership::Cold, Some(id));
        }
        state.over_limit()
    }

    fn on_weight_change(&self, entry: &Entry<K, V>, weight: u64) -> bool {
        let mut state = self.state.lock();
        if let Some(id) = entry.node() {
            let old = match state.ring.get_mut(id) {
                Some(node) => std::mem::replace(&mut node.weight, weight),
                None => panic!("entry tracked by clock ring is not linked there"),
            };
            state.total_weight = state.total_weight - old + weight;
        }
        state.over_limit()
    }

    fn on_remove(&self, entry: &Entry<K, V>) {
        self.state.lock().unlink(entry);
    }

    fn evict(&self, expiry: &ExpiryPolicy, now: u64) -> EvictionOutcome<K, V> {
        let mut state = self.state.lock();
        if !state.over_limit() {
            return EvictionOutcome::nothing(false);
        }
        state.snapshot.eviction_runs += 1;

        let limit = state.limit.value();
        let chunk = self.tuning.chunk_size(limit);
        let usage = state.limit.usage(state.ring.len(), state.total_weight);
        let overflow = usize::try_from(usage - limit).unwrap_or(usize::MAX);
        let target = if state.limit.is_weighted() { chunk } else { overflow.max(chunk) };
        let budget = self.tuning.scan_budget(state.ring.len());

        let mut victims = Vec::new();
        let mut steps = 0;
        while (state.over_limit() || victims.len() < target) && steps < budget && !state.ring.is_empty() {
            steps += 1;
            let victim = if self.tuning.preserve_non_expired {
                state.sweep(expiry, now, &mut steps)
            } else {
                state.step(expiry, now)
            };
            if let Some(victim) = victim {
                victims.push(victim);
            }
        }
        state.snapshot.scan_steps += steps as u64;
        state.snapshot.largest_chunk = state.snapshot.largest_chunk.max(victims.len() as u64);

        let over_limit = state.over_limit();
        if victims.len() > 1 || over_limit {
            debug!(chunk, victims = victims.len(), steps, over_limit, "clock eviction pass");
        }
        EvictionOutcome {
            victims,
            over_limit,
        }
    }

    fn change_capacity(&self, limit: u64) {
        let mut state = self.state.lock();
        state.limit = state.limit.with_value(limit);
    }

    fn capacity(&self) -> Capacity {
        self.state.lock().limit
    }

    fn snapshot(&self) -> EvictionSnapshot {
        let state = self.state.lock();
        EvictionSnapshot {
            cold_len: state.ring.len(),
            total_weight: state.total_weight,
            limit: state.limit.value(),
            ..state.snapshot
        }
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.lock();
        let mut weight = 0;
        for (id, node) in state.ring.iter() {
            if node.entry.node() != Some(id) || node.entry.membership() != Membership::Cold {
                return Err(InvariantError::new("clock ring node disagrees with its entry"));
            }
            if node.entry.is_destroyed() {
                return Err(InvariantError::new("destroyed entry still linked in clock ring"));
            }
            weight += node.weight;
        }
        if weight != state.total_weight {
            return Err(InvariantError::new(format!(
                "tracked weight {} differs from ring sum {weight}",
                state.total_weight
            )));
        }
        Ok(())
    }
}
