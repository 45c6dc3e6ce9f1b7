// ==============================================
// EVICTION PROPERTY TESTS (integration)
// ==============================================
//
// End-to-end eviction behavior through the public cache API: capacity
// bound, reuse protection, expired-first preference, chunking, ghost
// re-admission and clear.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use hotcold::builder::CacheBuilder;
use hotcold::cache::CacheCore;
use hotcold::expiry::ManualClock;
use hotcold::policy::EvictionKind;
use proptest::prelude::*;

fn cache(capacity: u64) -> CacheCore<u64, u64> {
    CacheBuilder::new()
        .entry_capacity(capacity)
        .build()
        .unwrap()
}

// ==============================================
// Reuse Within Capacity
// ==============================================

#[test]
fn working_set_below_capacity_is_never_evicted() {
    let cache = cache(30);
    for _pass in 0..2 {
        for key in 0..15 {
            cache.put(key, key * 10);
        }
    }
    assert_eq!(cache.len(), 15);
    for key in 0..15 {
        assert_eq!(cache.peek(&key), Some(key * 10));
    }
    assert_eq!(cache.statistics().evictions, 0);
    cache.check_invariants().unwrap();
}

// ==============================================
// Expired-First Preference
// ==============================================

#[test]
fn expired_entries_are_evicted_before_live_ones() {
    let clock = Arc::new(ManualClock::new(0));
    let cache: CacheCore<u64, u64> = CacheBuilder::new()
        .entry_capacity(30)
        .expire_after_write(Duration::from_millis(1))
        .sharp_expiry(true)
        .keep_data_after_expired(true)
        .preserve_non_expired(true)
        .clock(clock.clone())
        .build()
        .unwrap();

    for key in 0..30 {
        cache.put(key, key);
    }
    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.len(), 30, "expired data is retained");

    for _pass in 0..2 {
        for key in 100..130 {
            cache.put(key, key);
        }
    }

    assert_eq!(cache.len(), 30);
    let keys: BTreeSet<u64> = cache.keys().collect();
    assert_eq!(keys, (100..130).collect::<BTreeSet<_>>());

    let stats = cache.statistics();
    assert_eq!(stats.expirations, 30);
    assert_eq!(stats.evictions, 0);
    cache.check_invariants().unwrap();
}

#[test]
fn expired_first_through_invoke_with_eternal_values() {
    use hotcold::expiry::ExpiryTime;

    let clock = Arc::new(ManualClock::new(0));
    let cache: CacheCore<u64, u64> = CacheBuilder::new()
        .entry_capacity(30)
        .expire_after_write(Duration::from_millis(1))
        .sharp_expiry(true)
        .keep_data_after_expired(true)
        .preserve_non_expired(true)
        .clock(clock.clone())
        .build()
        .unwrap();

    for key in 0..30 {
        cache.put(key, key);
    }
    clock.advance(Duration::from_secs(1));
    for _pass in 0..2 {
        for key in 100..130 {
            cache.invoke(&key, |entry| {
                entry.set_value(key);
                entry.set_expiry(ExpiryTime::Eternal);
            });
        }
    }

    let keys: BTreeSet<u64> = cache.keys().collect();
    assert_eq!(keys, (100..130).collect::<BTreeSet<_>>());
    assert_eq!(cache.len(), 30);
}

// ==============================================
// Expired-First Preference, Lenient Expiry
// ==============================================
//
// Thirty entries get a one-hour deadline through `invoke`; every `put`
// afterwards expires after 1ms and the clock moves 10ms between puts. The
// grace window keeps short-lived values readable for a second, but the
// hands must still treat them as expired.

mod lenient_preserve {
    use std::ops::Range;

    use hotcold::expiry::ExpiryTime;

    use super::*;

    const LONG_LIVED: Range<u64> = 3_000..3_030;

    fn cache(clock: &Arc<ManualClock>) -> CacheCore<u64, u64> {
        let cache: CacheCore<u64, u64> = CacheBuilder::new()
            .entry_capacity(30)
            .expire_after_write(Duration::from_millis(1))
            .sharp_expiry(false)
            .keep_data_after_expired(true)
            .preserve_non_expired(true)
            .clock(clock.clone())
            .build()
            .unwrap();
        for key in LONG_LIVED {
            cache.invoke(&key, |entry| {
                entry.set_value(key);
                entry.set_expiry(ExpiryTime::At(3_600_000));
            });
        }
        cache
    }

    fn put_spaced(cache: &CacheCore<u64, u64>, clock: &ManualClock, keys: Range<u64>) {
        for key in keys {
            cache.put(key, key);
            clock.advance(Duration::from_millis(10));
        }
    }

    fn long_lived_resident(cache: &CacheCore<u64, u64>) -> usize {
        LONG_LIVED.filter(|key| cache.contains_key(key)).count()
    }

    /// Only the first put finds nothing expired and costs one long-lived
    /// entry; every later put displaces the previous short-lived one.
    fn assert_long_lived_kept(cache: &CacheCore<u64, u64>) {
        assert_eq!(cache.len(), 30);
        assert_eq!(long_lived_resident(cache), 29);
        assert_eq!(cache.keys().count(), 30);
        assert_eq!(cache.statistics().evictions, 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn cold_expired_entries_go_before_long_lived_ones() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        put_spaced(&cache, &clock, 0..15);
        put_spaced(&cache, &clock, 0..15);
        put_spaced(&cache, &clock, 0..60);
        assert_long_lived_kept(&cache);
    }

    #[test]
    fn second_round_over_upper_half_keeps_long_lived() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        put_spaced(&cache, &clock, 0..15);
        put_spaced(&cache, &clock, 0..15);
        put_spaced(&cache, &clock, 0..60);
        put_spaced(&cache, &clock, 15..30);
        put_spaced(&cache, &clock, 15..30);
        put_spaced(&cache, &clock, 0..60);
        assert_long_lived_kept(&cache);
    }

    #[test]
    fn repeated_small_working_set_keeps_long_lived() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        put_spaced(&cache, &clock, 0..15);
        put_spaced(&cache, &clock, 0..15);
        put_spaced(&cache, &clock, 0..60);
        assert_eq!(cache.keys().count(), 30);

        put_spaced(&cache, &clock, 15..30);
        put_spaced(&cache, &clock, 15..30);
        put_spaced(&cache, &clock, 0..10);
        // 1 << (shift + 1) rounds at the default decay shift.
        for _ in 0..1 << (6 + 1) {
            put_spaced(&cache, &clock, 0..7);
        }
        put_spaced(&cache, &clock, 0..60);
        assert_long_lived_kept(&cache);
    }

    #[test]
    fn plain_clock_keeps_long_lived_too() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: CacheCore<u64, u64> = CacheBuilder::new()
            .entry_capacity(30)
            .eviction(EvictionKind::Clock)
            .expire_after_write(Duration::from_millis(1))
            .sharp_expiry(false)
            .keep_data_after_expired(true)
            .preserve_non_expired(true)
            .clock(clock.clone())
            .build()
            .unwrap();
        for key in LONG_LIVED {
            cache.invoke(&key, |entry| {
                entry.set_value(key);
                entry.set_expiry(ExpiryTime::At(3_600_000));
            });
        }
        put_spaced(&cache, &clock, 0..60);
        assert_long_lived_kept(&cache);
    }
}

// ==============================================
// Chunked Eviction
// ==============================================

#[test]
fn sustained_overflow_evicts_in_chunks() {
    let cache = cache(10_000);
    let mut previous = 0usize;
    let mut largest_drop = 0usize;
    for key in 0..20_000 {
        cache.put(key, key);
        let len = cache.len();
        if len < previous {
            largest_drop = largest_drop.max(previous - len);
        }
        previous = len;
        assert!(len <= 10_000);
    }
    assert!(largest_drop > 1, "largest size drop was {largest_drop}");
    assert!(cache.statistics().eviction.largest_chunk > 1);
}

// ==============================================
// Ghost Re-admission
// ==============================================

#[test]
fn readmitted_ghost_survives_where_fresh_key_does_not() {
    let cache = cache(4);
    for key in 1..=5 {
        cache.put(key, key);
    }
    assert!(!cache.contains_key(&1), "key 1 evicted first");

    cache.put(1, 1);
    for key in 6..=9 {
        cache.put(key, key);
    }
    assert!(cache.contains_key(&1), "re-admitted ghost is hot");
    assert!(!cache.contains_key(&6));
    assert_eq!(cache.statistics().eviction.ghost_hits, 1);

    // Same trace with a never-seen key in place of the re-admission.
    let control = self::cache(4);
    for key in 1..=5 {
        control.put(key, key);
    }
    control.put(100, 100);
    for key in 6..=9 {
        control.put(key, key);
    }
    assert!(!control.contains_key(&100));
    assert_eq!(control.statistics().eviction.ghost_hits, 0);
}

#[test]
fn frequently_read_entry_survives_scan() {
    let cache = cache(16);
    cache.put(0, 0);
    for round in 0..8 {
        assert_eq!(cache.get(&0), Some(0), "round {round}");
        for key in 0..16 {
            cache.put(1_000 + round * 16 + key, key);
        }
    }
    assert!(cache.contains_key(&0));
}

// ==============================================
// Clear
// ==============================================

#[test]
fn clear_is_idempotent_and_cache_stays_usable() {
    let cache = cache(10);
    for key in 0..10 {
        cache.put(key, key);
    }
    cache.clear();
    assert_eq!(cache.keys().count(), 0);
    cache.clear();
    assert_eq!(cache.keys().count(), 0);
    assert!(cache.is_empty());

    assert_eq!(cache.put(3, 3), None);
    assert_eq!(cache.get(&3), Some(3));
    cache.check_invariants().unwrap();
}

// ==============================================
// Capacity Bound (property)
// ==============================================

#[derive(Debug, Clone)]
enum Op {
    Put(u64),
    Get(u64),
    Remove(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..64).prop_map(Op::Put),
        3 => (0u64..64).prop_map(Op::Get),
        1 => (0u64..64).prop_map(Op::Remove),
    ]
}

fn kind() -> impl Strategy<Value = EvictionKind> {
    prop_oneof![Just(EvictionKind::ClockPro), Just(EvictionKind::Clock)]
}

proptest! {
    #[test]
    fn capacity_is_never_exceeded(
        capacity in 1u64..32,
        kind in kind(),
        ops in prop::collection::vec(op(), 1..300),
    ) {
        let cache: CacheCore<u64, u64> = CacheBuilder::new()
            .entry_capacity(capacity)
            .eviction(kind)
            .build()
            .unwrap();
        for op in ops {
            match op {
                Op::Put(key) => {
                    cache.put(key, key);
                    prop_assert!(cache.len() as u64 <= capacity);
                },
                Op::Get(key) => {
                    if let Some(value) = cache.get(&key) {
                        prop_assert_eq!(value, key);
                    }
                },
                Op::Remove(key) => {
                    cache.remove(&key);
                    prop_assert!(!cache.contains_key(&key));
                },
            }
        }
        prop_assert!(cache.check_invariants().is_ok());
    }
}
