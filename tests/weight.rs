// ==============================================
// WEIGHT MODE TESTS (integration)
// ==============================================
use hotcold::builder::CacheBuilder;
use hotcold::cache::CacheCore;
use hotcold::policy::Capacity;

fn weighted(max: u64) -> CacheCore<u32, Vec<u8>> {
    CacheBuilder::new()
        .maximum_weight(max)
        .weigher(|_: &u32, v: &Vec<u8>| v.len() as u64)
        .shards(1)
        .build()
        .unwrap()
}

fn total_weight(cache: &CacheCore<u32, Vec<u8>>) -> u64 {
    cache.info().total_weight
}

#[test]
fn summed_weight_stays_within_maximum() {
    let cache = weighted(100);
    for key in 0..3 {
        cache.put(key, vec![0; 30]);
    }
    assert_eq!(total_weight(&cache), 90);

    cache.put(3, vec![0; 30]);
    assert!(total_weight(&cache) <= 100);
    assert!(!cache.contains_key(&0), "oldest unreferenced entry goes first");
    assert_eq!(cache.len(), 3);
    cache.check_invariants().unwrap();
}

#[test]
fn growing_an_entry_evicts_others() {
    let cache = weighted(100);
    for key in 1..=3 {
        cache.put(key, vec![0; 30]);
    }
    cache.put(1, vec![0; 80]);

    assert!(total_weight(&cache) <= 100);
    assert_eq!(cache.peek(&1).map(|v| v.len()), Some(80));
    assert_eq!(cache.len(), 1);
    cache.check_invariants().unwrap();
}

#[test]
fn shrinking_an_entry_releases_weight() {
    let cache = weighted(100);
    cache.put(1, vec![0; 60]);
    cache.put(1, vec![0; 10]);
    assert_eq!(total_weight(&cache), 10);
    cache.put(2, vec![0; 90]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn oversized_entry_does_not_stay_resident() {
    let cache = weighted(100);
    cache.put(1, vec![0; 20]);
    cache.put(2, vec![0; 250]);
    assert!(total_weight(&cache) <= 100);
    assert!(!cache.contains_key(&2));
}

#[test]
fn removal_returns_weight() {
    let cache = weighted(100);
    cache.put(1, vec![0; 40]);
    cache.put(2, vec![0; 40]);
    assert_eq!(cache.remove(&1).map(|v| v.len()), Some(40));
    assert_eq!(total_weight(&cache), 40);
}

#[test]
fn lowering_maximum_weight_evicts_down() {
    let cache = weighted(100);
    for key in 0..10 {
        cache.put(key, vec![0; 10]);
    }
    assert_eq!(total_weight(&cache), 100);

    cache.change_capacity(35).unwrap();
    assert_eq!(cache.capacity(), Capacity::Weight(35));
    assert!(total_weight(&cache) <= 35);
    assert_eq!(cache.info().maximum_weight, Some(35));
    assert!(cache.change_capacity(0).is_err());
    cache.check_invariants().unwrap();
}

#[test]
fn entry_count_capacity_can_change() {
    let cache: CacheCore<u32, u32> = CacheBuilder::new().entry_capacity(50).build().unwrap();
    for key in 0..50 {
        cache.put(key, key);
    }
    cache.change_capacity(20).unwrap();
    assert!(cache.len() <= 20);
    cache.change_capacity(40).unwrap();
    for key in 100..140 {
        cache.put(key, key);
    }
    assert!(cache.len() <= 40);
    assert_eq!(cache.info().entry_capacity, Some(40));
}

#[test]
fn first_weight_victims_are_remembered_as_ghosts() {
    let cache = weighted(4);
    for key in 1..=5 {
        cache.put(key, vec![0]);
    }
    assert!(!cache.contains_key(&1));
    assert_eq!(cache.statistics().eviction.ghost_len, 1);

    cache.put(1, vec![0]);
    assert_eq!(cache.statistics().eviction.ghost_hits, 1);
    cache.check_invariants().unwrap();
}
