use std::time::Duration;

use hotcold::builder::CacheBuilder;
use hotcold::error::BoxError;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cache = CacheBuilder::<u32, String>::new()
        .name("demo")
        .entry_capacity(3)
        .expire_after_write(Duration::from_secs(30))
        .loader(|k: &u32| -> Result<String, BoxError> { Ok(format!("loaded-{k}")) })
        .build()?;

    cache.put(1, "alpha".to_string());
    cache.put(2, "beta".to_string());
    cache.put(3, "gamma".to_string());

    // Key 1 is referenced, so the cold hand promotes it instead of evicting.
    println!("hit 1: {:?}", cache.get(&1));
    cache.put(4, "delta".to_string());

    println!("contains 1? {}", cache.contains_key(&1));
    println!("contains 2? {}", cache.contains_key(&2));
    println!("load 9: {}", cache.get_or_load(&9)?);

    let stats = cache.statistics();
    println!(
        "hits={} misses={} evictions={} hot={} cold={} ghosts={}",
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.eviction.hot_len,
        stats.eviction.cold_len,
        stats.eviction.ghost_len
    );
    Ok(())
}

// Expected output:
// hit 1: Some("alpha")
// contains 1? true
// contains 2? false
// load 9: loaded-9
// hits=1 misses=1 evictions=2 hot=1 cold=2 ghosts=1
//
// Run with RUST_LOG=hotcold=debug to see eviction passes.
