use std::hash::Hash;
use std::sync::Arc;

use crate::cache::Segment;
use crate::entry::Entry;
use crate::expiry::ExpiryPolicy;

/// Lazy, weakly consistent iterator over the live keys of a cache.
///
/// Snapshots one shard at a time. Keys inserted or removed while iterating
/// may or may not be seen; every yielded key held a live value when its
/// shard was visited.
pub struct Keys<K, V> {
    segment: Arc<Segment<K, V>>,
    expiry: ExpiryPolicy,
    now: u64,
    shard: usize,
    pending: std::vec::IntoIter<Arc<Entry<K, V>>>,
}

impl<K, V> Keys<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(segment: Arc<Segment<K, V>>, expiry: ExpiryPolicy, now: u64) -> Self {
        Self {
            segment,
            expiry,
            now,
            shard: 0,
            pending: Vec::new().into_iter(),
        }
    }
}

impl<K, V> Iterator for Keys<K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        loop {
            for entry in self.pending.by_ref() {
                let state = entry.lock();
                if !state.is_destroyed() && state.live_value(&self.expiry, self.now).is_some() {
                    return Some(entry.key().clone());
                }
            }
            if self.shard >= self.segment.table.shard_count() {
                return None;
            }
            self.pending = self.segment.table.shard_entries(self.shard).into_iter();
            self.shard += 1;
        }
    }
}
