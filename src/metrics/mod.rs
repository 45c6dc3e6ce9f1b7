pub(crate) mod counters;
pub mod snapshot;

pub use snapshot::{CacheInfo, CacheStatistics, EvictionSnapshot};
