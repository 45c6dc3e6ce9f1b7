pub use crate::builder::CacheBuilder;
pub use crate::config::CoreConfig;
pub use crate::cache::{CacheCore, Keys, MutableEntry};
pub use crate::error::{BoxError, CacheError, ConfigError, InvariantError};
pub use crate::expiry::{Clock, ExpiryPolicy, ExpiryTime, ManualClock, SystemClock};
pub use crate::metrics::{CacheInfo, CacheStatistics, EvictionSnapshot};
pub use crate::policy::{Capacity, EvictionKind, EvictionPolicy};
pub use crate::traits::{CacheLoader, Weigher};
