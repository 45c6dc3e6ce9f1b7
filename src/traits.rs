//! # Collaborator Traits
//!
//! The cache core calls out to user code at exactly two seams:
//!
//! ```text
//!   ┌───────────────────────┐         ┌───────────────────────────┐
//!   │    Weigher<K, V>      │         │    CacheLoader<K, V>      │
//!   │                       │         │                           │
//!   │  weigh(&K, &V) → u64  │         │  load(&K) → Result<V, _>  │
//!   └───────────┬───────────┘         └─────────────┬─────────────┘
//!               │                                   │
//!               │  every value written              │  single-flighted per key
//!               ▼                                   ▼
//!   ┌───────────────────────────────────────────────────────────────┐
//!   │                        CacheCore<K, V>                        │
//!   └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both traits have blanket implementations for closures, so plain
//! `|key, value| ...` and `|key| ...` work wherever a weigher or loader is
//! expected.
//!
//! ## Thread Safety
//!
//! Loaders and weighers are shared between all threads using the cache and
//! must be `Send + Sync`. A loader runs without any cache lock held, so it may
//! itself call back into the cache for *other* keys.
//!
//! A panic in either leaves the key as it was before the call (absent for a
//! new key) and continues in the calling thread. Threads waiting on the same
//! load get [`CacheError::LoaderPanicked`](crate::error::CacheError::LoaderPanicked).
//!
//! | Trait             | Called                                   | Locks held       |
//! |-------------------|------------------------------------------|------------------|
//! | `Weigher`         | on insert, update, load                  | entry lock       |
//! | `CacheLoader`     | on `get_or_load` / `get_with` miss       | none             |

use crate::error::BoxError;

/// Assigns a weight to an entry for weight-bounded caches.
pub trait Weigher<K, V>: Send + Sync {
    fn weigh(&self, key: &K, value: &V) -> u64;
}

impl<K, V, F> Weigher<K, V> for F
where
    F: Fn(&K, &V) -> u64 + Send + Sync,
{
    #[inline]
    fn weigh(&self, key: &K, value: &V) -> u64 {
        self(key, value)
    }
}

/// Produces the value of a missing key.
///
/// At most one `load` per key is in flight; concurrent callers for the same
/// key share its outcome.
pub trait CacheLoader<K, V>: Send + Sync {
    fn load(&self, key: &K) -> Result<V, BoxError>;
}

impl<K, V, F> CacheLoader<K, V> for F
where
    F: Fn(&K) -> Result<V, BoxError> + Send + Sync,
{
    #[inline]
    fn load(&self, key: &K) -> Result<V, BoxError> {
        self(key)
    }
}
