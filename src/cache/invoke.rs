//! Entry view handed to `invoke` mutators.
use crate::expiry::ExpiryTime;

#[derive(Debug)]
pub(crate) enum Action<V> {
    Keep,
    Set(V),
    Remove,
}

/// Exclusive view of one key during [`CacheCore::invoke`](crate::cache::CacheCore::invoke).
///
/// The entry stays locked while the mutator runs; the recorded action is
/// applied when the mutator returns.
///
/// ```
/// use hotcold::builder::CacheBuilder;
///
/// let cache = CacheBuilder::<&str, u32>::new().entry_capacity(8).build().unwrap();
/// cache.put("hits", 1);
/// let next = cache.invoke(&"hits", |entry| {
///     let next = entry.value().copied().unwrap_or(0) + 1;
///     entry.set_value(next);
///     next
/// });
/// assert_eq!(next, 2);
/// assert_eq!(cache.get(&"hits"), Some(2));
/// ```
#[derive(Debug)]
pub struct MutableEntry<'a, K, V> {
    key: &'a K,
    now: u64,
    current: Option<V>,
    expiry: ExpiryTime,
    pub(crate) action: Action<V>,
    pub(crate) explicit_expiry: Option<ExpiryTime>,
}

impl<'a, K, V> MutableEntry<'a, K, V> {
    pub(crate) fn new(key: &'a K, current: Option<V>, expiry: ExpiryTime, now: u64) -> Self {
        Self {
            key,
            now,
            current,
            expiry,
            action: Action::Keep,
            explicit_expiry: None,
        }
    }

    pub fn key(&self) -> &K {
        self.key
    }

    /// `true` if the entry currently holds a live value, including one set
    /// earlier in this invocation.
    pub fn exists(&self) -> bool {
        self.value().is_some()
    }

    pub fn value(&self) -> Option<&V> {
        match &self.action {
            Action::Keep => self.current.as_ref(),
            Action::Set(value) => Some(value),
            Action::Remove => None,
        }
    }

    pub fn set_value(&mut self, value: V) {
        self.action = Action::Set(value);
    }

    pub fn remove(&mut self) {
        self.action = Action::Remove;
        self.explicit_expiry = None;
    }

    /// Overrides the computed expiry of the value this invocation leaves.
    pub fn set_expiry(&mut self, expiry: ExpiryTime) {
        self.explicit_expiry = Some(expiry);
    }

    pub fn expiry(&self) -> ExpiryTime {
        self.explicit_expiry.unwrap_or(self.expiry)
    }

    /// Clock time at which the invocation started.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub(crate) fn had_value(&self) -> bool {
        self.current.is_some()
    }
}
