//! Single-flight load slot.
//!
//! The first caller that misses on a key installs a [`PendingLoad`] in the
//! entry and runs the loader with the entry lock released. Every other
//! caller for that key attaches to the same slot and blocks on its condvar
//! until the leader publishes the outcome. The slot is completed exactly
//! once, whether the load succeeds, fails or panics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::CacheError;

pub(crate) type LoadOutcome<V> = Result<V, CacheError>;

#[derive(Debug)]
pub(crate) struct PendingLoad<V> {
    outcome: Mutex<Option<LoadOutcome<V>>>,
    ready: Condvar,
    waiters: AtomicUsize,
}

impl<V: Clone> PendingLoad<V> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Publishes the outcome and wakes every waiter. Later calls are ignored.
    pub(crate) fn complete(&self, outcome: LoadOutcome<V>) {
        let mut slot = self.outcome.lock();
        if slot.is_some() {
            return;
        }
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    /// Blocks until the outcome is published or `timeout` elapses.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> LoadOutcome<V> {
        self.waiters.fetch_add(1, Ordering::Relaxed);
        let deadline = timeout.map(|t| (t, Instant::now() + t));
        let mut slot = self.outcome.lock();
        let result = loop {
            if let Some(outcome) = slot.as_ref() {
                break outcome.clone();
            }
            match deadline {
                Some((after, at)) => {
                    if self.ready.wait_until(&mut slot, at).timed_out() && slot.is_none() {
                        break Err(CacheError::LoadTimeout(after));
                    }
                },
                None => self.ready.wait(&mut slot),
            }
        };
        drop(slot);
        self.waiters.fetch_sub(1, Ordering::Relaxed);
        result
    }

    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }
}

/// Completes the slot with [`CacheError::LoaderPanicked`] if dropped while
/// the leader unwinds, so its waiters are not left hanging.
pub(crate) struct CompleteOnUnwind<'a, V: Clone>(pub(crate) &'a PendingLoad<V>);

impl<V: Clone> Drop for CompleteOnUnwind<'_, V> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.complete(Err(CacheError::LoaderPanicked));
        }
    }
}
