//! Expiry policy: computing and judging per-entry expiry times.
//!
//! Expiry is independent of eviction. The policy only reads and writes an
//! entry's [`ExpiryTime`]; the eviction engine asks [`ExpiryPolicy::is_live`]
//! when `preserve_non_expired` makes expired entries preferred victims.
//!
//! ## Modes
//!
//! ```text
//!   sharp    live  ─────────────┤ expired
//!                           expiry
//!
//!   lenient  live  ─────────────┼────────┤ expired
//!                           expiry   expiry + grace
//! ```
//!
//! With `keep_data_after_expired` an expired entry keeps its value in the
//! table until it is evicted, refreshed or explicitly removed; otherwise the
//! first access that observes the expiry reclaims it.
//!
//! Times are milliseconds on a [`Clock`]. The default [`SystemClock`] counts
//! from its creation; [`ManualClock`] is driven by hand for deterministic
//! tests.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Absolute expiry of an entry, in clock milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpiryTime {
    /// Expires at the given clock time.
    At(u64),
    /// Never expires.
    Eternal,
}

impl ExpiryTime {
    /// Expiry `after` from `now`, saturating at the end of the clock.
    pub fn after(now: u64, after: Duration) -> Self {
        let millis = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        Self::At(now.saturating_add(millis))
    }

    pub fn is_eternal(self) -> bool {
        matches!(self, Self::Eternal)
    }
}

/// Why an entry's expiry is being (re)computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// First value written into a new entry.
    Insert,
    /// Value of an existing entry replaced.
    Update,
    /// Value produced by a loader.
    Load,
    /// Value read; does not move an expire-after-write deadline.
    Read,
}

/// Millisecond time source used for expiry decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    fn millis(&self) -> u64;
}

/// Monotonic clock counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock that only moves when told to.
///
/// ```
/// use std::time::Duration;
/// use hotcold::expiry::{Clock, ManualClock};
///
/// let clock = ManualClock::new(0);
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(clock.millis(), 2_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(millis, Ordering::AcqRel);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

/// Computes and judges expiry times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    expire_after_write: Option<Duration>,
    sharp: bool,
    lenient_grace_ms: u64,
    keep_data: bool,
}

impl ExpiryPolicy {
    pub fn new(
        expire_after_write: Option<Duration>,
        sharp: bool,
        lenient_grace: Duration,
        keep_data: bool,
    ) -> Self {
        Self {
            expire_after_write,
            sharp,
            lenient_grace_ms: u64::try_from(lenient_grace.as_millis()).unwrap_or(u64::MAX),
            keep_data,
        }
    }

    /// Policy where nothing ever expires.
    pub fn eternal() -> Self {
        Self::new(None, false, Duration::ZERO, false)
    }

    /// Expiry for an entry whose current expiry is `current`.
    pub fn compute_expiry(&self, current: ExpiryTime, kind: AccessKind, now: u64) -> ExpiryTime {
        match kind {
            AccessKind::Read => current,
            AccessKind::Insert | AccessKind::Update | AccessKind::Load => {
                match self.expire_after_write {
                    Some(after) => ExpiryTime::after(now, after),
                    None => ExpiryTime::Eternal,
                }
            },
        }
    }

    /// `true` while an entry with this expiry may still be served.
    pub fn is_live(&self, expiry: ExpiryTime, now: u64) -> bool {
        match expiry {
            ExpiryTime::Eternal => true,
            ExpiryTime::At(at) if self.sharp => now < at,
            ExpiryTime::At(at) => now < at.saturating_add(self.lenient_grace_ms),
        }
    }

    pub fn is_expired(&self, expiry: ExpiryTime, now: u64) -> bool {
        !self.is_live(expiry, now)
    }

    /// `true` once the deadline itself has passed, regardless of the lenient
    /// grace. Eviction ranks victims by this, not by [`is_live`](Self::is_live).
    pub fn is_past_deadline(&self, expiry: ExpiryTime, now: u64) -> bool {
        matches!(expiry, ExpiryTime::At(at) if now >= at)
    }

    pub fn is_sharp(&self) -> bool {
        self.sharp
    }

    pub fn keep_data_after_expired(&self) -> bool {
        self.keep_data
    }

    pub fn expire_after_write(&self) -> Option<Duration> {
        self.expire_after_write
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::eternal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(sharp: bool) -> ExpiryPolicy {
        ExpiryPolicy::new(
            Some(Duration::from_millis(100)),
            sharp,
            Duration::from_millis(50),
            false,
        )
    }

    #[test]
    fn writes_compute_deadline_reads_keep_it() {
        let p = policy(true);
        let exp = p.compute_expiry(ExpiryTime::Eternal, AccessKind::Insert, 1_000);
        assert_eq!(exp, ExpiryTime::At(1_100));
        assert_eq!(p.compute_expiry(exp, AccessKind::Read, 1_050), exp);
        assert_eq!(
            p.compute_expiry(exp, AccessKind::Update, 1_050),
            ExpiryTime::At(1_150)
        );
    }

    #[test]
    fn eternal_policy_never_expires() {
        let p = ExpiryPolicy::eternal();
        let exp = p.compute_expiry(ExpiryTime::At(0), AccessKind::Load, 5);
        assert!(exp.is_eternal());
        assert!(p.is_live(exp, u64::MAX));
    }

    #[test]
    fn sharp_expiry_is_exact() {
        let p = policy(true);
        assert!(p.is_live(ExpiryTime::At(100), 99));
        assert!(p.is_expired(ExpiryTime::At(100), 100));
    }

    #[test]
    fn lenient_expiry_allows_grace() {
        let p = policy(false);
        assert!(p.is_live(ExpiryTime::At(100), 120));
        assert!(p.is_live(ExpiryTime::At(100), 149));
        assert!(p.is_expired(ExpiryTime::At(100), 150));
    }

    #[test]
    fn deadline_ignores_lenient_grace() {
        let lenient = policy(false);
        assert!(!lenient.is_past_deadline(ExpiryTime::At(100), 99));
        assert!(lenient.is_past_deadline(ExpiryTime::At(100), 100));
        assert!(lenient.is_past_deadline(ExpiryTime::At(100), 120));
        assert!(lenient.is_live(ExpiryTime::At(100), 120));
        assert!(!lenient.is_past_deadline(ExpiryTime::Eternal, u64::MAX));
    }

    #[test]
    fn expiry_after_saturates() {
        assert_eq!(
            ExpiryTime::after(u64::MAX - 1, Duration::from_secs(1)),
            ExpiryTime::At(u64::MAX)
        );
    }

    #[test]
    fn manual_clock_moves_on_demand() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.millis(), 10);
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.millis(), 15);
        clock.set(1);
        assert_eq!(clock.millis(), 1);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.millis();
        let b = clock.millis();
        assert!(b >= a);
    }
}
