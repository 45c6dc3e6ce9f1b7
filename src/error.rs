//! Error types for the hotcold engine.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: invalid configuration, reported when a cache is built
//!   or when a capacity change is requested (e.g. zero capacity, weight limit
//!   without a weigher).
//! - [`InvariantError`]: an internal invariant does not hold. Returned by
//!   `check_invariants` methods; engine code that detects such a state on a
//!   hot path panics with the same message instead.
//! - [`CacheError`]: failure of a single operation (`get_with`, `get_or_load`),
//!   shared between every caller single-flighted on the same load.
//!
//! ## Example Usage
//!
//! ```
//! use hotcold::builder::CacheBuilder;
//! use hotcold::error::ConfigError;
//!
//! let bad: Result<_, ConfigError> = CacheBuilder::<u64, u64>::new().entry_capacity(0).build();
//! assert!(bad.unwrap_err().to_string().contains("capacity"));
//! ```

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Boxed error produced by a loader.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Failure surfaced by a cache operation.
///
/// Cloneable so one load outcome can be handed to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The loader returned an error.
    #[error("loader failed: {0}")]
    Load(Arc<dyn StdError + Send + Sync + 'static>),

    /// Waiting for another caller's load took longer than the configured timeout.
    #[error("timed out after {0:?} waiting for an in-flight load")]
    LoadTimeout(Duration),

    /// The loading thread panicked before producing a value.
    #[error("loader panicked")]
    LoaderPanicked,

    /// The operation needs configuration the cache does not have.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CacheError {
    pub(crate) fn load(err: BoxError) -> Self {
        Self::Load(Arc::from(err))
    }

    /// Returns `true` for errors that came from the loader itself.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Load(_) | Self::LoaderPanicked)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
