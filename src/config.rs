//! Cache configuration and its validation.
//!
//! [`CoreConfig`] carries every recognized option. It is plain data; the
//! [`CacheBuilder`](crate::builder::CacheBuilder) fills it in and calls
//! [`CoreConfig::validate`] once before a cache is created.
use std::time::Duration;

use crate::ds::shard::default_shard_count;
use crate::error::ConfigError;
use crate::expiry::ExpiryPolicy;
use crate::policy::{Capacity, EvictionKind, EvictionTuning};

/// Entry limit used when neither an entry capacity nor a weight is set.
pub const DEFAULT_ENTRY_CAPACITY: u64 = 1802;

/// Grace window of lenient expiry unless configured otherwise.
pub const DEFAULT_LENIENT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub name: String,
    pub entry_capacity: Option<u64>,
    pub maximum_weight: Option<u64>,
    pub expire_after_write: Option<Duration>,
    pub sharp_expiry: bool,
    pub lenient_grace: Duration,
    pub keep_data_after_expired: bool,
    pub eviction: EvictionKind,
    /// Hand tuning; also carries `preserve_non_expired`.
    pub tuning: EvictionTuning,
    pub shards: usize,
    pub load_timeout: Option<Duration>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            entry_capacity: None,
            maximum_weight: None,
            expire_after_write: None,
            sharp_expiry: false,
            lenient_grace: DEFAULT_LENIENT_GRACE,
            keep_data_after_expired: false,
            eviction: EvictionKind::default(),
            tuning: EvictionTuning::default(),
            shards: default_shard_count(),
            load_timeout: None,
        }
    }
}

impl CoreConfig {
    /// Active limit: weight if a maximum weight is set, entries otherwise.
    pub fn capacity(&self) -> Capacity {
        match self.maximum_weight {
            Some(weight) => Capacity::Weight(weight),
            None => Capacity::Entries(self.entry_capacity.unwrap_or(DEFAULT_ENTRY_CAPACITY)),
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(
            self.expire_after_write,
            self.sharp_expiry,
            self.lenient_grace,
            self.keep_data_after_expired,
        )
    }

    /// Checks option consistency. `has_weigher` tells whether a weigher was
    /// supplied alongside.
    pub fn validate(&self, has_weigher: bool) -> Result<(), ConfigError> {
        match (self.entry_capacity, self.maximum_weight) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::new(
                    "entry capacity and maximum weight are mutually exclusive",
                ));
            },
            (Some(0), None) => return Err(ConfigError::new("entry capacity must be > 0")),
            (None, Some(0)) => return Err(ConfigError::new("maximum weight must be > 0")),
            _ => {},
        }
        if self.maximum_weight.is_some() && !has_weigher {
            return Err(ConfigError::new("maximum weight requires a weigher"));
        }
        if self.maximum_weight.is_none() && has_weigher {
            return Err(ConfigError::new("a weigher requires a maximum weight"));
        }
        validate_tuning(&self.tuning)?;
        if self.shards == 0 {
            return Err(ConfigError::new("shard count must be > 0"));
        }
        Ok(())
    }
}

/// Validates a capacity change requested at runtime.
pub fn validate_capacity(limit: u64) -> Result<(), ConfigError> {
    if limit == 0 {
        return Err(ConfigError::new("capacity must be > 0"));
    }
    Ok(())
}

fn validate_tuning(tuning: &EvictionTuning) -> Result<(), ConfigError> {
    if tuning.hit_counter_decrease_shift > 31 {
        return Err(ConfigError::new("hit counter decrease shift must be <= 31"));
    }
    if tuning.max_hit_count == 0 {
        return Err(ConfigError::new("max hit count must be > 0"));
    }
    if !(tuning.hot_max_ratio > 0.0 && tuning.hot_max_ratio <= 1.0) {
        return Err(ConfigError::new("hot max ratio must be in (0, 1]"));
    }
    if !tuning.ghost_ratio.is_finite() || tuning.ghost_ratio < 0.0 {
        return Err(ConfigError::new("ghost ratio must be finite and >= 0"));
    }
    if !tuning.chunk_ratio.is_finite() || tuning.chunk_ratio < 0.0 {
        return Err(ConfigError::new("chunk ratio must be finite and >= 0"));
    }
    if tuning.min_chunk_size == 0 {
        return Err(ConfigError::new("min chunk size must be > 0"));
    }
    if tuning.min_chunk_size > tuning.max_chunk_size {
        return Err(ConfigError::new("min chunk size exceeds max chunk size"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CoreConfig::default();
        config.validate(false).unwrap();
        assert_eq!(config.capacity(), Capacity::Entries(DEFAULT_ENTRY_CAPACITY));
        assert_eq!(config.name, "default");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = CoreConfig {
            entry_capacity: Some(0),
            ..CoreConfig::default()
        };
        let err = config.validate(false).unwrap_err();
        assert!(err.message().contains("capacity"));
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(1).is_ok());
    }

    #[test]
    fn weight_requires_weigher() {
        let config = CoreConfig {
            maximum_weight: Some(100),
            ..CoreConfig::default()
        };
        assert!(config.validate(false).is_err());
        config.validate(true).unwrap();
        assert_eq!(config.capacity(), Capacity::Weight(100));
        assert!(CoreConfig::default().validate(true).is_err());
    }

    #[test]
    fn both_limits_are_rejected() {
        let config = CoreConfig {
            entry_capacity: Some(10),
            maximum_weight: Some(100),
            ..CoreConfig::default()
        };
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn tuning_ranges_are_checked() {
        let mut config = CoreConfig::default();
        config.tuning.hit_counter_decrease_shift = 32;
        assert!(config.validate(false).is_err());

        let mut config = CoreConfig::default();
        config.tuning.min_chunk_size = 10;
        config.tuning.max_chunk_size = 5;
        assert!(config.validate(false).is_err());

        let mut config = CoreConfig::default();
        config.tuning.hot_max_ratio = 0.0;
        assert!(config.validate(false).is_err());

        let mut config = CoreConfig::default();
        config.tuning.ghost_ratio = f64::NAN;
        assert!(config.validate(false).is_err());
    }
}
