//! hotcold: concurrent in-process key/value cache with CLOCK-Pro eviction
//! and per-entry expiry.
//!
//! See `DESIGN.md` for the component layout and the decisions behind the
//! tunable constants.

pub mod builder;
pub mod cache;
pub mod config;
pub mod ds;
pub mod entry;
pub mod error;
pub mod expiry;
pub mod metrics;
pub mod policy;
pub(crate) mod store;
pub mod traits;

pub mod prelude;
