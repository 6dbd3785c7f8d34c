//! Tiered lookup tables.
//!
//! - breakpoint tables and the tier resolver (`table`)
//! - greedy decomposition into fixed denominations (`breakdown`)
//! - the built-in bean/diamond schedules (`schedule`)
//!
//! Tables are plain values: build one (or load it from JSON via `io::config`)
//! and pass it to whatever needs it. Nothing here holds global state.

pub mod breakdown;
pub mod schedule;
pub mod table;

pub use breakdown::*;
pub use schedule::*;
pub use table::*;

use thiserror::Error;

/// Errors raised while building or querying tier tables and denomination lists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TierError {
    #[error("Invalid input {0}: tier lookups require a finite, non-negative quantity.")]
    InvalidInput(f64),

    #[error("Tier table '{0}' has no tiers.")]
    EmptyTable(String),

    #[error("Tier table '{table}' has a duplicate threshold {threshold}.")]
    DuplicateThreshold { table: String, threshold: f64 },

    #[error("Tier table '{table}' has an invalid threshold {threshold} (must be finite and >= 0).")]
    InvalidThreshold { table: String, threshold: f64 },

    #[error("Tier table '{table}' has an invalid value {value} (must be finite and >= 0).")]
    InvalidValue { table: String, value: f64 },

    #[error("Invalid denominations: {0}")]
    InvalidDenominations(String),
}
