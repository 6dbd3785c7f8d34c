//! Terminal reports for filter runs, tier lookups and listings.
//!
//! Formatting lives in one place so:
//! - the filter and tier code stays free of presentation
//! - output changes are localized and easy to test as plain strings

pub mod format;

pub use format::*;
