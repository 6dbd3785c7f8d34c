//! `agency-sheets` library crate.
//!
//! The binary (`ags`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the tier tables and the row filter can be reused on their own

pub mod app;
pub mod cli;
pub mod columns;
pub mod domain;
pub mod error;
pub mod filter;
pub mod io;
pub mod remote;
pub mod report;
pub mod tier;
