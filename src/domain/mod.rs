//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - canonical fields and the CLI-facing enums (`CanonicalField`, `MatchMode`)
//! - the in-memory spreadsheet model (`Workbook`, `Sheet`, `CellValue`)
//! - run configuration (`FilterConfig`, `DateRange`)

pub mod types;

pub use types::*;
