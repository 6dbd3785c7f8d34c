//! Input/output helpers.
//!
//! - spreadsheet/CSV ingest (`ingest`)
//! - filtered result exports (xlsx/CSV) (`export`)
//! - JSON configuration files: tier tables, units, aliases (`config`)
//! - local folder listing (`folder`)

pub mod config;
pub mod export;
pub mod folder;
pub mod ingest;

pub use config::*;
pub use export::*;
pub use folder::*;
pub use ingest::*;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors reading or writing spreadsheet files and folders.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Failed to open '{}': {message}", .path.display())]
    Open { path: PathBuf, message: String },

    #[error("Unsupported file type '{}' (expected .xlsx, .xlsm, .xlsb, .xls, .ods or .csv).", .0.display())]
    Unsupported(PathBuf),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write workbook '{}': {source}", .path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path '{}' does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("Path '{}' is not a directory.", .0.display())]
    NotADirectory(PathBuf),
}

/// Lower-cased file extension, if any.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Extensions calamine can open.
pub(crate) const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];
