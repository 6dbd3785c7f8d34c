//! Local folder listing, used to find input files before filtering.

use std::fs;
use std::path::Path;

use crate::io::{SheetError, WORKBOOK_EXTENSIONS, extension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub kind: EntryKind,
    /// A file `ags filter` can read.
    pub spreadsheet: bool,
}

/// True for extensions the ingest layer accepts.
pub fn is_spreadsheet(path: &Path) -> bool {
    extension(path).is_some_and(|ext| ext == "csv" || WORKBOOK_EXTENSIONS.contains(&ext.as_str()))
}

/// List a folder's entries sorted by name.
pub fn list_folder(path: &Path) -> Result<Vec<FolderEntry>, SheetError> {
    if !path.exists() {
        return Err(SheetError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(SheetError::NotADirectory(path.to_path_buf()));
    }

    let io_err = |source| SheetError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let entry_path = entry.path();
        let kind = if entry_path.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(FolderEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
            spreadsheet: kind == EntryKind::File && is_spreadsheet(&entry_path),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
