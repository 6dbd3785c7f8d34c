//! Spreadsheet ingest.
//!
//! Turns an xlsx/xls/ods workbook (via calamine) or a CSV file into the
//! in-memory `Workbook` model. The first row of every sheet is its header row.
//!
//! Ingest is tolerant: a sheet calamine cannot read, or a CSV record that fails
//! to parse, is logged and skipped rather than failing the whole file.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::domain::{CellValue, Sheet, Workbook};
use crate::io::{SheetError, WORKBOOK_EXTENSIONS, extension};

/// Load a workbook from disk, choosing the reader by file extension.
pub fn load_workbook(path: &Path) -> Result<Workbook, SheetError> {
    match extension(path).as_deref() {
        Some("csv") => {
            let file = File::open(path).map_err(|e| SheetError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let sheet = read_csv_sheet(csv_sheet_name(path), file)?;
            Ok(Workbook { sheets: vec![sheet] })
        }
        Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => {
            let workbook = open_workbook_auto(path).map_err(|e| SheetError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(read_sheets(workbook))
        }
        _ => Err(SheetError::Unsupported(path.to_path_buf())),
    }
}

/// Load a workbook from an in-memory upload or download. `name` supplies the extension.
pub fn load_workbook_from_bytes(name: &str, bytes: Vec<u8>) -> Result<Workbook, SheetError> {
    let path = Path::new(name);
    match extension(path).as_deref() {
        Some("csv") => {
            let sheet = read_csv_sheet(csv_sheet_name(path), Cursor::new(bytes))?;
            Ok(Workbook { sheets: vec![sheet] })
        }
        // Remote files are not always named with an extension; let calamine sniff the format.
        _ => {
            let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| SheetError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(read_sheets(workbook))
        }
    }
}

fn read_sheets<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Workbook {
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let sheet = sheet_from_range(name, &range);
                debug!(sheet = %sheet.name, rows = sheet.rows.len(), cols = sheet.headers.len(), "Read sheet");
                sheets.push(sheet);
            }
            Err(e) => warn!(sheet = %name, error = %e, "Skipping unreadable sheet"),
        }
    }
    Workbook { sheets }
}

fn sheet_from_range(name: String, range: &Range<Data>) -> Sheet {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Sheet {
            name,
            ..Sheet::default()
        };
    };

    let headers = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_text(&convert_cell(cell), idx))
        .collect();

    let rows = rows
        .map(|row| row.iter().map(convert_cell).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(CellValue::is_empty))
        .collect();

    Sheet { name, headers, rows }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Header cells are text; blank headers get a positional name so every column is addressable.
fn header_text(cell: &CellValue, idx: usize) -> String {
    let text = cell.to_string();
    let text = text.trim();
    if text.is_empty() {
        format!("Column {}", idx + 1)
    } else {
        text.to_string()
    }
}

fn csv_sheet_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Sheet1")
        .to_string()
}

fn read_csv_sheet(name: String, reader: impl Read) -> Result<Sheet, SheetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let mut headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| header_text(&CellValue::Text(h.to_string()), idx))
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, and CSV lines are 1-based.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(sheet = %name, line, error = %e, "Skipping unparseable CSV record");
                continue;
            }
        };

        // CSV keeps every value as text: IDs like "00123" must survive unchanged.
        let row: Vec<CellValue> = record
            .iter()
            .map(|s| {
                if s.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(s.to_string())
                }
            })
            .collect();

        if row.iter().all(CellValue::is_empty) {
            continue;
        }
        rows.push(row);
    }

    // Flexible records can be wider than the header row.
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    while headers.len() < width {
        headers.push(format!("Column {}", headers.len() + 1));
    }

    Ok(Sheet { name, headers, rows })
}
