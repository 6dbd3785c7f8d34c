//! Export filtered sheets.
//!
//! xlsx output gets the usual cosmetics: a bold, frozen header row and column
//! widths sized to the longest value. CSV output writes one file per sheet.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use tracing::info;

use crate::domain::CellValue;
use crate::filter::{FilterOutcome, FilteredSheet};
use crate::io::{SheetError, extension};

/// Excel's sheet-name length limit.
const MAX_SHEET_NAME: usize = 31;
/// Widest column autosizing will produce (characters).
const MAX_COLUMN_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Size columns to their longest value.
    pub autosize: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { autosize: true }
    }
}

/// Write every non-empty sheet of `outcome`.
///
/// `.csv` paths produce CSV (one file per sheet when there are several); any
/// other path is written as xlsx. Returns the files written.
pub fn write_outcome(path: &Path, outcome: &FilterOutcome, options: ExportOptions) -> Result<Vec<PathBuf>, SheetError> {
    let sheets: Vec<&FilteredSheet> = outcome.non_empty().collect();
    let written = match extension(path).as_deref() {
        Some("csv") => write_csv_files(path, &sheets)?,
        Some("xlsx") | None => {
            write_xlsx(path, &sheets, options)?;
            vec![path.to_path_buf()]
        }
        Some(_) => return Err(SheetError::Unsupported(path.to_path_buf())),
    };
    info!(files = written.len(), sheets = sheets.len(), "Export complete");
    Ok(written)
}

/// Write sheets to a single xlsx workbook.
pub fn write_xlsx(path: &Path, sheets: &[&FilteredSheet], options: ExportOptions) -> Result<(), SheetError> {
    let to_err = |source: XlsxError| SheetError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = XlsxWorkbook::new();
    let formats = Formats::new();
    let mut used_names: Vec<String> = Vec::new();

    for (idx, sheet) in sheets.iter().enumerate() {
        let name = unique_sheet_name(&sheet.name, idx, &used_names);
        used_names.push(name.clone());

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).map_err(to_err)?;
        write_worksheet(worksheet, sheet, &formats, options).map_err(to_err)?;
    }

    // An xlsx file needs at least one worksheet.
    if sheets.is_empty() {
        workbook.add_worksheet();
    }

    workbook.save(path).map_err(to_err)
}

struct Formats {
    header: Format,
    date: Format,
    datetime: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

fn write_worksheet(
    worksheet: &mut Worksheet,
    sheet: &FilteredSheet,
    formats: &Formats,
    options: ExportOptions,
) -> Result<(), XlsxError> {
    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col_num(col), header, &formats.header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1).unwrap_or(u32::MAX);
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col_num(col), cell, formats)?;
        }
    }

    if options.autosize {
        for (col, width) in column_widths(sheet).into_iter().enumerate() {
            worksheet.set_column_width(col_num(col), width as f64)?;
        }
    }

    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue, formats: &Formats) -> Result<(), XlsxError> {
    match cell {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::DateTime(dt) => {
            let format = if dt.time() == chrono::NaiveTime::MIN {
                &formats.date
            } else {
                &formats.datetime
            };
            worksheet.write_datetime_with_format(row, col, dt, format)?;
        }
    }
    Ok(())
}

// Out-of-range indices saturate; rust_xlsxwriter then reports the limit error.
fn col_num(col: usize) -> u16 {
    u16::try_from(col).unwrap_or(u16::MAX)
}

/// Display width per column: longest header or value, plus padding, capped.
pub fn column_widths(sheet: &FilteredSheet) -> Vec<usize> {
    let mut widths: Vec<usize> = sheet.headers.iter().map(|h| h.chars().count()).collect();
    for row in &sheet.rows {
        for (col, cell) in row.iter().enumerate() {
            let len = cell.to_string().chars().count();
            match widths.get_mut(col) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }
    widths.into_iter().map(|w| w.min(MAX_COLUMN_WIDTH) + 2).collect()
}

/// Make a name Excel accepts and that no earlier sheet in this file uses.
fn unique_sheet_name(raw: &str, idx: usize, used: &[String]) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        format!("Sheet{}", idx + 1)
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let taken = |name: &str| used.iter().any(|u| u.eq_ignore_ascii_case(name));
    if !taken(base.as_str()) {
        return base;
    }

    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            let stem: String = base.chars().take(keep).collect();
            format!("{stem}{suffix}")
        })
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or(base)
}

fn write_csv_files(path: &Path, sheets: &[&FilteredSheet]) -> Result<Vec<PathBuf>, SheetError> {
    if let [only] = sheets {
        write_csv(path, only)?;
        return Ok(vec![path.to_path_buf()]);
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("filtered");
    let mut written = Vec::with_capacity(sheets.len());
    let mut used: Vec<String> = Vec::new();
    for (idx, sheet) in sheets.iter().enumerate() {
        let file_name = unique_csv_name(stem, &sheet.name, idx, &used);
        used.push(file_name.clone());
        let target = path.with_file_name(file_name);
        write_csv(&target, sheet)?;
        written.push(target);
    }
    Ok(written)
}

/// `{stem}_{sheet}.csv`, unique (case-insensitively) among `used` file names.
///
/// Separators and characters Windows rejects in file names become `_`.
fn unique_csv_name(stem: &str, sheet: &str, idx: usize, used: &[String]) -> String {
    let part: String = sheet
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\') {
                '_'
            } else {
                c
            }
        })
        .collect();
    let part = if part.is_empty() { format!("Sheet{}", idx + 1) } else { part };

    let taken = |name: &str| used.iter().any(|u| u.eq_ignore_ascii_case(name));
    let first = format!("{stem}_{part}.csv");
    if !taken(first.as_str()) {
        return first;
    }
    (2..)
        .map(|n| format!("{stem}_{part}_{n}.csv"))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or(first)
}

/// Write one sheet as CSV (headers + display text of every cell).
pub fn write_csv(path: &Path, sheet: &FilteredSheet) -> Result<(), SheetError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        let mut record: Vec<String> = row.iter().map(ToString::to_string).collect();
        record.resize(sheet.headers.len(), String::new());
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|source| SheetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_workbook;
    use chrono::NaiveDate;

    fn filtered(name: &str) -> FilteredSheet {
        let dt = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        FilteredSheet {
            name: name.to_string(),
            headers: vec!["Agency Name".to_string(), "Date".to_string(), "Beans".to_string(), "Host Name".to_string()],
            rows: vec![
                vec![
                    CellValue::Text("Alpha Agency".to_string()),
                    CellValue::DateTime(dt),
                    CellValue::Number(1200.0),
                    CellValue::Empty,
                ],
                vec![
                    CellValue::Text("Alpha Agency UK".to_string()),
                    CellValue::Text("2025-07-05".to_string()),
                    CellValue::Number(7.5),
                    CellValue::Empty,
                ],
            ],
            rows_read: 10,
            synthesized: vec![],
        }
    }

    fn outcome(sheets: Vec<FilteredSheet>) -> FilterOutcome {
        FilterOutcome {
            sheets,
            ..FilterOutcome::default()
        }
    }

    #[test]
    fn xlsx_round_trips_through_calamine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut empty = filtered("Empty");
        empty.rows.clear();

        let written = write_outcome(&path, &outcome(vec![filtered("July"), empty]), ExportOptions::default()).unwrap();
        assert_eq!(written, vec![path.clone()]);

        let wb = load_workbook(&path).unwrap();
        assert_eq!(wb.sheets.len(), 1, "sheets without rows are not exported");
        let sheet = &wb.sheets[0];
        assert_eq!(sheet.name, "July");
        assert_eq!(sheet.headers, filtered("July").headers);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], CellValue::Text("Alpha Agency".to_string()));
        assert_eq!(sheet.rows[0][1], filtered("July").rows[0][1]);
        assert_eq!(sheet.rows[1][2], CellValue::Number(7.5));
        assert!(sheet.cell(0, 3).is_empty());
    }

    #[test]
    fn csv_export_writes_one_file_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency.csv");

        let single = write_outcome(&path, &outcome(vec![filtered("July")]), ExportOptions::default()).unwrap();
        assert_eq!(single, vec![path.clone()]);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Agency Name,Date,Beans,Host Name");
        assert_eq!(lines[1], "Alpha Agency,2025-07-04,1200,");

        let many = write_outcome(
            &path,
            &outcome(vec![filtered("July Week 1"), filtered("August")]),
            ExportOptions::default(),
        )
        .unwrap();
        let names: Vec<String> = many
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["agency_July_Week_1.csv", "agency_August.csv"]);
    }

    #[test]
    fn csv_file_names_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let written = write_outcome(
            &path,
            &outcome(vec![filtered("July A"), filtered("July_A"), filtered("july a")]),
            ExportOptions::default(),
        )
        .unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out_July_A.csv", "out_July_A_2.csv", "out_july_a_3.csv"]);

        let on_disk = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(on_disk, 3);
    }

    #[test]
    fn csv_file_names_drop_reserved_characters() {
        assert_eq!(unique_csv_name("out", "Q3: \"Top\" <hosts>?", 0, &[]), "out_Q3___Top___hosts__.csv");
        assert_eq!(unique_csv_name("out", "  ", 4, &[]), "out_Sheet5.csv");
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        assert_eq!(unique_sheet_name("Q3/July: Hosts", 0, &[]), "Q3_July_ Hosts");
        assert_eq!(unique_sheet_name("", 2, &[]), "Sheet3");
        let long = "A".repeat(40);
        assert_eq!(unique_sheet_name(&long, 0, &[]).chars().count(), 31);
        let used = vec!["July".to_string()];
        assert_eq!(unique_sheet_name("JULY", 1, &used), "JULY (2)");
    }

    #[test]
    fn widths_follow_longest_value() {
        let widths = column_widths(&filtered("July"));
        assert_eq!(widths, vec!["Alpha Agency UK".len() + 2, "2025-07-04".len() + 2, "Beans".len() + 2, "Host Name".len() + 2]);
    }

    #[test]
    fn unknown_output_extension_is_rejected() {
        let err = write_outcome(Path::new("out.pdf"), &outcome(vec![filtered("July")]), ExportOptions::default()).unwrap_err();
        assert!(matches!(err, SheetError::Unsupported(_)));
    }
}
