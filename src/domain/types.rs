//! Shared domain types.
//!
//! These are deliberately plain so the same values flow through ingest,
//! filtering, export and reporting without conversion layers.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A field the filter understands, independent of how a sheet spells its header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalField {
    Agency,
    HostName,
    HostId,
    AgencyId,
    Date,
    Time,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Agency,
        CanonicalField::HostName,
        CanonicalField::HostId,
        CanonicalField::AgencyId,
        CanonicalField::Date,
        CanonicalField::Time,
    ];

    /// Header written to exported sheets. Always an accepted spelling of the field.
    pub fn display_name(self) -> &'static str {
        match self {
            CanonicalField::Agency => "Agency Name",
            CanonicalField::HostName => "Host Name",
            CanonicalField::HostId => "Host ID",
            CanonicalField::AgencyId => "Agency ID",
            CanonicalField::Date => "Date",
            CanonicalField::Time => "Time",
        }
    }

    /// Spellings seen across agency/host event exports.
    pub fn default_aliases(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Agency => &["Agency Name", "Agency", "AgencyName", "Agency Nickname"],
            CanonicalField::HostName => &["Host Name", "Host", "HostName", "Host Nickname", "Streamer Name"],
            CanonicalField::HostId => &["Host ID", "Host UID", "HostID", "Streamer ID"],
            CanonicalField::AgencyId => &["Agency ID", "Agency UID", "AgencyID", "Agency Code"],
            CanonicalField::Date => &["Date", "Event Date", "Start Date", "Day"],
            CanonicalField::Time => &["Time", "Event Time", "Start Time"],
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            // Whole numbers (IDs, counts) read back from xlsx as floats; print them without `.0`.
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A named 2-D grid: one header row plus data rows.
///
/// Rows may be shorter than the header (trailing empty cells are not stored by
/// every reader); `cell` pads them with `Empty`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// All sheets of one input file, in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

/// How the agency filter compares values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Case-insensitive substring.
    Contains,
    /// Trimmed, case-insensitive equality.
    Exact,
    /// Trimmed, case-insensitive equality against any of several values.
    AnyOf,
}

/// Inclusive date range; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// A range with neither bound does not filter anything.
    pub fn is_active(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// A full `ags filter` run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub input: PathBuf,
    pub output: PathBuf,

    pub agencies: Vec<String>,
    pub match_mode: MatchMode,
    /// Optional case-insensitive host-name search.
    pub host: Option<String>,
    pub date_range: DateRange,

    /// Extra alias spellings (JSON) merged over the defaults.
    pub aliases: Option<PathBuf>,
    /// Fields that must resolve on top of the ones the criteria use.
    pub required: Vec<CanonicalField>,
    /// Similarity threshold for header fallback matching; `None` disables it.
    pub fuzzy_threshold: Option<f64>,

    pub autosize: bool,
}
