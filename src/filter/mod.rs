//! The row filter.
//!
//! One configurable pass replaces the per-agency scripts: resolve each sheet's
//! columns, skip sheets that lack a required field, keep rows that satisfy every
//! criterion (and the date range, if any), and rename resolved columns to their
//! canonical names. Missing optional fields become empty columns.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::columns::{AliasTable, ColumnMap, ColumnResolver, MatchKind};
use crate::domain::{CanonicalField, CellValue, DateRange, MatchMode, Sheet, Workbook};

/// How a criterion compares a field's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Exact(String),
    Contains(String),
    AnyOf(Vec<String>),
}

impl Matcher {
    /// Build a matcher from CLI-style input. Returns `None` when there is nothing to match.
    pub fn from_mode(mode: MatchMode, values: &[String]) -> Option<Matcher> {
        let values: Vec<String> = values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        match (mode, values.as_slice()) {
            (_, []) => None,
            (MatchMode::Exact, [one]) => Some(Matcher::Exact(one.clone())),
            (MatchMode::Contains, [one]) => Some(Matcher::Contains(one.clone())),
            // Several values only make sense as membership.
            _ => Some(Matcher::AnyOf(values)),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Matcher::Exact(want) => value.to_lowercase() == want.trim().to_lowercase(),
            Matcher::Contains(want) => value.to_lowercase().contains(&want.trim().to_lowercase()),
            Matcher::AnyOf(wants) => {
                let value = value.to_lowercase();
                wants.iter().any(|w| w.trim().to_lowercase() == value)
            }
        }
    }
}

/// One predicate over a canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub field: CanonicalField,
    pub matcher: Matcher,
}

/// Everything one filter run needs.
#[derive(Debug, Clone, Default)]
pub struct FilterPlan {
    pub criteria: Vec<Criterion>,
    pub date_range: DateRange,
    /// Fields that must resolve in addition to the ones the criteria and date range use.
    pub required: BTreeSet<CanonicalField>,
    pub fuzzy_threshold: Option<f64>,
}

impl FilterPlan {
    /// Fields a sheet must have to be processed at all.
    ///
    /// The agency column is always required, even when no agency criterion is set.
    pub fn required_fields(&self) -> BTreeSet<CanonicalField> {
        let mut fields = self.required.clone();
        fields.insert(CanonicalField::Agency);
        fields.extend(self.criteria.iter().map(|c| c.field));
        if self.date_range.is_active() {
            fields.insert(CanonicalField::Date);
        }
        fields
    }
}

/// Rows of one sheet that survived the filter, with canonical headers.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub rows_read: usize,
    /// Canonical fields that had no column and were filled with empty cells.
    pub synthesized: Vec<CanonicalField>,
}

impl FilteredSheet {
    /// View the result as an input sheet (e.g. to filter it again).
    pub fn to_sheet(&self) -> Sheet {
        Sheet {
            name: self.name.clone(),
            headers: self.headers.clone(),
            rows: self.rows.clone(),
        }
    }
}

/// A sheet left out because a required field could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSheet {
    pub name: String,
    pub missing: Vec<CanonicalField>,
}

/// A header accepted by similarity rather than by an exact alias.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub sheet: String,
    pub field: CanonicalField,
    pub header: String,
    pub alias: String,
    pub score: f64,
}

/// Result of filtering a workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOutcome {
    /// Every processed sheet in file order, including ones with no matching rows.
    pub sheets: Vec<FilteredSheet>,
    pub skipped: Vec<SkippedSheet>,
    pub fuzzy_matches: Vec<FuzzyMatch>,
    /// Rows dropped by the date range because their date could not be read.
    pub undated_rows: usize,
}

impl FilterOutcome {
    /// The "no matches" signal: nothing to export.
    pub fn is_empty(&self) -> bool {
        self.sheets.iter().all(|s| s.rows.is_empty())
    }

    pub fn matched_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows.len()).sum()
    }

    pub fn rows_read(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_read).sum()
    }

    /// Sheets worth exporting.
    pub fn non_empty(&self) -> impl Iterator<Item = &FilteredSheet> {
        self.sheets.iter().filter(|s| !s.rows.is_empty())
    }
}

/// Filter every sheet of a workbook.
pub fn filter_workbook(workbook: &Workbook, plan: &FilterPlan, aliases: &AliasTable) -> FilterOutcome {
    let resolver = ColumnResolver::new(aliases, plan.fuzzy_threshold);
    let required = plan.required_fields();
    let mut outcome = FilterOutcome::default();

    for sheet in &workbook.sheets {
        let columns = resolver.resolve(&sheet.headers);

        for col in columns.fuzzy_matches() {
            if let MatchKind::Fuzzy { alias, score } = &col.kind {
                outcome.fuzzy_matches.push(FuzzyMatch {
                    sheet: sheet.name.clone(),
                    field: col.field,
                    header: col.header.clone(),
                    alias: alias.clone(),
                    score: *score,
                });
            }
        }

        let missing = columns.missing(&required);
        if !missing.is_empty() {
            warn!(sheet = %sheet.name, ?missing, "Skipping sheet: required columns not found");
            outcome.skipped.push(SkippedSheet {
                name: sheet.name.clone(),
                missing,
            });
            continue;
        }

        let (filtered, undated) = filter_sheet(sheet, &columns, plan);
        debug!(
            sheet = %sheet.name,
            read = filtered.rows_read,
            kept = filtered.rows.len(),
            undated,
            "Filtered sheet"
        );
        outcome.undated_rows += undated;
        outcome.sheets.push(filtered);
    }

    info!(
        sheets = outcome.sheets.len(),
        skipped = outcome.skipped.len(),
        rows_read = outcome.rows_read(),
        matched = outcome.matched_rows(),
        "Filter complete"
    );

    outcome
}

/// Filter one sheet whose required columns are known to resolve.
///
/// Returns the filtered sheet and the number of rows dropped for an unreadable date.
fn filter_sheet(sheet: &Sheet, columns: &ColumnMap, plan: &FilterPlan) -> (FilteredSheet, usize) {
    let synthesized: Vec<CanonicalField> = CanonicalField::ALL
        .into_iter()
        .filter(|f| columns.get(*f).is_none())
        .collect();

    let mut headers: Vec<String> = sheet
        .headers
        .iter()
        .enumerate()
        .map(|(idx, h)| match columns.field_at(idx) {
            Some(field) => field.display_name().to_string(),
            None => h.clone(),
        })
        .collect();
    headers.extend(synthesized.iter().map(|f| f.display_name().to_string()));

    let width = sheet.headers.len();
    let mut rows = Vec::new();
    let mut undated = 0usize;

    for row_idx in 0..sheet.rows.len() {
        let field_text = |field: CanonicalField| -> String {
            columns
                .index(field)
                .map(|col| sheet.cell(row_idx, col).to_string())
                .unwrap_or_default()
        };

        if !plan.criteria.iter().all(|c| c.matcher.matches(&field_text(c.field))) {
            continue;
        }

        if plan.date_range.is_active() {
            let date = columns
                .index(CanonicalField::Date)
                .and_then(|col| cell_date(sheet.cell(row_idx, col)));
            match date {
                Some(d) if plan.date_range.contains(d) => {}
                Some(_) => continue,
                None => {
                    undated += 1;
                    continue;
                }
            }
        }

        let mut out: Vec<CellValue> = (0..width).map(|col| sheet.cell(row_idx, col).clone()).collect();
        out.extend(synthesized.iter().map(|_| CellValue::Empty));
        rows.push(out);
    }

    if undated > 0 {
        warn!(sheet = %sheet.name, undated, "Rows without a readable date were excluded by the date range");
    }

    let filtered = FilteredSheet {
        name: sheet.name.clone(),
        headers,
        rows,
        rows_read: sheet.rows.len(),
        synthesized,
    };
    (filtered, undated)
}

/// Read a date out of a cell: native datetimes, common text formats, or Excel serial days.
pub fn cell_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Number(n) => excel_serial_date(*n),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Parse a date from text, ignoring any trailing time component.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    // Agency exports mix ISO and day-first layouts. We accept a small fixed set so
    // parsing stays deterministic (no month/day guessing).
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%d/%m/%Y %H:%M"];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Convert an Excel (1900 date system) serial number to a date.
///
/// Excel counts a 1900-02-29 that never existed (serial 60), so serials before
/// it are offset by one day and 60 itself is not a date.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31; anything outside is not a date.
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as u64;
    let epoch = match days {
        ..60 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_days(Days::new(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sheet(name: &str, headers: &[&str], rows: Vec<Vec<CellValue>>) -> Sheet {
        Sheet {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    fn agency_plan(mode: MatchMode, values: &[&str]) -> FilterPlan {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        FilterPlan {
            criteria: vec![Criterion {
                field: CanonicalField::Agency,
                matcher: Matcher::from_mode(mode, &values).unwrap(),
            }],
            ..FilterPlan::default()
        }
    }

    fn events() -> Sheet {
        sheet(
            "July",
            &["agency_name", "Host ID", "Event Date", "Notes"],
            vec![
                vec![text("Alpha Agency UK"), text("h1"), text("2025-07-01"), text("a")],
                vec![text("Beta Agency"), text("h2"), text("2025-07-02"), text("b")],
                vec![text("alpha agency"), text("h3"), text("03/07/2025"), text("c")],
                vec![text("Alpha Agency"), text("h4"), text("not a date"), text("d")],
                vec![text("Alpha Agency"), text("h5"), text("2025-08-10")],
            ],
        )
    }

    #[test]
    fn matchers_compare_case_insensitively() {
        assert!(Matcher::Exact("Alpha Agency".to_string()).matches("  alpha AGENCY "));
        assert!(!Matcher::Exact("Alpha Agency".to_string()).matches("Alpha Agency UK"));
        assert!(Matcher::Contains("alpha".to_string()).matches("The ALPHA Agency"));
        let any = Matcher::AnyOf(vec!["Alpha".to_string(), "Beta".to_string()]);
        assert!(any.matches("beta"));
        assert!(!any.matches("Gamma"));
    }

    #[test]
    fn from_mode_promotes_multiple_values_to_membership() {
        let many = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            Matcher::from_mode(MatchMode::Contains, &many),
            Some(Matcher::AnyOf(many.clone()))
        );
        assert_eq!(Matcher::from_mode(MatchMode::Exact, &[" ".to_string()]), None);
    }

    #[test]
    fn substring_filter_renames_and_synthesizes() {
        let wb = Workbook { sheets: vec![events()] };
        let out = filter_workbook(&wb, &agency_plan(MatchMode::Contains, &["Alpha Agency"]), &AliasTable::default());

        assert!(out.skipped.is_empty());
        let s = &out.sheets[0];
        assert_eq!(s.rows.len(), 4);
        assert_eq!(&s.headers[..4], &["Agency Name", "Host ID", "Date", "Notes"]);
        // Host Name, Agency ID and Time were not in the sheet.
        assert_eq!(
            s.synthesized,
            vec![CanonicalField::HostName, CanonicalField::AgencyId, CanonicalField::Time]
        );
        assert_eq!(s.headers.len(), 7);
        for row in &s.rows {
            assert_eq!(row.len(), 7);
            assert!(row[4..].iter().all(CellValue::is_empty));
        }
    }

    #[test]
    fn date_range_excludes_out_of_range_and_unreadable_dates() {
        let wb = Workbook { sheets: vec![events()] };
        let mut plan = agency_plan(MatchMode::Contains, &["alpha"]);
        plan.date_range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 7, 1),
            NaiveDate::from_ymd_opt(2025, 7, 31),
        );

        let out = filter_workbook(&wb, &plan, &AliasTable::default());
        let ids: Vec<String> = out.sheets[0].rows.iter().map(|r| r[1].to_string()).collect();
        assert_eq!(ids, vec!["h1", "h3"]);
        assert_eq!(out.undated_rows, 1);
    }

    #[test]
    fn missing_required_column_skips_only_that_sheet() {
        let other = sheet("Summary", &["Host ID", "Beans"], vec![vec![text("h9"), CellValue::Number(5.0)]]);
        let wb = Workbook { sheets: vec![other, events()] };
        let mut plan = agency_plan(MatchMode::Exact, &["Beta Agency"]);
        plan.date_range = DateRange::new(NaiveDate::from_ymd_opt(2025, 1, 1), None);

        let out = filter_workbook(&wb, &plan, &AliasTable::default());
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].name, "Summary");
        assert_eq!(out.skipped[0].missing, vec![CanonicalField::Agency, CanonicalField::Date]);
        assert_eq!(out.sheets.len(), 1);
        assert_eq!(out.sheets[0].rows.len(), 1);
    }

    #[test]
    fn agency_column_is_required_without_agency_criteria() {
        let notes = sheet("Notes", &["Comment"], vec![vec![text("call back")]]);
        let wb = Workbook { sheets: vec![events(), notes] };

        let out = filter_workbook(&wb, &FilterPlan::default(), &AliasTable::default());
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].name, "Notes");
        assert_eq!(out.skipped[0].missing, vec![CanonicalField::Agency]);
        assert_eq!(out.sheets.len(), 1);
        assert_eq!(out.matched_rows(), 5);
    }

    #[test]
    fn date_is_only_required_when_a_range_is_active() {
        let no_date = sheet("NoDate", &["Agency"], vec![vec![text("Alpha Agency")]]);
        let wb = Workbook { sheets: vec![no_date] };
        let out = filter_workbook(&wb, &agency_plan(MatchMode::Exact, &["alpha agency"]), &AliasTable::default());
        assert!(out.skipped.is_empty());
        assert_eq!(out.matched_rows(), 1);
        let date_col = out.sheets[0].headers.iter().position(|h| h == "Date").unwrap();
        assert_eq!(out.sheets[0].rows[0][date_col], CellValue::Empty);
    }

    #[test]
    fn refiltering_a_result_is_idempotent() {
        let wb = Workbook { sheets: vec![events()] };
        let mut plan = agency_plan(MatchMode::AnyOf, &["alpha agency", "alpha agency uk"]);
        plan.criteria.push(Criterion {
            field: CanonicalField::HostId,
            matcher: Matcher::Contains("h".to_string()),
        });
        plan.date_range = DateRange::new(NaiveDate::from_ymd_opt(2025, 7, 1), None);

        let first = filter_workbook(&wb, &plan, &AliasTable::default());
        let again_input = Workbook {
            sheets: first.sheets.iter().map(FilteredSheet::to_sheet).collect(),
        };
        let second = filter_workbook(&again_input, &plan, &AliasTable::default());

        assert_eq!(first.sheets[0].headers, second.sheets[0].headers);
        assert_eq!(first.sheets[0].rows, second.sheets[0].rows);
        assert!(second.sheets[0].synthesized.is_empty());
    }

    #[test]
    fn no_matches_is_an_empty_outcome_not_an_error() {
        let wb = Workbook { sheets: vec![events()] };
        let out = filter_workbook(&wb, &agency_plan(MatchMode::Exact, &["Nobody"]), &AliasTable::default());
        assert!(out.is_empty());
        assert_eq!(out.rows_read(), 5);
        assert_eq!(out.non_empty().count(), 0);
    }

    #[test]
    fn dates_parse_from_text_serials_and_datetimes() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 3).unwrap();
        assert_eq!(cell_date(&text("2025-07-03")), Some(d));
        assert_eq!(cell_date(&text("03-07-2025")), Some(d));
        assert_eq!(cell_date(&text("2025-07-03 18:45")), Some(d));
        assert_eq!(cell_date(&CellValue::DateTime(d.and_hms_opt(9, 0, 0).unwrap())), Some(d));
        // 45841 is 2025-07-03 in the 1900 date system.
        assert_eq!(cell_date(&CellValue::Number(45841.0)), Some(d));
        assert_eq!(cell_date(&text("July 3rd")), None);
        assert_eq!(cell_date(&CellValue::Number(-3.0)), None);
    }

    #[test]
    fn early_serials_skip_the_phantom_leap_day() {
        let ymd = |m, d| NaiveDate::from_ymd_opt(1900, m, d);
        assert_eq!(cell_date(&CellValue::Number(1.0)), ymd(1, 1));
        assert_eq!(cell_date(&CellValue::Number(59.0)), ymd(2, 28));
        assert_eq!(cell_date(&CellValue::Number(60.0)), None);
        assert_eq!(cell_date(&CellValue::Number(61.0)), ymd(3, 1));
    }
}
