use std::path::{Path, PathBuf};

use crate::filter::FilterOutcome;
use crate::io::{EntryKind, FolderEntry};
use crate::remote::RemoteFile;
use crate::tier::{Breakdown, Conversion, PayoutKind, TierTable};

pub const NO_MATCHES: &str = "No matching rows found; nothing was written.";

/// Summary of a filter run: per-sheet counts, skipped sheets, fuzzy header matches, output files.
pub fn format_filter_summary(outcome: &FilterOutcome, written: &[PathBuf]) -> String {
    let mut out = String::new();

    out.push_str("=== ags - agency filter ===\n");
    out.push_str(&format!(
        "Rows: read={} matched={} | sheets: processed={} skipped={}\n",
        outcome.rows_read(),
        outcome.matched_rows(),
        outcome.sheets.len(),
        outcome.skipped.len(),
    ));

    if !outcome.sheets.is_empty() {
        out.push('\n');
        out.push_str(&format!("{:<32} {:>8} {:>8}\n", "sheet", "read", "kept"));
        out.push_str(&format!("{:-<32} {:-<8} {:-<8}\n", "", "", ""));
        for sheet in &outcome.sheets {
            out.push_str(&format!(
                "{:<32} {:>8} {:>8}\n",
                truncate(&sheet.name, 32),
                sheet.rows_read,
                sheet.rows.len()
            ));
        }
    }

    if !outcome.skipped.is_empty() {
        out.push_str("\nSkipped sheets (required columns not found):\n");
        for skipped in &outcome.skipped {
            let missing: Vec<&str> = skipped.missing.iter().map(|f| f.display_name()).collect();
            out.push_str(&format!("- {}: missing {}\n", skipped.name, missing.join(", ")));
        }
    }

    if !outcome.fuzzy_matches.is_empty() {
        out.push_str("\nFuzzy header matches (please review):\n");
        for m in &outcome.fuzzy_matches {
            out.push_str(&format!(
                "- {}: '{}' -> {} (like '{}', score {:.2})\n",
                m.sheet, m.header, m.field, m.alias, m.score
            ));
        }
    }

    if outcome.undated_rows > 0 {
        out.push_str(&format!(
            "\n{} row(s) had no readable date and were excluded by the date range.\n",
            outcome.undated_rows
        ));
    }

    out.push('\n');
    if outcome.is_empty() {
        out.push_str(NO_MATCHES);
        out.push('\n');
    } else {
        for path in written {
            out.push_str(&format!("Wrote {}\n", path.display()));
        }
    }

    out
}

/// One tier lookup: which tier applied and what it pays.
pub fn format_conversion(table: &TierTable, conversion: &Conversion) -> String {
    let mut out = String::new();
    out.push_str(&format!("Table: {}\n", table.name()));
    out.push_str(&format!("Amount: {}\n", fmt_amount(conversion.quantity)));
    out.push_str(&format!("Tier threshold: {}\n", fmt_amount(conversion.threshold)));
    match conversion.kind {
        PayoutKind::Rate => {
            out.push_str(&format!("Rate: {}\n", conversion.value));
            out.push_str(&format!("Estimated payout: {:.2}\n", conversion.payout));
        }
        PayoutKind::Fixed => {
            out.push_str(&format!("Payout: {}\n", fmt_amount(conversion.payout)));
        }
    }
    out
}

/// Unit-by-unit table of a greedy breakdown.
pub fn format_breakdown(breakdown: &Breakdown) -> String {
    let mut out = String::new();
    out.push_str(&format!("Beans: {}\n\n", breakdown.total));

    if breakdown.counts.is_empty() {
        out.push_str("No unit fits this amount.\n");
    } else {
        out.push_str(&format!("{:>10} {:>8} {:>10} {:>12}\n", "unit", "count", "diamonds", "subtotal"));
        out.push_str(&format!("{:-<10} {:-<8} {:-<10} {:-<12}\n", "", "", "", ""));
        for used in &breakdown.counts {
            out.push_str(&format!(
                "{:>10} {:>8} {:>10} {:>12}\n",
                used.unit.size,
                used.count,
                used.unit.value,
                used.value()
            ));
        }
    }

    out.push('\n');
    out.push_str(&format!("Total diamonds: {}\n", breakdown.total_value));
    out.push_str(&format!("Remaining beans: {}\n", breakdown.remainder));
    out
}

pub fn format_tier_table(table: &TierTable) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({:?}, {})\n",
        table.name(),
        table.convention(),
        table.kind().label()
    ));
    out.push_str(&format!("{:>12} {:>12}\n", "threshold", table.kind().label()));
    out.push_str(&format!("{:-<12} {:-<12}\n", "", ""));
    for tier in table.tiers() {
        out.push_str(&format!("{:>12} {:>12}\n", fmt_amount(tier.threshold), tier.value));
    }
    out
}

/// Folder listing; directories get a trailing `/`, readable spreadsheets a `*`.
pub fn format_folder(path: &Path, entries: &[FolderEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", path.display()));
    if entries.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }

    let (dirs, files): (Vec<&FolderEntry>, Vec<&FolderEntry>) =
        entries.iter().partition(|e| e.kind == EntryKind::Directory);
    for dir in dirs {
        out.push_str(&format!("  {}/\n", dir.name));
    }
    for file in files {
        let marker = if file.spreadsheet { "*" } else { " " };
        out.push_str(&format!("{marker} {}\n", file.name));
    }
    out
}

pub fn format_remote_files(files: &[RemoteFile]) -> String {
    if files.is_empty() {
        return "No remote files.\n".to_string();
    }
    let mut out = String::new();
    out.push_str(&format!("{:<44} {:<40} {}\n", "id", "name", "type"));
    out.push_str(&format!("{:-<44} {:-<40} {:-<20}\n", "", "", ""));
    for file in files {
        out.push_str(
            format!(
                "{:<44} {:<40} {}\n",
                file.id,
                truncate(&file.name, 40),
                file.mime_type
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Whole amounts print without a fractional part.
fn fmt_amount(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
