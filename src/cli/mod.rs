//! Command-line parsing for the agency spreadsheet tools.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! filtering and tier code; `app` turns these structs into configs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{CanonicalField, MatchMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ags", version, about = "Agency spreadsheet filter and bean/diamond calculator")]
pub struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Filter a workbook (or CSV) by agency, host and date, and export the matches.
    Filter(FilterArgs),
    /// Convert beans to diamonds with the tiered rate table.
    Beans(BeansArgs),
    /// Break a bean total into diamond units, largest first.
    Breakdown(BreakdownArgs),
    /// Look up a salary tier from a supplied schedule.
    Salary(SalaryArgs),
    /// Print a tier schedule.
    Tiers(TiersArgs),
    /// List a folder, flagging spreadsheets.
    Ls(LsArgs),
    /// Work with files in the remote drive.
    #[command(subcommand)]
    Remote(RemoteCommand),
}

#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    /// Input workbook (.xlsx, .xlsm, .xlsb, .xls, .ods) or .csv file.
    pub input: PathBuf,

    #[command(flatten)]
    pub options: FilterOptions,
}

/// Options shared by `ags filter` and `ags remote filter`.
#[derive(Debug, Args, Clone)]
pub struct FilterOptions {
    /// Output path (.xlsx, or .csv for one file per sheet).
    #[arg(short = 'o', long, default_value = "filtered_agency_data.xlsx")]
    pub output: PathBuf,

    /// Agency name to keep (repeat for several).
    #[arg(short = 'a', long = "agency", value_name = "NAME")]
    pub agencies: Vec<String>,

    /// How agency names are compared.
    #[arg(long = "match", value_enum, default_value_t = MatchMode::Contains)]
    pub match_mode: MatchMode,

    /// Case-insensitive host-name search.
    #[arg(long, value_name = "NAME")]
    pub host: Option<String>,

    /// First date to keep (inclusive).
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Last date to keep (inclusive).
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// JSON file with extra header spellings per field.
    #[arg(long, value_name = "JSON")]
    pub aliases: Option<PathBuf>,

    /// Skip sheets that lack this field (repeatable).
    #[arg(long = "require", value_enum, value_name = "FIELD")]
    pub required: Vec<CanonicalField>,

    /// Minimum header similarity for fallback matching (0..=1).
    #[arg(long, default_value_t = crate::columns::DEFAULT_FUZZY_THRESHOLD, value_parser = parse_threshold)]
    pub fuzzy_threshold: f64,

    /// Only accept headers that match an alias exactly.
    #[arg(long)]
    pub no_fuzzy: bool,

    /// Keep default column widths in xlsx output.
    #[arg(long)]
    pub no_autosize: bool,
}

#[derive(Debug, Args)]
pub struct BeansArgs {
    /// Bean amount.
    #[arg(allow_negative_numbers = true)]
    pub beans: f64,

    /// Rate table JSON (defaults to the built-in beans-to-diamonds table).
    #[arg(long, value_name = "JSON")]
    pub table: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BreakdownArgs {
    /// Bean total.
    pub beans: u64,

    /// Unit list JSON (defaults to the built-in diamond units).
    #[arg(long, value_name = "JSON")]
    pub units: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SalaryArgs {
    /// Amount earned in the period.
    #[arg(allow_negative_numbers = true)]
    pub earned: f64,

    /// Salary schedule JSON.
    #[arg(long, value_name = "JSON")]
    pub table: PathBuf,
}

#[derive(Debug, Args)]
pub struct TiersArgs {
    /// Table JSON (defaults to the built-in beans-to-diamonds table).
    #[arg(long, value_name = "JSON")]
    pub table: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LsArgs {
    #[arg(default_value = ".")]
    pub folder: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// List files visible to the token.
    List,
    /// Download a file by ID.
    Fetch(FetchArgs),
    /// Download a file by ID and filter it like `ags filter`.
    Filter(RemoteFilterArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    pub id: String,

    /// Where to save the file (defaults to its remote name).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RemoteFilterArgs {
    pub id: String,

    #[command(flatten)]
    pub options: FilterOptions,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    crate::filter::parse_date_text(s)
        .ok_or_else(|| format!("'{s}' is not a date (expected YYYY-MM-DD or DD/MM/YYYY)"))
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0 and 1, got {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flags_parse() {
        let cli = Cli::parse_from([
            "ags", "filter", "events.xlsx", "--agency", "Alpha", "--agency", "Beta", "--match", "any-of",
            "--from", "2025-07-01", "--to", "31/07/2025", "--require", "host-id", "--no-fuzzy",
        ]);
        let Command::Filter(args) = cli.command else {
            panic!("expected filter");
        };
        assert_eq!(args.input, PathBuf::from("events.xlsx"));
        assert_eq!(args.options.agencies, vec!["Alpha", "Beta"]);
        assert_eq!(args.options.match_mode, MatchMode::AnyOf);
        assert_eq!(args.options.to, NaiveDate::from_ymd_opt(2025, 7, 31));
        assert_eq!(args.options.required, vec![CanonicalField::HostId]);
        assert!(args.options.no_fuzzy);
        assert_eq!(args.options.output, PathBuf::from("filtered_agency_data.xlsx"));
    }

    #[test]
    fn bad_threshold_and_date_are_rejected() {
        assert!(Cli::try_parse_from(["ags", "filter", "x.xlsx", "--fuzzy-threshold", "1.5"]).is_err());
        assert!(Cli::try_parse_from(["ags", "filter", "x.xlsx", "--from", "July"]).is_err());
    }

    #[test]
    fn negative_beans_reach_the_resolver() {
        let cli = Cli::parse_from(["ags", "beans", "-5"]);
        assert!(matches!(cli.command, Command::Beans(BeansArgs { beans, .. }) if beans == -5.0));
    }
}
