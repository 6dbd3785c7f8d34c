//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - runs the filter pipeline or a tier lookup
//! - prints reports

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use crate::cli::{
    BeansArgs, BreakdownArgs, Command, FetchArgs, FilterOptions, LsArgs, RemoteCommand, SalaryArgs, TiersArgs,
};
use crate::domain::{DateRange, FilterConfig};
use crate::error::AppError;
use crate::io::{SheetError, list_folder, load_denominations, load_tier_table};
use crate::remote::{DriveClient, RemoteStore};
use crate::tier::{TierTable, beans_to_diamonds, decompose, diamond_units};

pub mod pipeline;

/// Entry point for the `ags` binary.
pub fn run() -> Result<(), AppError> {
    // `ags events.xlsx --agency X` is shorthand for `ags filter events.xlsx --agency X`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(&cli.log_level);

    match cli.command {
        Command::Filter(args) => handle_filter(&args.input, &args.options),
        Command::Beans(args) => handle_beans(args),
        Command::Breakdown(args) => handle_breakdown(args),
        Command::Salary(args) => handle_salary(args),
        Command::Tiers(args) => handle_tiers(args),
        Command::Ls(args) => handle_ls(args),
        Command::Remote(cmd) => handle_remote(cmd),
    }
}

/// Logs go to stderr so reports on stdout stay pipeable. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn handle_filter(input: &Path, options: &FilterOptions) -> Result<(), AppError> {
    let config = filter_config_from_args(input, options);
    let run = pipeline::run_filter(&config)?;
    println!("{}", crate::report::format_filter_summary(&run.outcome, &run.written));
    Ok(())
}

fn handle_beans(args: BeansArgs) -> Result<(), AppError> {
    let table = table_or_default(args.table.as_deref())?;
    let conversion = table.convert(args.beans)?;
    println!("{}", crate::report::format_conversion(&table, &conversion));
    Ok(())
}

fn handle_breakdown(args: BreakdownArgs) -> Result<(), AppError> {
    let units = match &args.units {
        Some(path) => load_denominations(path)?,
        None => diamond_units(),
    };
    let breakdown = decompose(args.beans, &units);
    println!("{}", crate::report::format_breakdown(&breakdown));
    Ok(())
}

fn handle_salary(args: SalaryArgs) -> Result<(), AppError> {
    let table = load_tier_table(&args.table)?;
    let conversion = table.convert(args.earned)?;
    println!("{}", crate::report::format_conversion(&table, &conversion));
    Ok(())
}

fn handle_tiers(args: TiersArgs) -> Result<(), AppError> {
    let table = table_or_default(args.table.as_deref())?;
    println!("{}", crate::report::format_tier_table(&table));
    Ok(())
}

fn handle_ls(args: LsArgs) -> Result<(), AppError> {
    let entries = list_folder(&args.folder)?;
    println!("{}", crate::report::format_folder(&args.folder, &entries));
    Ok(())
}

fn handle_remote(cmd: RemoteCommand) -> Result<(), AppError> {
    let client = DriveClient::from_env()?;
    match cmd {
        RemoteCommand::List => {
            let files = client.list()?;
            println!("{}", crate::report::format_remote_files(&files));
        }
        RemoteCommand::Fetch(args) => handle_fetch(&client, args)?,
        RemoteCommand::Filter(args) => {
            let config = filter_config_from_args(Path::new(&args.id), &args.options);
            let run = pipeline::run_remote_filter(&client, &args.id, &config)?;
            println!("{}", crate::report::format_filter_summary(&run.outcome, &run.written));
        }
    }
    Ok(())
}

fn handle_fetch(store: &dyn RemoteStore, args: FetchArgs) -> Result<(), AppError> {
    let target = match args.output {
        Some(path) => path,
        None => PathBuf::from(pipeline::remote_name(store, &args.id)?),
    };
    let bytes = store.download(&args.id)?;
    std::fs::write(&target, &bytes).map_err(|source| SheetError::Io {
        path: target.clone(),
        source,
    })?;
    info!(id = %args.id, path = %target.display(), "Saved remote file");
    println!("Saved {} ({} bytes)", target.display(), bytes.len());
    Ok(())
}

fn table_or_default(path: Option<&Path>) -> Result<TierTable, AppError> {
    match path {
        Some(path) => Ok(load_tier_table(path)?),
        None => Ok(beans_to_diamonds()),
    }
}

pub fn filter_config_from_args(input: &Path, options: &FilterOptions) -> FilterConfig {
    FilterConfig {
        input: input.to_path_buf(),
        output: options.output.clone(),
        agencies: options.agencies.clone(),
        match_mode: options.match_mode,
        host: options.host.clone(),
        date_range: DateRange::new(options.from, options.to),
        aliases: options.aliases.clone(),
        required: options.required.clone(),
        fuzzy_threshold: (!options.no_fuzzy).then_some(options.fuzzy_threshold),
        autosize: !options.no_autosize,
    }
}

/// Rewrite argv so a bare input path means `filter`.
///
/// Rules:
/// - `ags events.xlsx ...`           -> `ags filter events.xlsx ...`
/// - `ags --log-level debug x.xlsx`  -> `ags --log-level debug filter x.xlsx`
/// - `ags <subcommand> ...`          -> unchanged
/// - `ags`, `ags --help`, `ags -...` -> unchanged (clap reports usage)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    // Leading global flags come before the subcommand position.
    let mut pos = 1;
    while let Some(arg) = argv.get(pos) {
        if arg == "--log-level" {
            pos += 2;
        } else if arg.starts_with("--log-level=") {
            pos += 1;
        } else {
            break;
        }
    }

    let Some(arg) = argv.get(pos) else {
        return argv;
    };

    let is_subcommand = matches!(
        arg.as_str(),
        "filter" | "beans" | "breakdown" | "salary" | "tiers" | "ls" | "remote" | "help"
    );
    if is_subcommand || arg.starts_with('-') {
        return argv;
    }

    argv.insert(pos, "filter".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_path_becomes_filter() {
        assert_eq!(
            rewrite_args(args(&["ags", "july.xlsx", "--agency", "Alpha"])),
            args(&["ags", "filter", "july.xlsx", "--agency", "Alpha"])
        );
        assert_eq!(rewrite_args(args(&["ags", "beans", "100"])), args(&["ags", "beans", "100"]));
        assert_eq!(rewrite_args(args(&["ags", "--help"])), args(&["ags", "--help"]));
        assert_eq!(rewrite_args(args(&["ags"])), args(&["ags"]));
    }

    #[test]
    fn leading_log_level_does_not_hide_the_input_path() {
        assert_eq!(
            rewrite_args(args(&["ags", "--log-level", "debug", "july.xlsx"])),
            args(&["ags", "--log-level", "debug", "filter", "july.xlsx"])
        );
        assert_eq!(
            rewrite_args(args(&["ags", "--log-level=info", "july.xlsx"])),
            args(&["ags", "--log-level=info", "filter", "july.xlsx"])
        );
        assert_eq!(
            rewrite_args(args(&["ags", "--log-level", "debug", "beans", "100"])),
            args(&["ags", "--log-level", "debug", "beans", "100"])
        );

        let cli = Cli::parse_from(rewrite_args(args(&["ags", "--log-level", "debug", "july.xlsx"])));
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Command::Filter(_)));
    }

    #[test]
    fn config_reflects_flags() {
        let cli = Cli::parse_from(["ags", "filter", "in.csv", "--no-fuzzy", "--no-autosize", "--from", "2025-07-01"]);
        let Command::Filter(filter) = cli.command else {
            panic!("expected filter");
        };
        let config = filter_config_from_args(&filter.input, &filter.options);
        assert_eq!(config.fuzzy_threshold, None);
        assert!(!config.autosize);
        assert!(config.date_range.is_active());
        assert_eq!(config.input, PathBuf::from("in.csv"));

        let cli = Cli::parse_from(["ags", "filter", "in.csv"]);
        let Command::Filter(filter) = cli.command else {
            panic!("expected filter");
        };
        let config = filter_config_from_args(&filter.input, &filter.options);
        assert_eq!(config.fuzzy_threshold, Some(crate::columns::DEFAULT_FUZZY_THRESHOLD));
        assert!(!config.date_range.is_active());
    }

    #[test]
    fn negative_beans_exit_with_query_code() {
        let err = handle_beans(BeansArgs { beans: -1.0, table: None }).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
