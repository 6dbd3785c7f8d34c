//! Shared "filter pipeline" logic used by the local and remote front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load workbook -> resolve aliases -> build plan -> filter -> export
//!
//! The command handlers can then focus on presentation.

use std::path::PathBuf;

use tracing::info;

use crate::columns::AliasTable;
use crate::domain::{CanonicalField, FilterConfig, Workbook};
use crate::error::AppError;
use crate::filter::{Criterion, FilterOutcome, FilterPlan, Matcher, filter_workbook};
use crate::io::{ExportOptions, load_aliases, load_workbook, load_workbook_from_bytes, write_outcome};
use crate::remote::RemoteStore;

/// All outputs of a single filter run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub outcome: FilterOutcome,
    /// Files written; empty when nothing matched.
    pub written: Vec<PathBuf>,
}

/// Translate a run configuration into the filter's plan.
pub fn build_plan(config: &FilterConfig) -> FilterPlan {
    let mut criteria = Vec::new();
    if let Some(matcher) = Matcher::from_mode(config.match_mode, &config.agencies) {
        criteria.push(Criterion {
            field: CanonicalField::Agency,
            matcher,
        });
    }
    if let Some(host) = config.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        criteria.push(Criterion {
            field: CanonicalField::HostName,
            matcher: Matcher::Contains(host.to_string()),
        });
    }

    FilterPlan {
        criteria,
        date_range: config.date_range,
        required: config.required.iter().copied().collect(),
        fuzzy_threshold: config.fuzzy_threshold,
    }
}

fn alias_table(config: &FilterConfig) -> Result<AliasTable, AppError> {
    match &config.aliases {
        Some(path) => Ok(load_aliases(path)?),
        None => Ok(AliasTable::default()),
    }
}

/// Load `config.input` from disk, filter it and export the matches.
pub fn run_filter(config: &FilterConfig) -> Result<RunOutput, AppError> {
    let workbook = load_workbook(&config.input)?;
    info!(input = %config.input.display(), sheets = workbook.sheets.len(), "Loaded workbook");
    run_filter_on(&workbook, config)
}

/// Filter an already loaded workbook and export the matches.
///
/// Nothing is written when no row matched.
pub fn run_filter_on(workbook: &Workbook, config: &FilterConfig) -> Result<RunOutput, AppError> {
    let aliases = alias_table(config)?;
    let plan = build_plan(config);
    let outcome = filter_workbook(workbook, &plan, &aliases);

    let written = if outcome.is_empty() {
        Vec::new()
    } else {
        write_outcome(
            &config.output,
            &outcome,
            ExportOptions {
                autosize: config.autosize,
            },
        )?
    };

    Ok(RunOutput { outcome, written })
}

/// Download a remote file and filter it.
///
/// The remote name (looked up in the listing) decides between CSV and workbook
/// parsing; unknown IDs fall back to format sniffing.
pub fn run_remote_filter(store: &dyn RemoteStore, id: &str, config: &FilterConfig) -> Result<RunOutput, AppError> {
    let name = remote_name(store, id)?;
    let bytes = store.download(id)?;
    info!(id, name = %name, bytes = bytes.len(), "Downloaded remote workbook");
    let workbook = load_workbook_from_bytes(&name, bytes)?;
    run_filter_on(&workbook, config)
}

/// Name of a remote file, or its ID when the listing does not show it.
pub fn remote_name(store: &dyn RemoteStore, id: &str) -> Result<String, AppError> {
    Ok(store
        .list()?
        .into_iter()
        .find(|f| f.id == id)
        .map(|f| f.name)
        .unwrap_or_else(|| id.to_string()))
}
