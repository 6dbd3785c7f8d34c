//! Header → canonical field resolution.
//!
//! Each canonical field has a list of accepted spellings. A header matches when
//! its normalized form equals a normalized alias. Only when that fails, and only
//! if a threshold is configured, do we fall back to string similarity; those
//! matches are logged so someone can add the spelling to the alias table.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::domain::CanonicalField;

/// Default similarity threshold for fallback header matching.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Accepted spellings per canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let entries = CanonicalField::ALL
            .iter()
            .map(|&field| {
                let aliases = field
                    .default_aliases()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                (field, aliases)
            })
            .collect();
        Self { entries }
    }
}

/// JSON shape of an alias file: `{ "agency": ["Agency Title", ...], ... }`.
pub type AliasFile = HashMap<CanonicalField, Vec<String>>;

impl AliasTable {
    /// Append extra spellings for a field, ignoring ones already accepted.
    pub fn extend<I, S>(&mut self, field: CanonicalField, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.entries.entry(field).or_default();
        for alias in aliases {
            let alias = alias.into();
            let norm = normalize_header(&alias);
            if norm.is_empty() || list.iter().any(|a| normalize_header(a) == norm) {
                continue;
            }
            list.push(alias);
        }
    }

    /// Defaults plus everything in an alias file.
    pub fn with_overrides(file: AliasFile) -> Self {
        let mut table = Self::default();
        for (field, aliases) in file {
            table.extend(field, aliases);
        }
        table
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Normalize a header for comparison.
///
/// Strips a UTF-8 BOM (Excel CSV exports), trims, case-folds and collapses runs
/// of whitespace, `_` and `-` to a single space.
pub fn normalize_header(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}');
    name.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// How a column was matched to its field.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchKind {
    Exact,
    Fuzzy { alias: String, score: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub field: CanonicalField,
    pub index: usize,
    pub header: String,
    pub kind: MatchKind,
}

/// Which column (if any) each canonical field maps to on one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnMap {
    resolved: BTreeMap<CanonicalField, ResolvedColumn>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<&ResolvedColumn> {
        self.resolved.get(&field)
    }

    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.get(field).map(|c| c.index)
    }

    /// Field a given column index resolved to, if any.
    pub fn field_at(&self, index: usize) -> Option<CanonicalField> {
        self.resolved
            .values()
            .find(|c| c.index == index)
            .map(|c| c.field)
    }

    pub fn fuzzy_matches(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.resolved
            .values()
            .filter(|c| matches!(c.kind, MatchKind::Fuzzy { .. }))
    }

    /// Fields from `wanted` that did not resolve.
    pub fn missing<'f>(&self, wanted: impl IntoIterator<Item = &'f CanonicalField>) -> Vec<CanonicalField> {
        wanted
            .into_iter()
            .copied()
            .filter(|f| !self.resolved.contains_key(f))
            .collect()
    }
}

/// Resolves a header row against an alias table.
#[derive(Debug, Clone)]
pub struct ColumnResolver<'a> {
    aliases: &'a AliasTable,
    fuzzy_threshold: Option<f64>,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(aliases: &'a AliasTable, fuzzy_threshold: Option<f64>) -> Self {
        Self {
            aliases,
            fuzzy_threshold,
        }
    }

    /// Resolve every canonical field against `headers`.
    ///
    /// Exact matches are assigned for all fields first (leftmost header wins),
    /// then the fuzzy pass considers only headers no field has claimed.
    pub fn resolve(&self, headers: &[String]) -> ColumnMap {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut claimed = vec![false; headers.len()];
        let mut map = ColumnMap::default();

        for field in CanonicalField::ALL {
            let accepted: Vec<String> = self
                .aliases
                .aliases(field)
                .iter()
                .map(|a| normalize_header(a))
                .collect();

            let hit = normalized
                .iter()
                .enumerate()
                .find(|&(idx, h)| !claimed[idx] && !h.is_empty() && accepted.contains(h));

            if let Some((idx, _)) = hit {
                claimed[idx] = true;
                map.resolved.insert(
                    field,
                    ResolvedColumn {
                        field,
                        index: idx,
                        header: headers[idx].clone(),
                        kind: MatchKind::Exact,
                    },
                );
            }
        }

        let Some(threshold) = self.fuzzy_threshold else {
            return map;
        };

        for field in CanonicalField::ALL {
            if map.resolved.contains_key(&field) {
                continue;
            }

            let mut best: Option<(usize, &String, f64)> = None;
            for alias in self.aliases.aliases(field) {
                let alias_norm = normalize_header(alias);
                for (idx, h) in normalized.iter().enumerate() {
                    if claimed[idx] || h.is_empty() {
                        continue;
                    }
                    let score = strsim::normalized_levenshtein(h, &alias_norm);
                    let better = match best {
                        None => true,
                        Some((best_idx, _, best_score)) => {
                            score > best_score || (score == best_score && idx < best_idx)
                        }
                    };
                    if score >= threshold && better {
                        best = Some((idx, alias, score));
                    }
                }
            }

            if let Some((idx, alias, score)) = best {
                warn!(
                    field = %field,
                    header = %headers[idx],
                    alias = %alias,
                    score,
                    "Header matched by similarity; add it to the alias table if correct"
                );
                claimed[idx] = true;
                map.resolved.insert(
                    field,
                    ResolvedColumn {
                        field,
                        index: idx,
                        header: headers[idx].clone(),
                        kind: MatchKind::Fuzzy {
                            alias: alias.clone(),
                            score,
                        },
                    },
                );
            } else {
                debug!(field = %field, "No header resolved");
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalization_folds_case_space_and_separators() {
        assert_eq!(normalize_header("\u{feff}  Agency__Name "), "agency name");
        assert_eq!(normalize_header("HOST-ID"), "host id");
        assert_eq!(normalize_header("   "), "");
    }

    #[test]
    fn exact_aliases_resolve_regardless_of_spelling() {
        let aliases = AliasTable::default();
        let resolver = ColumnResolver::new(&aliases, None);
        let map = resolver.resolve(&headers(&["host_uid", "AGENCY", "Event Date", "Notes"]));
        assert_eq!(map.index(CanonicalField::HostId), Some(0));
        assert_eq!(map.index(CanonicalField::Agency), Some(1));
        assert_eq!(map.index(CanonicalField::Date), Some(2));
        assert_eq!(map.index(CanonicalField::Time), None);
        assert_eq!(map.field_at(1), Some(CanonicalField::Agency));
        assert_eq!(map.field_at(3), None);
    }

    #[test]
    fn first_matching_header_wins() {
        let aliases = AliasTable::default();
        let map = ColumnResolver::new(&aliases, None).resolve(&headers(&["Agency", "Agency Name"]));
        assert_eq!(map.index(CanonicalField::Agency), Some(0));
    }

    #[test]
    fn fuzzy_fallback_only_when_enabled() {
        let aliases = AliasTable::default();
        let typo = headers(&["Agncy Name", "Date"]);

        let strict = ColumnResolver::new(&aliases, None).resolve(&typo);
        assert_eq!(strict.index(CanonicalField::Agency), None);

        let fuzzy = ColumnResolver::new(&aliases, Some(DEFAULT_FUZZY_THRESHOLD)).resolve(&typo);
        let col = fuzzy.get(CanonicalField::Agency).unwrap();
        assert_eq!(col.index, 0);
        assert!(matches!(col.kind, MatchKind::Fuzzy { score, .. } if score >= DEFAULT_FUZZY_THRESHOLD));
        assert_eq!(fuzzy.fuzzy_matches().count(), 1);
    }

    #[test]
    fn fuzzy_does_not_steal_claimed_or_dissimilar_headers() {
        let aliases = AliasTable::default();
        let map = ColumnResolver::new(&aliases, Some(DEFAULT_FUZZY_THRESHOLD))
            .resolve(&headers(&["Agency ID", "Revenue"]));
        assert_eq!(map.index(CanonicalField::AgencyId), Some(0));
        assert_eq!(map.index(CanonicalField::Agency), None);
    }

    #[test]
    fn overrides_extend_defaults() {
        let mut file = AliasFile::new();
        file.insert(CanonicalField::Agency, vec!["Guild".to_string(), "agency name".to_string()]);
        let table = AliasTable::with_overrides(file);
        let agency = table.aliases(CanonicalField::Agency);
        assert!(agency.iter().any(|a| a == "Guild"));
        assert_eq!(agency.iter().filter(|a| normalize_header(a) == "agency name").count(), 1);

        let map = ColumnResolver::new(&table, None).resolve(&headers(&["GUILD"]));
        assert_eq!(map.index(CanonicalField::Agency), Some(0));
    }

    #[test]
    fn missing_lists_unresolved_fields() {
        let aliases = AliasTable::default();
        let map = ColumnResolver::new(&aliases, None).resolve(&headers(&["Agency Name"]));
        let missing = map.missing(&[CanonicalField::Agency, CanonicalField::Date]);
        assert_eq!(missing, vec![CanonicalField::Date]);
    }
}
