//! JSON configuration files.
//!
//! - tier tables: `{ "name", "convention": "upper-bound"|"minimum", "kind": "rate"|"fixed", "tiers": [{threshold, value}] }`
//! - denominations: `[{ "size": 10999, "value": 3045 }, ...]`
//! - alias overrides: `{ "agency": ["Agency Title"], "host-id": ["UID"] }`
//!
//! Tables and unit lists are validated while deserializing, so a file that
//! loads is a file the resolver can use.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::columns::{AliasFile, AliasTable};
use crate::tier::{Denominations, TierTable};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_tier_table(path: &Path) -> Result<TierTable, ConfigError> {
    read_json(path)
}

pub fn load_denominations(path: &Path) -> Result<Denominations, ConfigError> {
    read_json(path)
}

/// Default aliases extended with the file's spellings.
pub fn load_aliases(path: &Path) -> Result<AliasTable, ConfigError> {
    let file: AliasFile = read_json(path)?;
    Ok(AliasTable::with_overrides(file))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
