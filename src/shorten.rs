//! Identifier shortening for PostgreSQL's identifier length limit, and the
//! long → short column mapping that later migration phases read back.

use crate::error::{ConvertError, Result};
use crate::mapping::{read_resource, write_json_atomically};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// PostgreSQL's `NAMEDATALEN - 1`
pub const DEFAULT_IDENTIFIER_LIMIT: usize = 63;

/// Where the current column mapping lives, relative to the working directory
pub const COLUMN_MAPPING_FILE: &str = "logs/column_mapping.json";

const LONG_NAME_THRESHOLD: usize = 60;
const KEEP_PREFIX: usize = 40;
const KEEP_SUFFIX: usize = 20;

/// Shorten `name` to fit `limit` characters.
///
/// Names within the limit are returned unchanged. Names longer than 60
/// characters keep their first 40 and last 20 characters, so suffixes such as
/// `_id` or `_fk` survive. Anything else is cut at `limit`.
pub fn shorten(name: &str, limit: usize) -> String {
    let len = name.chars().count();
    if len <= limit {
        return name.to_string();
    }

    if len > LONG_NAME_THRESHOLD && limit >= KEEP_PREFIX + KEEP_SUFFIX {
        let prefix = name.chars().take(KEEP_PREFIX);
        let suffix = name.chars().skip(len - KEEP_SUFFIX);
        prefix.chain(suffix).collect()
    } else {
        name.chars().take(limit).collect()
    }
}

/// `"schema.table"` → original column name → shortened column name.
///
/// Only names that were actually shortened are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    tables: IndexMap<String, IndexMap<String, String>>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_key(schema: &str, table: &str) -> String {
        format!("{}.{}", schema, table)
    }

    /// Shorten a column name and record it under its table.
    ///
    /// Fails with [`ConvertError::IdentifierCollision`] when a different column
    /// of the same table already shortened to the same name.
    pub fn shorten_column(
        &mut self,
        schema: &str,
        table: &str,
        name: &str,
        limit: usize,
    ) -> Result<String> {
        let short = shorten(name, limit);
        if short == name {
            return Ok(short);
        }

        let key = Self::table_key(schema, table);
        let columns = self.tables.entry(key.clone()).or_default();

        if let Some((first, _)) = columns
            .iter()
            .find(|(original, existing)| **existing == short && original.as_str() != name)
        {
            return Err(ConvertError::IdentifierCollision {
                table: key,
                short,
                first: first.clone(),
                second: name.to_string(),
            });
        }

        debug!(table = %key, column = name, short = %short, "Shortened column name");
        columns.insert(name.to_string(), short.clone());
        Ok(short)
    }

    pub fn get(&self, schema: &str, table: &str, column: &str) -> Option<&str> {
        self.tables
            .get(&Self::table_key(schema, table))
            .and_then(|columns| columns.get(column))
            .map(String::as_str)
    }

    /// The name a column carries on the target side
    pub fn resolve<'a>(&'a self, schema: &str, table: &str, column: &'a str) -> &'a str {
        self.get(schema, table, column).unwrap_or(column)
    }

    pub fn table(&self, key: &str) -> Option<&IndexMap<String, String>> {
        self.tables.get(key)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &IndexMap<String, String>)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of shortened columns across all tables
    pub fn len(&self) -> usize {
        self.tables.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a mapping; a missing or unreadable file yields an empty mapping.
    pub fn load(path: &Path) -> Self {
        let content = match read_resource(path) {
            Ok(Some(content)) => content,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read column mapping");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Column mapping is not valid JSON, starting empty");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomically(path, self)?;
        info!(path = %path.display(), columns = self.len(), "Saved column mapping");
        Ok(())
    }

    /// Write the mapping into a fresh timestamped run directory under `logs_dir`
    /// and to `logs_dir/column_mapping.json`, the copy later phases read.
    ///
    /// Returns the run directory.
    pub fn save_run(&self, logs_dir: &Path) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("run_%Y%m%d_%H%M%S").to_string();
        let run_dir = logs_dir.join(stamp);

        self.save(&run_dir.join("column_mapping.json"))?;
        self.save(&logs_dir.join("column_mapping.json"))?;

        Ok(run_dir)
    }
}
