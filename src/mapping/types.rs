//! Source type → target type mapping.

use super::{read_resource, write_json_atomically, EnsureOutcome};
use crate::error::{ConvertError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name of the type mapping resource
pub const TYPE_MAPPINGS_FILE: &str = "type_mappings_config.json";

/// Target type used for any source type the mapping does not know
pub const FALLBACK_TYPE: &str = "TEXT";

const DEFAULT_TYPE_MAPPINGS: &[(&str, &str)] = &[
    ("bigint", "BIGINT"),
    ("int", "INTEGER"),
    ("smallint", "SMALLINT"),
    ("tinyint", "SMALLINT"),
    ("bit", "BOOLEAN"),
    ("decimal", "DECIMAL"),
    ("numeric", "NUMERIC"),
    ("money", "NUMERIC(19,4)"),
    ("smallmoney", "NUMERIC(10,4)"),
    ("float", "DOUBLE PRECISION"),
    ("real", "REAL"),
    ("datetime", "TIMESTAMPTZ"),
    ("datetime2", "TIMESTAMPTZ"),
    ("smalldatetime", "TIMESTAMPTZ"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("datetimeoffset", "TIMESTAMP WITH TIME ZONE"),
    ("char", "CHAR"),
    ("varchar", "VARCHAR"),
    ("text", "TEXT"),
    ("nchar", "CHAR"),
    ("nvarchar", "VARCHAR"),
    ("ntext", "TEXT"),
    ("binary", "BYTEA"),
    ("varbinary", "BYTEA"),
    ("image", "BYTEA"),
    ("uniqueidentifier", "UUID"),
    ("xml", "XML"),
];

const LENGTH_TYPES: &[&str] = &["char", "varchar", "nchar", "nvarchar"];
const PRECISION_TYPES: &[&str] = &["decimal", "numeric"];

/// Ordered mapping from lowercase source type names to target type names.
///
/// Order is preserved from the resource file because the converter applies the
/// entries in sequence and reports them in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    entries: IndexMap<String, String>,
}

impl TypeMapping {
    /// Build a mapping, normalising keys to lowercase and dropping blank entries.
    pub fn new(entries: IndexMap<String, String>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|(source, target)| {
                let source = source.trim().to_lowercase();
                let target = target.trim().to_string();
                if source.is_empty() || target.is_empty() {
                    None
                } else {
                    Some((source, target))
                }
            })
            .collect();
        Self { entries }
    }

    /// The built-in table used when no usable resource exists
    pub fn defaults() -> Self {
        Self::new(
            DEFAULT_TYPE_MAPPINGS
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        )
    }

    pub fn get(&self, source_type: &str) -> Option<&str> {
        self.entries
            .get(&source_type.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Target type for `source_type`, falling back to [`FALLBACK_TYPE`]
    pub fn target_for(&self, source_type: &str) -> &str {
        self.get(source_type).unwrap_or(FALLBACK_TYPE)
    }

    /// Render a full column type from catalog metadata.
    ///
    /// Character types carry their length (or become `TEXT` when unbounded),
    /// decimal types carry `(precision,scale)` when both are known.
    pub fn column_type(
        &self,
        data_type: &str,
        max_length: Option<i64>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> String {
        let lowered = data_type.trim().to_lowercase();
        let base = self.target_for(&lowered);

        if LENGTH_TYPES.contains(&lowered.as_str()) {
            return match max_length {
                Some(len) if len > 0 => format!("{}({})", base, len),
                _ => FALLBACK_TYPE.to_string(),
            };
        }

        if PRECISION_TYPES.contains(&lowered.as_str()) {
            if let (Some(p), Some(s)) = (precision, scale) {
                if p > 0 {
                    return format!("{}({},{})", base, p, s);
                }
            }
        }

        base.to_string()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TypeMappingsResource {
    #[serde(default)]
    type_mappings: IndexMap<String, String>,
}

/// Loads and maintains the type mapping resource
#[derive(Debug, Clone)]
pub struct TypeMappingStore {
    path: PathBuf,
}

impl TypeMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the mapping, degrading to the defaults on any problem.
    pub fn load(&self) -> TypeMapping {
        match self.try_load() {
            Ok(Some(mapping)) if !mapping.is_empty() => {
                debug!(path = %self.path.display(), entries = mapping.len(), "Loaded type mappings");
                mapping
            }
            Ok(Some(_)) => {
                warn!(path = %self.path.display(), "Type mapping resource is empty, using defaults");
                TypeMapping::defaults()
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No type mapping resource, using defaults");
                TypeMapping::defaults()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not load type mappings, using defaults");
                TypeMapping::defaults()
            }
        }
    }

    fn try_load(&self) -> Result<Option<TypeMapping>> {
        let Some(content) = read_resource(&self.path)? else {
            return Ok(None);
        };
        let resource: TypeMappingsResource =
            serde_json::from_str(&content).map_err(|e| ConvertError::ConfigParse {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(Some(TypeMapping::new(resource.type_mappings)))
    }

    /// Write the defaults if the resource is missing, rewrite it if it is not valid JSON.
    pub fn ensure(&self) -> Result<EnsureOutcome> {
        let outcome = match read_resource(&self.path)? {
            None => EnsureOutcome::Created,
            Some(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(_) => return Ok(EnsureOutcome::Unchanged),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Type mapping resource is corrupt, rewriting");
                    EnsureOutcome::Repaired
                }
            },
        };

        let defaults = TypeMapping::defaults();
        let resource = TypeMappingsResource {
            type_mappings: defaults.entries.clone(),
        };
        write_json_atomically(&self.path, &resource)?;
        info!(
            path = %self.path.display(),
            entries = defaults.len(),
            "Wrote default type mappings"
        );

        Ok(outcome)
    }
}

impl Default for TypeMappingStore {
    fn default() -> Self {
        Self::new(TYPE_MAPPINGS_FILE)
    }
}
