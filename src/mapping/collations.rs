//! Source collation → ordered target collation candidates.

use super::{read_resource, write_json_atomically, EnsureOutcome};
use crate::error::{ConvertError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name of the collation mapping resource
pub const COLLATIONS_FILE: &str = "collations_config.json";

/// Sentinel candidate: use whatever the destination database defaults to
pub const DEFAULT_COLLATION: &str = "default";

const CASE_INSENSITIVE_CANDIDATES: &[&str] = &[
    "de-DE-x-icu",
    "de_DE.utf8",
    "de_DE",
    "en-US-x-icu",
    "en_US.utf8",
    "C.UTF-8",
];

fn default_entries() -> IndexMap<String, Vec<String>> {
    let ci_full = vec![
        "de-DE-x-icu",
        "de_DE.utf8",
        "de_DE",
        "en-US-x-icu",
        "en_US.utf8",
        "C.UTF-8",
        DEFAULT_COLLATION,
    ];
    let table: Vec<(&str, Vec<&str>)> = vec![
        ("SQL_Latin1_General_CP1_CI_AS", ci_full.clone()),
        ("Latin1_General_CI_AS", ci_full),
        ("SQL_Latin1_General_CP1_CS_AS", vec!["C"]),
        ("Latin1_General_CS_AS", vec!["C"]),
        (
            "German_PhoneBook_CI_AS",
            vec!["de-DE-x-icu", "de_DE.utf8", "de_DE", DEFAULT_COLLATION],
        ),
        (
            "SQL_Latin1_General_CP850_CI_AS",
            vec![
                "de-DE-x-icu",
                "de_DE.utf8",
                "de_DE",
                "en-US-x-icu",
                "en_US.utf8",
                DEFAULT_COLLATION,
            ],
        ),
        (
            DEFAULT_COLLATION,
            vec!["en-US-x-icu", "en_US.utf8", "C.UTF-8", DEFAULT_COLLATION],
        ),
    ];

    table
        .into_iter()
        .map(|(source, candidates)| {
            (
                source.to_string(),
                candidates.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

fn is_default(name: &str) -> bool {
    name.eq_ignore_ascii_case(DEFAULT_COLLATION)
}

/// Ordered mapping from source collation names to candidate lists.
///
/// Every candidate list is non-empty. Resolution walks a list front to back and
/// stops at the first candidate the destination has installed; `default` is
/// always satisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationMapping {
    entries: IndexMap<String, Vec<String>>,
}

impl CollationMapping {
    pub fn new(entries: IndexMap<String, Vec<String>>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|(source, candidates)| {
                let candidates: Vec<String> = candidates
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if source.trim().is_empty() {
                    None
                } else if candidates.is_empty() {
                    warn!(collation = %source, "Ignoring collation mapping without candidates");
                    None
                } else {
                    Some((source.trim().to_string(), candidates))
                }
            })
            .collect();
        Self { entries }
    }

    pub fn defaults() -> Self {
        Self::new(default_entries())
    }

    /// An empty mapping, used when collation rewriting is switched off
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Candidates configured for `source`, matched case-insensitively
    pub fn candidates(&self, source: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(source))
            .map(|(_, candidates)| candidates.as_slice())
    }

    /// Configured source collation names, excluding the `default` entry
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| !is_default(name))
    }

    /// Resolve `source` against the collations installed on the destination.
    ///
    /// `available = None` means the destination is unknown and the first candidate
    /// wins. Unknown source collations go through the `default` entry when one is
    /// configured, otherwise through a case-sensitivity heuristic. Returns
    /// [`DEFAULT_COLLATION`] when nothing matches.
    pub fn resolve(&self, source: &str, available: Option<&BTreeSet<String>>) -> String {
        let heuristic;
        let candidates: &[String] = match self
            .candidates(source)
            .or_else(|| self.candidates(DEFAULT_COLLATION))
        {
            Some(candidates) => candidates,
            None => {
                heuristic = heuristic_candidates(source);
                &heuristic
            }
        };

        candidates
            .iter()
            .find(|candidate| {
                is_default(candidate) || available.map_or(true, |set| set.contains(*candidate))
            })
            .map(|candidate| {
                if is_default(candidate) {
                    DEFAULT_COLLATION.to_string()
                } else {
                    candidate.clone()
                }
            })
            .unwrap_or_else(|| DEFAULT_COLLATION.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CollationMapping {
    fn default() -> Self {
        Self::defaults()
    }
}

fn heuristic_candidates(source: &str) -> Vec<String> {
    let upper = source.to_uppercase();
    let mut candidates: Vec<String> = if upper.contains("_CI") {
        CASE_INSENSITIVE_CANDIDATES
            .iter()
            .map(|c| c.to_string())
            .collect()
    } else {
        vec!["C".to_string()]
    };
    candidates.push(DEFAULT_COLLATION.to_string());
    candidates
}

#[derive(Debug, Deserialize)]
struct CollationsResource {
    #[serde(default)]
    collations: IndexMap<String, Vec<String>>,
}

fn default_resource() -> serde_json::Value {
    json!({
        "_comment": "Collation mapping for converted scripts and column collations",
        "_description": "Maps each source collation to PostgreSQL collations in order of preference",
        "_help": "Several candidates may be listed per source collation. The first one installed on the destination is used; \"default\" keeps the database default collation.",
        "collations": default_entries(),
        "_examples": {
            "CI_AS": "Case Insensitive, Accent Sensitive",
            "CS_AS": "Case Sensitive, Accent Sensitive",
            "_": "Further source collations can be added freely"
        }
    })
}

/// Loads and maintains the collation mapping resource
#[derive(Debug, Clone)]
pub struct CollationMappingStore {
    path: PathBuf,
}

impl CollationMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in a working directory, using the default file name
    pub fn in_dir(work_dir: &Path) -> Self {
        Self::new(work_dir.join(COLLATIONS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the mapping, degrading to the defaults on any problem.
    pub fn load(&self) -> CollationMapping {
        match self.try_load() {
            Ok(Some(mapping)) if !mapping.is_empty() => {
                debug!(path = %self.path.display(), entries = mapping.len(), "Loaded collation mappings");
                mapping
            }
            Ok(Some(_)) => {
                warn!(path = %self.path.display(), "Collation mapping resource is empty, using defaults");
                CollationMapping::defaults()
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No collation mapping resource, using defaults");
                CollationMapping::defaults()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not load collation mappings, using defaults");
                CollationMapping::defaults()
            }
        }
    }

    fn try_load(&self) -> Result<Option<CollationMapping>> {
        let Some(content) = read_resource(&self.path)? else {
            return Ok(None);
        };
        let resource: CollationsResource =
            serde_json::from_str(&content).map_err(|e| ConvertError::ConfigParse {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(Some(CollationMapping::new(resource.collations)))
    }

    /// Write the documented default resource if missing, rewrite it if it is not valid JSON.
    pub fn ensure(&self) -> Result<EnsureOutcome> {
        let outcome = match read_resource(&self.path)? {
            None => EnsureOutcome::Created,
            Some(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(_) => return Ok(EnsureOutcome::Unchanged),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Collation mapping resource is corrupt, rewriting");
                    EnsureOutcome::Repaired
                }
            },
        };

        write_json_atomically(&self.path, &default_resource())?;
        info!(path = %self.path.display(), "Wrote default collation mappings");

        Ok(outcome)
    }
}

impl Default for CollationMappingStore {
    fn default() -> Self {
        Self::new(COLLATIONS_FILE)
    }
}
