//! External mapping resources: source type → target type, and source collation →
//! ordered target collation candidates.
//!
//! Both stores follow the same contract: `load()` never fails (it falls back to the
//! built-in tables and logs a warning), `ensure()` creates or repairs the JSON file.

pub mod collations;
pub mod types;

pub use collations::{CollationMapping, CollationMappingStore, DEFAULT_COLLATION};
pub use types::{TypeMapping, TypeMappingStore, FALLBACK_TYPE};

use crate::error::{ConvertError, ErrorContext, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// What `ensure()` did to a mapping resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The file did not exist and was written with the defaults
    Created,
    /// The file existed but was not valid JSON and was rewritten with the defaults
    Repaired,
    /// The file existed and parsed; it was left alone
    Unchanged,
}

/// Serialize `value` as pretty JSON and move it into place in one step, so a crash
/// never leaves a half-written resource behind.
pub(crate) fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).file_context(dir)?;

    let content = serde_json::to_string_pretty(value)?;
    let mut file = tempfile::NamedTempFile::new_in(dir).file_context(dir)?;
    file.write_all(content.as_bytes()).file_context(path)?;
    file.write_all(b"\n").file_context(path)?;
    file.persist(path).map_err(|e| ConvertError::FileWrite {
        path: path.to_path_buf(),
        message: "could not move temporary file into place".to_string(),
        source: e.error,
    })?;

    Ok(())
}

/// Read a resource file; `Ok(None)` when it does not exist.
pub(crate) fn read_resource(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| ConvertError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
