//! Directory-level conversion.
//!
//! **The target directory is emptied before anything is written.** Every file and
//! subdirectory already in it is deleted, then one converted script is written per
//! `*.sql` file found in the source directory.

use crate::convert::{ConversionResult, Converter};
use crate::error::{ConvertError, ErrorContext, Result};
use crate::{log_file_converted, log_file_failed};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const UTF8_BOM: char = '\u{feff}';

/// Outcome of one converted script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub name: String,
    pub changes: usize,
    pub details: Vec<String>,
}

/// A script that could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub converted: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
    pub failures: Vec<FailedFile>,
    pub total_changes: usize,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Convert every `*.sql` file in `source` into `target`.
///
/// `target` is created if needed and then cleared completely. Files are
/// processed in file name order; a failure in one file is recorded and the
/// batch carries on. `on_line` receives one status line per file.
pub fn convert_directory(
    source: &Path,
    target: &Path,
    converter: &Converter,
    mut on_line: Option<&mut dyn FnMut(&str)>,
) -> Result<BatchResult> {
    if !source.is_dir() {
        return Err(ConvertError::DirectoryNotFound(source.to_path_buf()));
    }
    ensure_safe_target(source, target)?;

    fs::create_dir_all(target).file_context(target)?;
    clear_directory(target)?;

    let scripts = scan_sql_files(source)?;
    info!(
        source = %source.display(),
        target = %target.display(),
        scripts = scripts.len(),
        "Converting scripts"
    );

    let mut result = BatchResult::default();

    for script in &scripts {
        let name = script
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let line = match convert_file(script, &target.join(&name), converter) {
            Ok(conversion) => {
                let changes = conversion.changes();
                log_file_converted!(name.as_str(), changes);
                result.converted += 1;
                result.total_changes += changes;
                result.files.push(FileReport {
                    name: name.clone(),
                    changes,
                    details: conversion.log().entries().to_vec(),
                });
                format!("[OK] {} ({} changes)", name, changes)
            }
            Err(e) => {
                log_file_failed!(name.as_str(), e);
                result.failed += 1;
                result.failures.push(FailedFile {
                    name: name.clone(),
                    error: e.to_string(),
                });
                format!("[ERROR] {}: {}", name, e)
            }
        };

        if let Some(callback) = on_line.as_mut() {
            callback(&line);
        }
    }

    Ok(result)
}

fn convert_file(source: &Path, target: &Path, converter: &Converter) -> Result<ConversionResult> {
    let content = fs::read_to_string(source).map_err(|e| ConvertError::FileRead {
        path: source.to_path_buf(),
        message: e.to_string(),
        source: e,
    })?;
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(&content);

    let conversion = converter.convert(content);

    fs::write(target, conversion.sql()).map_err(|e| ConvertError::FileWrite {
        path: target.to_path_buf(),
        message: e.to_string(),
        source: e,
    })?;

    Ok(conversion)
}

/// Refuse targets whose clearing would delete the source scripts.
fn ensure_safe_target(source: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }
    let source_dir = source.canonicalize().file_context(source)?;
    let target_dir = target.canonicalize().file_context(target)?;

    if source_dir.starts_with(&target_dir) {
        return Err(ConvertError::UnsafeTarget {
            target: target.to_path_buf(),
            source_dir: source.to_path_buf(),
        });
    }
    Ok(())
}

fn clear_directory(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).file_context(dir)? {
        let entry = entry.file_context(dir)?;
        let path = entry.path();
        let file_type = entry.file_type().file_context(&path)?;

        if file_type.is_dir() {
            fs::remove_dir_all(&path).file_context(&path)?;
        } else {
            fs::remove_file(&path).file_context(&path)?;
        }
        debug!(path = %path.display(), "Removed from target directory");
    }
    Ok(())
}

/// `*.sql` files directly inside `dir`, sorted by name
fn scan_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sql_files = Vec::new();

    for entry in fs::read_dir(dir).file_context(dir)? {
        let path = entry.file_context(dir)?.path();
        let is_sql = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if path.is_file() && is_sql {
            sql_files.push(path);
        }
    }

    sql_files.sort();
    Ok(sql_files)
}
