#![allow(dead_code)]

pub mod fixtures;

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tsql2pg::Converter;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn converter() -> Converter {
    Converter::with_defaults().expect("default converter")
}

/// Convert with the built-in tables and return only the SQL
pub fn convert(sql: &str) -> String {
    converter().convert(sql).sql().to_string()
}

/// Source and target directories inside one temporary directory
pub struct ScriptDirs {
    pub temp_dir: TempDir,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl ScriptDirs {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let source = temp_dir.path().join("tsql");
        let target = temp_dir.path().join("pgsql");
        fs::create_dir(&source).expect("source dir");
        Self {
            temp_dir,
            source,
            target,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_script(&self, name: &str, content: &str) {
        fs::write(self.source.join(name), content).expect("write script");
    }

    pub fn read_output(&self, name: &str) -> String {
        fs::read_to_string(self.target.join(name)).expect("read output")
    }

    /// Sorted names of everything directly inside the target directory
    pub fn target_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.target)
            .expect("read target")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}
