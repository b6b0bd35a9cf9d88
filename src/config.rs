use crate::convert::{Converter, ConverterOptions, IdentityMode};
use crate::error::{ConvertError, Result};
use crate::mapping::collations::COLLATIONS_FILE;
use crate::mapping::types::TYPE_MAPPINGS_FILE;
use crate::mapping::{CollationMappingStore, TypeMappingStore};
use crate::shorten::{COLUMN_MAPPING_FILE, DEFAULT_IDENTIFIER_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "tsql2pg.toml";
pub const SAMPLE_CONFIG_FILE: &str = "tsql2pg.toml.example";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// JSON resource mapping source types to target types
    pub type_mappings_file: Option<PathBuf>,

    /// JSON resource mapping source collations to target candidates
    pub collations_file: Option<PathBuf>,

    /// Leave COLLATE clauses untouched
    pub skip_collations: Option<bool>,

    /// Collations installed on the destination database
    pub available_collations: Option<Vec<String>>,

    /// Schema prefix stripped from qualified names
    pub default_schema: Option<String>,

    /// `always` or `by_default`
    pub identity: Option<IdentityMode>,

    /// Maximum identifier length on the target
    pub identifier_limit: Option<usize>,

    /// Where shortened column names are recorded
    pub column_mapping_file: Option<PathBuf>,
}

impl ToolConfig {
    /// Load configuration from tsql2pg.toml in the current directory
    pub fn load_from_file() -> Result<Option<Self>> {
        Self::load_from_path(Path::new(CONFIG_FILE))
    }

    pub fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| ConvertError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| ConvertError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Some(config))
    }

    /// Merge CLI arguments with config file values.
    /// CLI arguments take precedence over config file values
    pub fn merge_with_cli(config_file: Option<Self>, cli_skip_collations: bool) -> Self {
        let base_config = config_file.unwrap_or_default();

        Self {
            skip_collations: cli_skip_collations
                .then_some(true)
                .or(base_config.skip_collations),
            ..base_config
        }
    }

    pub fn type_mappings_path(&self) -> PathBuf {
        self.type_mappings_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(TYPE_MAPPINGS_FILE))
    }

    pub fn collations_path(&self) -> PathBuf {
        self.collations_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(COLLATIONS_FILE))
    }

    pub fn column_mapping_path(&self) -> PathBuf {
        self.column_mapping_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(COLUMN_MAPPING_FILE))
    }

    pub fn identifier_limit(&self) -> usize {
        self.identifier_limit.unwrap_or(DEFAULT_IDENTIFIER_LIMIT)
    }

    pub fn type_store(&self) -> TypeMappingStore {
        TypeMappingStore::new(self.type_mappings_path())
    }

    pub fn collation_store(&self) -> CollationMappingStore {
        CollationMappingStore::new(self.collations_path())
    }

    pub fn converter_options(&self) -> Result<ConverterOptions> {
        let defaults = ConverterOptions::default();
        let default_schema = match &self.default_schema {
            Some(schema) if schema.trim().is_empty() => {
                return Err(ConvertError::Configuration(
                    "default_schema must not be empty".to_string(),
                ));
            }
            Some(schema) => schema.trim().to_string(),
            None => defaults.default_schema,
        };

        Ok(ConverterOptions {
            skip_collations: self.skip_collations.unwrap_or(defaults.skip_collations),
            available_collations: self
                .available_collations
                .as_ref()
                .map(|names| names.iter().cloned().collect::<BTreeSet<_>>()),
            default_schema,
            identity: self.identity.unwrap_or(defaults.identity),
        })
    }

    /// Load both mapping resources and build a converter from them
    pub fn build_converter(&self) -> Result<Converter> {
        if self.identifier_limit == Some(0) {
            return Err(ConvertError::Configuration(
                "identifier_limit must be at least 1".to_string(),
            ));
        }
        Converter::new(
            self.type_store().load(),
            self.collation_store().load(),
            self.converter_options()?,
        )
    }

    /// Create a sample configuration file in the current directory
    pub fn write_sample_config() -> Result<PathBuf> {
        Self::write_sample_config_to(Path::new("."))
    }

    pub fn write_sample_config_to(dir: &Path) -> Result<PathBuf> {
        let sample_config = ToolConfig {
            type_mappings_file: Some(PathBuf::from(TYPE_MAPPINGS_FILE)),
            collations_file: Some(PathBuf::from(COLLATIONS_FILE)),
            skip_collations: Some(false),
            available_collations: Some(vec!["C".to_string(), "en_US.utf8".to_string()]),
            default_schema: Some("dbo".to_string()),
            identity: Some(IdentityMode::Always),
            identifier_limit: Some(DEFAULT_IDENTIFIER_LIMIT),
            column_mapping_file: Some(PathBuf::from(COLUMN_MAPPING_FILE)),
        };

        let content = toml::to_string_pretty(&sample_config)
            .map_err(|e| ConvertError::Configuration(e.to_string()))?;
        let path = dir.join(SAMPLE_CONFIG_FILE);
        fs::write(&path, content).map_err(|e| ConvertError::FileWrite {
            path: path.clone(),
            message: e.to_string(),
            source: e,
        })?;

        Ok(path)
    }
}
