//! T-SQL → PostgreSQL script converter.
//!
//! The converter is a fixed, ordered list of textual rewrite passes. No AST is
//! built: every pass is a regex or line-oriented rewrite over the whole script,
//! and the order of passes is part of the observable behavior.

mod blocks;
mod rules;
mod wrap;

pub use blocks::IfDepthTracker;

use crate::error::Result;
use crate::log_pass;
use crate::mapping::{CollationMapping, TypeMapping, DEFAULT_COLLATION};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How `IDENTITY(seed, increment)` columns are expressed on the target side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    #[default]
    Always,
    ByDefault,
}

impl IdentityMode {
    pub fn clause(self) -> &'static str {
        match self {
            IdentityMode::Always => "GENERATED ALWAYS AS IDENTITY",
            IdentityMode::ByDefault => "GENERATED BY DEFAULT AS IDENTITY",
        }
    }
}

/// Knobs for a [`Converter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Leave `COLLATE` clauses untouched
    pub skip_collations: bool,
    /// Collations installed on the destination; `None` means unknown
    pub available_collations: Option<BTreeSet<String>>,
    /// Schema prefix stripped from qualified names
    pub default_schema: String,
    pub identity: IdentityMode,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            skip_collations: false,
            available_collations: None,
            default_schema: "dbo".to_string(),
            identity: IdentityMode::default(),
        }
    }
}

/// Ordered, human-readable record of the rewrites applied to one script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversionLog {
    entries: Vec<String>,
}

impl ConversionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Rewritten script plus the log of what changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    sql: String,
    log: ConversionLog,
}

impl ConversionResult {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn log(&self) -> &ConversionLog {
        &self.log
    }

    /// Number of log entries, i.e. rewrite rules that changed something
    pub fn changes(&self) -> usize {
        self.log.len()
    }

    pub fn into_parts(self) -> (String, ConversionLog) {
        (self.sql, self.log)
    }
}

/// One stage of the pipeline. Stages run in [`PIPELINE`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    BatchSeparators,
    DataTypes,
    Collations,
    SchemaPrefix,
    BracketIdentifiers,
    BlockStructure,
    Procedures,
    Transactions,
    ExtendedProperties,
    ParentObjectGuards,
    ObjectIdGuards,
    ForeignKeyChecks,
    DropIndex,
    DropConstraint,
    DropStatements,
    TimestampDefaults,
    Lowercase,
    Format,
    Cleanup,
}

pub const PIPELINE: &[Pass] = &[
    Pass::BatchSeparators,
    Pass::DataTypes,
    Pass::Collations,
    Pass::SchemaPrefix,
    Pass::BracketIdentifiers,
    Pass::BlockStructure,
    Pass::Procedures,
    Pass::Transactions,
    Pass::ExtendedProperties,
    Pass::ParentObjectGuards,
    Pass::ObjectIdGuards,
    Pass::ForeignKeyChecks,
    Pass::DropIndex,
    Pass::DropConstraint,
    Pass::DropStatements,
    Pass::TimestampDefaults,
    Pass::Lowercase,
    Pass::Format,
    Pass::Cleanup,
];

impl Pass {
    pub fn name(self) -> &'static str {
        match self {
            Pass::BatchSeparators => "batch_separators",
            Pass::DataTypes => "data_types",
            Pass::Collations => "collations",
            Pass::SchemaPrefix => "schema_prefix",
            Pass::BracketIdentifiers => "bracket_identifiers",
            Pass::BlockStructure => "block_structure",
            Pass::Procedures => "procedures",
            Pass::Transactions => "transactions",
            Pass::ExtendedProperties => "extended_properties",
            Pass::ParentObjectGuards => "parent_object_guards",
            Pass::ObjectIdGuards => "object_id_guards",
            Pass::ForeignKeyChecks => "foreign_key_checks",
            Pass::DropIndex => "drop_index",
            Pass::DropConstraint => "drop_constraint",
            Pass::DropStatements => "drop_statements",
            Pass::TimestampDefaults => "timestamp_defaults",
            Pass::Lowercase => "lowercase",
            Pass::Format => "format",
            Pass::Cleanup => "cleanup",
        }
    }

    fn apply(self, cx: &Converter, sql: &str, log: &mut ConversionLog) -> String {
        match self {
            Pass::BatchSeparators => rules::batch_separators(sql, log),
            Pass::DataTypes => rules::data_types(cx, sql, log),
            Pass::Collations => rules::collations(cx, sql, log),
            Pass::SchemaPrefix => rules::schema_prefix(cx, sql, log),
            Pass::BracketIdentifiers => rules::bracket_identifiers(sql, log),
            Pass::BlockStructure => {
                if blocks::has_anonymous_block(sql) {
                    blocks::normalize_blocks(sql, log)
                } else {
                    let result = wrap::eliminate_always_true_ddl(sql, log);
                    let result = wrap::wrap_if_exists(cx, &result, log);
                    wrap::identity_columns(cx, &result, log)
                }
            }
            Pass::Procedures => rules::procedures(sql, log),
            Pass::Transactions => rules::transactions(sql, log),
            Pass::ExtendedProperties => rules::extended_properties(sql, log),
            Pass::ParentObjectGuards => rules::parent_object_guards(sql, log),
            Pass::ObjectIdGuards => rules::object_id_guards(sql, log),
            Pass::ForeignKeyChecks => rules::foreign_key_checks(sql, log),
            Pass::DropIndex => rules::drop_index(sql, log),
            Pass::DropConstraint => rules::drop_constraint(sql, log),
            Pass::DropStatements => rules::drop_statements(sql, log),
            Pass::TimestampDefaults => rules::timestamp_defaults(sql, log),
            Pass::Lowercase => rules::lowercase(sql, log),
            Pass::Format => rules::format_blocks(sql, log),
            Pass::Cleanup => rules::cleanup(sql, log),
        }
    }
}

struct TypeRule {
    source: String,
    target: String,
    pattern: Regex,
}

struct CollationRule {
    source: String,
    /// `None` when the resolution ended at the `default` sentinel
    target: Option<String>,
    pattern: Regex,
}

/// Converts T-SQL scripts to PostgreSQL.
///
/// A converter holds only immutable configuration; every [`Converter::convert`]
/// call starts from a fresh log, so one instance can be reused (and shared across
/// threads) for any number of scripts.
pub struct Converter {
    types: TypeMapping,
    collations: CollationMapping,
    options: ConverterOptions,
    type_rules: Vec<TypeRule>,
    collation_rules: Vec<CollationRule>,
    schema_prefix: Regex,
}

impl Converter {
    pub fn new(
        types: TypeMapping,
        collations: CollationMapping,
        options: ConverterOptions,
    ) -> Result<Self> {
        let type_rules = types
            .iter()
            .map(|(source, target)| {
                Ok(TypeRule {
                    source: source.to_string(),
                    target: target.to_string(),
                    pattern: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(source)))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let collation_rules = if options.skip_collations {
            Vec::new()
        } else {
            collations
                .source_names()
                .map(|source| {
                    let resolved =
                        collations.resolve(source, options.available_collations.as_ref());
                    Ok(CollationRule {
                        source: source.to_string(),
                        target: (resolved != DEFAULT_COLLATION).then_some(resolved),
                        pattern: Regex::new(&format!(
                            r"(?i)(\s*)\bCOLLATE\s+{}\b",
                            regex::escape(source)
                        ))?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        let schema = regex::escape(&options.default_schema);
        let schema_prefix = Regex::new(&format!(
            r#"(?i)(?:\[{0}\]|"{0}"|\b{0})\."#,
            schema
        ))?;

        Ok(Self {
            types,
            collations,
            options,
            type_rules,
            collation_rules,
            schema_prefix,
        })
    }

    /// Converter with the built-in type and collation tables
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            TypeMapping::defaults(),
            CollationMapping::defaults(),
            ConverterOptions::default(),
        )
    }

    pub fn types(&self) -> &TypeMapping {
        &self.types
    }

    pub fn collations(&self) -> &CollationMapping {
        &self.collations
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Run the whole pipeline over one script.
    pub fn convert(&self, sql: &str) -> ConversionResult {
        let mut log = ConversionLog::new();
        let mut text = sql.to_string();

        for pass in PIPELINE {
            let next = pass.apply(self, &text, &mut log);
            if next != text {
                log_pass!(pass.name(), text.len(), next.len());
            }
            text = next;
        }

        ConversionResult { sql: text, log }
    }
}
