//! `CREATE TABLE` rendering from source catalog column metadata.

use crate::convert::IdentityMode;
use crate::error::Result;
use crate::mapping::TypeMapping;
use crate::shorten::{ColumnMapping, DEFAULT_IDENTIFIER_LIMIT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One column as described by the source catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub identity: bool,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ..Self::default()
        }
    }

    pub fn with_length(mut self, max_length: i64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self.nullable = false;
        self
    }
}

/// `dbo` lives in `public` on the target
pub fn target_schema(source_schema: &str) -> String {
    if source_schema.eq_ignore_ascii_case("dbo") {
        "public".to_string()
    } else {
        source_schema.to_string()
    }
}

pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Strip the parentheses SQL Server wraps defaults in and translate the common
/// function defaults.
pub fn clean_default(raw: &str) -> String {
    let mut value = raw.trim();
    while wrapped_in_parens(value) {
        value = value[1..value.len() - 1].trim();
    }

    if value.eq_ignore_ascii_case("getdate()") {
        "CURRENT_TIMESTAMP".to_string()
    } else if value.eq_ignore_ascii_case("newid()") {
        "gen_random_uuid()".to_string()
    } else {
        value.to_string()
    }
}

/// Whether the opening parenthesis at the start closes at the very end
fn wrapped_in_parens(value: &str) -> bool {
    if !(value.starts_with('(') && value.ends_with(')')) {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == value.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Renders target-side table DDL and records shortened column names
#[derive(Debug, Clone)]
pub struct TableRenderer<'a> {
    types: &'a TypeMapping,
    identity: IdentityMode,
    identifier_limit: usize,
}

impl<'a> TableRenderer<'a> {
    pub fn new(types: &'a TypeMapping) -> Self {
        Self {
            types,
            identity: IdentityMode::default(),
            identifier_limit: DEFAULT_IDENTIFIER_LIMIT,
        }
    }

    pub fn with_identity(mut self, identity: IdentityMode) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_identifier_limit(mut self, limit: usize) -> Self {
        self.identifier_limit = limit;
        self
    }

    /// `CREATE TABLE "schema"."table" (...)` for one source table.
    ///
    /// Column names longer than the identifier limit are shortened and recorded
    /// in `mapping` under `"source_schema.table"`.
    pub fn create_table(
        &self,
        schema: &str,
        table: &str,
        columns: &[SourceColumn],
        mapping: &mut ColumnMapping,
    ) -> Result<String> {
        let definitions = columns
            .iter()
            .map(|column| self.column_definition(schema, table, column, mapping))
            .collect::<Result<Vec<_>>>()?;

        let statement = format!(
            "CREATE TABLE \"{}\".\"{}\" (\n    {}\n)",
            target_schema(schema),
            normalize_name(table),
            definitions.join(",\n    ")
        );
        debug!(schema, table, columns = columns.len(), "Rendered CREATE TABLE");
        Ok(statement)
    }

    /// Schema creation (outside `public`), drop and create, in execution order.
    pub fn table_statements(
        &self,
        schema: &str,
        table: &str,
        columns: &[SourceColumn],
        mapping: &mut ColumnMapping,
    ) -> Result<Vec<String>> {
        let target = target_schema(schema);
        let mut statements = Vec::with_capacity(3);
        if !target.eq_ignore_ascii_case("public") {
            statements.push(format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", target));
        }
        statements.push(format!(
            "DROP TABLE IF EXISTS \"{}\".\"{}\" CASCADE",
            target,
            normalize_name(table)
        ));
        statements.push(self.create_table(schema, table, columns, mapping)?);
        Ok(statements)
    }

    fn column_definition(
        &self,
        schema: &str,
        table: &str,
        column: &SourceColumn,
        mapping: &mut ColumnMapping,
    ) -> Result<String> {
        let short = mapping.shorten_column(schema, table, &column.name, self.identifier_limit)?;
        let name = normalize_name(&short);

        if column.identity {
            return Ok(format!("\"{}\" BIGINT {} NOT NULL", name, self.identity.clause()));
        }

        let data_type = self.types.column_type(
            &column.data_type,
            column.max_length,
            column.precision,
            column.scale,
        );
        let mut definition = format!("\"{}\" {}", name, data_type);
        if !column.nullable {
            definition.push_str(" NOT NULL");
        }
        if let Some(default) = column.default.as_deref().filter(|d| !d.trim().is_empty()) {
            definition.push_str(" DEFAULT ");
            definition.push_str(&clean_default(default));
        }
        Ok(definition)
    }
}
