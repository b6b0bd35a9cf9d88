use crate::config::ToolConfig;
use crate::error::{ConvertError, Result};
use crate::shorten::ColumnMapping;
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ShortenResult {
    /// `"schema.table"`
    pub table: String,
    /// (original, shortened) in input order
    pub columns: Vec<(String, String)>,
    pub mapping_file: PathBuf,
}

impl ShortenResult {
    pub fn shortened(&self) -> usize {
        self.columns.iter().filter(|(long, short)| long != short).count()
    }
}

/// Split `schema.table`; a bare table name lives in the configured default schema.
fn split_table(qualified: &str, config: &ToolConfig) -> Result<(String, String)> {
    let (schema, table) = match qualified.split_once('.') {
        Some((schema, table)) => (schema.trim().to_string(), table.trim().to_string()),
        None => (
            config.default_schema.clone().unwrap_or_else(|| "dbo".to_string()),
            qualified.trim().to_string(),
        ),
    };
    if schema.is_empty() || table.is_empty() {
        return Err(ConvertError::Configuration(format!(
            "expected schema.table, got '{}'",
            qualified
        )));
    }
    Ok((schema, table))
}

/// Shorten column names for one table and record them in the column mapping file.
pub fn execute_shorten(
    qualified_table: &str,
    names: &[String],
    config: &ToolConfig,
) -> Result<ShortenResult> {
    let (schema, table) = split_table(qualified_table, config)?;
    let mapping_file = config.column_mapping_path();
    let limit = config.identifier_limit();

    let mut mapping = ColumnMapping::load(&mapping_file);
    let columns = names
        .iter()
        .map(|name| {
            mapping
                .shorten_column(&schema, &table, name, limit)
                .map(|short| (name.clone(), short))
        })
        .collect::<Result<Vec<_>>>()?;

    if columns.iter().any(|(long, short)| long != short) {
        mapping.save(&mapping_file)?;
    }

    Ok(ShortenResult {
        table: ColumnMapping::table_key(&schema, &table),
        columns,
        mapping_file,
    })
}

#[cfg(feature = "cli")]
pub fn print_shorten_summary(result: &ShortenResult) {
    println!("\n{} {}", "=== Column names for".bold().blue(), result.table.bold().blue());

    for (long, short) in &result.columns {
        if long == short {
            println!("  {} {}", "=".dimmed(), long);
        } else {
            println!("  {} {} {} {}", "✓".green().bold(), long.yellow(), "->".dimmed(), short.cyan());
        }
    }

    if result.shortened() > 0 {
        println!(
            "\n{} shortened, recorded in {}",
            result.shortened().to_string().yellow(),
            result.mapping_file.display().cyan()
        );
    } else {
        println!("\n{}", "All names fit; nothing recorded.".green());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_shorten_records_long_names() {
        let dir = tempdir().unwrap();
        let config = ToolConfig {
            column_mapping_file: Some(dir.path().join("logs").join("column_mapping.json")),
            ..ToolConfig::default()
        };
        let long = format!("{}_id", "a".repeat(70));
        let names = vec!["Id".to_string(), long.clone()];

        let result = execute_shorten("sales.Orders", &names, &config).unwrap();
        assert_eq!(result.table, "sales.Orders");
        assert_eq!(result.shortened(), 1);
        assert_eq!(result.columns[0], ("Id".to_string(), "Id".to_string()));
        assert!(result.columns[1].1.ends_with("_id"));

        let saved = ColumnMapping::load(&result.mapping_file);
        assert_eq!(saved.get("sales", "Orders", &long), Some(result.columns[1].1.as_str()));
    }

    #[test]
    fn test_bare_table_uses_default_schema() {
        let dir = tempdir().unwrap();
        let config = ToolConfig {
            column_mapping_file: Some(dir.path().join("map.json")),
            ..ToolConfig::default()
        };
        let result = execute_shorten("Orders", &["Id".to_string()], &config).unwrap();
        assert_eq!(result.table, "dbo.Orders");
        assert!(!result.mapping_file.exists());

        assert!(matches!(
            execute_shorten(".Orders", &[], &config),
            Err(ConvertError::Configuration(_))
        ));
    }
}
