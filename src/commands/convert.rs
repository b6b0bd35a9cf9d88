use crate::batch::{convert_directory, BatchResult};
use crate::config::ToolConfig;
use crate::error::Result;
use crate::output::OutputHandler;
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct ConvertResult {
    #[serde(flatten)]
    pub batch: BatchResult,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Convert every script in `source` into `target`.
///
/// Missing mapping resources are created first; if that fails the built-in
/// tables are used and the run carries on.
pub fn execute_convert(
    source: &Path,
    target: &Path,
    config: &ToolConfig,
    output: &dyn OutputHandler,
) -> Result<ConvertResult> {
    let start = Instant::now();

    let type_store = config.type_store();
    if let Err(e) = type_store.ensure() {
        warn!(path = %type_store.path().display(), error = %e, "Could not create type mapping resource");
    }
    let collation_store = config.collation_store();
    if let Err(e) = collation_store.ensure() {
        warn!(path = %collation_store.path().display(), error = %e, "Could not create collation mapping resource");
    }

    let converter = config.build_converter()?;
    if converter.options().skip_collations {
        output.warning("COLLATE clauses are left unchanged");
    }
    output.status(
        "Converting",
        &format!("{} -> {}", source.display(), target.display()),
    );

    let mut forward = |line: &str| {
        if line.starts_with("[ERROR]") {
            output.error(line);
        } else {
            output.info(line);
        }
    };
    let batch = convert_directory(source, target, &converter, Some(&mut forward))?;

    let elapsed = start.elapsed();
    info!(
        converted = batch.converted,
        failed = batch.failed,
        changes = batch.total_changes,
        elapsed = %crate::logging::format_duration(elapsed),
        "Conversion finished"
    );

    Ok(ConvertResult { batch, elapsed })
}

#[cfg(feature = "cli")]
pub fn print_convert_summary(result: &ConvertResult) {
    let batch = &result.batch;
    println!("\n{}", "=== tsql2pg Conversion Summary ===".bold().blue());

    if !batch.files.is_empty() {
        println!("\n{}:", "Converted".bold().green());
        for file in &batch.files {
            println!(
                "  {} {} ({} changes)",
                "✓".green().bold(),
                file.name.cyan(),
                file.changes.to_string().yellow()
            );
        }
    }

    if !batch.failures.is_empty() {
        println!("\n{}:", "Failed".bold().red());
        for failure in &batch.failures {
            println!("  {} {}: {}", "✗".red().bold(), failure.name.cyan(), failure.error.red());
        }
    }

    println!(
        "\n{}: {} converted, {} failed, {} changes in {}",
        "Summary".bold(),
        batch.converted.to_string().yellow(),
        batch.failed.to_string().yellow(),
        batch.total_changes.to_string().yellow(),
        crate::logging::format_duration(result.elapsed)
    );

    if batch.converted == 0 && batch.failed == 0 {
        println!("\n{}", "No .sql files found.".yellow());
    } else if batch.is_success() {
        println!("\n{} {}", "✓".green().bold(), "All scripts converted".green().bold());
    } else {
        println!(
            "\n{} {}",
            "✗".red().bold(),
            format!("{} scripts failed", batch.failed).red().bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{LibraryOutputHandler, OutputLevel};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_execute_convert_reports_lines() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in");
        let target = dir.path().join("out");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("V1__init.sql"), "CREATE TABLE [t] ([id] int)\nGO\n").unwrap();

        let config = ToolConfig {
            type_mappings_file: Some(dir.path().join("types.json")),
            collations_file: Some(dir.path().join("collations.json")),
            skip_collations: Some(true),
            ..ToolConfig::default()
        };
        let handler = LibraryOutputHandler::new();

        let result = execute_convert(&source, &target, &config, &handler).unwrap();
        assert_eq!(result.batch.converted, 1);
        assert!(dir.path().join("types.json").exists());
        assert!(dir.path().join("collations.json").exists());

        let messages = handler.get_messages();
        assert_eq!(messages[0].0, OutputLevel::Warning);
        assert!(messages
            .iter()
            .any(|(level, m)| *level == OutputLevel::Info && m.starts_with("[OK] V1__init.sql")));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["converted"], 1);
        assert!(json.get("elapsed").is_none());
    }
}
