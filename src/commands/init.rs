use crate::config::ToolConfig;
use crate::error::Result;
use crate::mapping::EnsureOutcome;
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct InitResult {
    pub type_mappings: (PathBuf, EnsureOutcome),
    pub collations: (PathBuf, EnsureOutcome),
    pub sample_config: PathBuf,
}

/// Create or repair both mapping resources and write a sample configuration
/// into `dir`.
pub fn execute_init(config: &ToolConfig, dir: &Path) -> Result<InitResult> {
    let type_store = config.type_store();
    let types_outcome = type_store.ensure()?;

    let collation_store = config.collation_store();
    let collations_outcome = collation_store.ensure()?;

    let sample_config = ToolConfig::write_sample_config_to(dir)?;
    info!(path = %sample_config.display(), "Wrote sample configuration");

    Ok(InitResult {
        type_mappings: (type_store.path().to_path_buf(), types_outcome),
        collations: (collation_store.path().to_path_buf(), collations_outcome),
        sample_config,
    })
}

#[cfg(feature = "cli")]
fn outcome_label(outcome: EnsureOutcome) -> String {
    match outcome {
        EnsureOutcome::Created => "created".green().to_string(),
        EnsureOutcome::Repaired => "repaired".yellow().to_string(),
        EnsureOutcome::Unchanged => "unchanged".dimmed().to_string(),
    }
}

#[cfg(feature = "cli")]
pub fn print_init_summary(result: &InitResult) {
    println!("\n{}", "=== tsql2pg Init ===".bold().blue());

    for (path, outcome) in [&result.type_mappings, &result.collations] {
        println!(
            "  {} {} ({})",
            "✓".green().bold(),
            path.display().cyan(),
            outcome_label(*outcome)
        );
    }
    println!(
        "  {} {}",
        "✓".green().bold(),
        result.sample_config.display().cyan()
    );

    println!(
        "\nCopy {} to {} to customise the conversion.",
        result.sample_config.display().yellow(),
        crate::config::CONFIG_FILE.yellow()
    );
}
