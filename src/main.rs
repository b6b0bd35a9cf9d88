use tracing::{debug, info};
use tsql2pg::{
    cli::{Cli, Commands},
    commands::{
        execute_convert, execute_init, execute_shorten, print_convert_summary, print_init_summary,
        print_shorten_summary,
    },
    config::ToolConfig,
    error::{format_error_chain, suggest_fix, Result},
    logging,
    output::CliOutputHandler,
};

fn main() -> color_eyre::Result<()> {
    let cli = Cli::parse_args();

    // 0 = warn, 1 = info, 2 = debug, 3+ = trace
    let verbosity = cli.verbose.unwrap_or(0);
    logging::init(verbosity).map_err(|e| color_eyre::eyre::eyre!(e))?;

    info!("Starting tsql2pg v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", cli.command);

    match run(cli) {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tsql2pg::log_error!(e);
            logging::output::error(format_error_chain(&e));
            if let Some(suggestion) = suggest_fix(&e) {
                logging::output::warning(suggestion);
            }
            std::process::exit(1);
        }
    }
}

/// Returns whether the command fully succeeded
fn run(cli: Cli) -> Result<bool> {
    let config_file = ToolConfig::load_from_file()?;
    if config_file.is_some() {
        info!("Loaded configuration from {}", tsql2pg::config::CONFIG_FILE);
    }

    match cli.command {
        Commands::Init => {
            logging::output::step("Creating mapping resources...");
            let config = ToolConfig::merge_with_cli(config_file, false);
            let result = execute_init(&config, std::path::Path::new("."))?;
            print_init_summary(&result);
            Ok(true)
        }

        Commands::Convert { source, target, skip_collations, json } => {
            let config = ToolConfig::merge_with_cli(config_file, skip_collations);
            if !json {
                logging::output::header(format!(
                    "Converting {} -> {}",
                    source.display(),
                    target.display()
                ));
            }

            let result = if json {
                execute_convert(&source, &target, &config, &tsql2pg::output::SilentOutputHandler)?
            } else {
                execute_convert(&source, &target, &config, &CliOutputHandler)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_convert_summary(&result);
            }
            Ok(result.batch.is_success())
        }

        Commands::Shorten { table, names } => {
            let config = ToolConfig::merge_with_cli(config_file, false);
            let result = execute_shorten(&table, &names, &config)?;
            print_shorten_summary(&result);
            Ok(true)
        }
    }
}
