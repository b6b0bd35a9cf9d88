use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(name = "tsql2pg")]
#[command(about = "Convert T-SQL migration scripts to PostgreSQL")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity level (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create the mapping resources and a sample configuration file
    Init,

    /// Convert every *.sql file in SOURCE into TARGET (TARGET is emptied first)
    Convert {
        /// Directory containing T-SQL scripts
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Output directory; existing contents are deleted
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Leave COLLATE clauses untouched
        #[arg(long)]
        skip_collations: bool,

        /// Print the batch result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Shorten column names that exceed the identifier limit and record them
    Shorten {
        /// Table the columns belong to, as schema.table
        #[arg(long)]
        table: String,

        /// Column names to shorten
        #[arg(value_name = "NAMES", required = true)]
        names: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_command_parsing() {
        let args = vec!["tsql2pg", "convert", "scripts", "out", "--skip-collations"];

        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Convert { source, target, skip_collations, json } => {
                assert_eq!(source, PathBuf::from("scripts"));
                assert_eq!(target, PathBuf::from("out"));
                assert!(skip_collations);
                assert!(!json);
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn test_convert_requires_both_directories() {
        assert!(Cli::try_parse_from(vec!["tsql2pg", "convert", "scripts"]).is_err());
    }

    #[test]
    fn test_shorten_command_parsing() {
        let args = vec!["tsql2pg", "shorten", "--table", "dbo.Orders", "a", "b"];

        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Shorten { table, names } => {
                assert_eq!(table, "dbo.Orders");
                assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
            }
            _ => panic!("Expected Shorten command"),
        }
        assert!(Cli::try_parse_from(vec!["tsql2pg", "shorten", "--table", "t"]).is_err());
    }

    #[test]
    fn test_verbosity_count() {
        let cli = Cli::try_parse_from(vec!["tsql2pg", "-vv", "init"]).unwrap();
        assert_eq!(cli.verbose, Some(2));
        assert!(matches!(cli.command, Commands::Init));
    }
}
