//! Converts SQL Server (T-SQL) migration scripts into PostgreSQL scripts.
//!
//! The heart of the crate is [`Converter`], an ordered pipeline of textual
//! rewrite passes. [`batch::convert_directory`] applies it to a directory of
//! scripts, [`shorten`] keeps column names within PostgreSQL's identifier limit,
//! and [`ddl`] renders `CREATE TABLE` statements from catalog metadata.
//!
//! ```no_run
//! use tsql2pg::Converter;
//!
//! let converter = Converter::with_defaults()?;
//! let result = converter.convert("CREATE TABLE [dbo].[t] ([id] INT IDENTITY(1,1))\nGO\n");
//! println!("{}", result.sql());
//! # Ok::<(), tsql2pg::ConvertError>(())
//! ```

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod ddl;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod output;
pub mod shorten;

pub use batch::{convert_directory, BatchResult, FailedFile, FileReport};
pub use config::ToolConfig;
pub use convert::{
    ConversionLog, ConversionResult, Converter, ConverterOptions, IdentityMode, Pass,
};
pub use ddl::{SourceColumn, TableRenderer};
pub use error::{ConvertError, Result};
pub use mapping::{
    CollationMapping, CollationMappingStore, EnsureOutcome, TypeMapping, TypeMappingStore,
};
pub use shorten::{shorten, ColumnMapping};
