use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tsql2pg
#[derive(Error, Debug)]
pub enum ConvertError {
    // File System Errors
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Refusing to clear {target}: it contains or equals the source directory {source_dir}")]
    UnsafeTarget {
        target: PathBuf,
        source_dir: PathBuf,
    },

    #[error("Failed to read {path}: {message}")]
    FileRead {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {message}")]
    FileWrite {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoad {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to parse {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),

    // Identifier Errors
    #[error("Column {second} in {table} shortens to {short}, which is already used by {first}")]
    IdentifierCollision {
        table: String,
        short: String,
        first: String,
        second: String,
    },
}

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => ConvertError::FileRead {
                path: PathBuf::from("unknown"),
                message,
                source: err,
            },
            _ => ConvertError::FileWrite {
                path: PathBuf::from("unknown"),
                message,
                source: err,
            },
        }
    }
}

/// Result type alias for tsql2pg operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context about which file caused the error
    fn file_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ConvertError>,
{
    fn file_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            let mut err = e.into();
            match &mut err {
                ConvertError::FileRead { path: p, .. } => *p = path.into(),
                ConvertError::FileWrite { path: p, .. } => *p = path.into(),
                ConvertError::ConfigLoad { path: p, .. } => *p = path.into(),
                ConvertError::ConfigParse { path: p, .. } => *p = path.into(),
                _ => {}
            }
            err
        })
    }
}

/// Helper function to format error with all its causes
pub fn format_error_chain(err: &ConvertError) -> String {
    use std::error::Error;

    let mut output = format!("Error: {}", err);

    let mut current_err: &dyn Error = err;
    while let Some(source) = current_err.source() {
        output.push_str(&format!("\n  Caused by: {}", source));
        current_err = source;
    }

    output
}

/// Helper function to suggest fixes for common errors
pub fn suggest_fix(err: &ConvertError) -> Option<String> {
    match err {
        ConvertError::DirectoryNotFound(path) => Some(format!(
            "Directory not found: {}\n\
             - Check if the path is correct\n\
             - Ensure you're running tsql2pg from the right directory",
            path.display()
        )),
        ConvertError::UnsafeTarget { .. } => Some(
            "The target directory is emptied before every run.\n\
             - Choose a target directory outside the source tree"
                .to_string(),
        ),
        ConvertError::ConfigParse { path, .. } => Some(format!(
            "Could not parse {}\n\
             - Run 'tsql2pg init' to regenerate the default resources\n\
             - Or fix the syntax by hand",
            path.display()
        )),
        ConvertError::IdentifierCollision { table, .. } => Some(format!(
            "Two long column names in {} shorten to the same identifier.\n\
             - Rename one of the columns on the source side\n\
             - Or raise the identifier limit if the destination allows it",
            table
        )),
        _ => None,
    }
}
