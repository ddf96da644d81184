use thiserror::Error;

pub type PrepResult<T> = Result<T, PrepError>;

/// Errors raised while preparing forcing and gage inputs. Schema, format
/// and discovery failures are fatal to the operation that hit them; the
/// recoverable anomalies live in `diagnostics` instead.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("table '{table}' is missing required column '{column}'")]
    Schema { table: String, column: String },

    #[error("filename '{name}' does not match the cat-<id> pattern")]
    FilenameFormat { name: String },

    #[error("flowpath id '{id}': expected '<prefix>-<number>'")]
    IdFormat { id: String },

    #[error("no files match pattern '{pattern}'")]
    EmptyInput { pattern: String },

    #[error("invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("bad value in '{file}' at line {line}: {message}")]
    BadRecord {
        file: String,
        line: usize,
        message: String,
    },

    #[error("worker pool: {0}")]
    Pool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("settings file: {0}")]
    Config(#[from] toml::de::Error),
}
