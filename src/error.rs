//! Error types for sqlcompare operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompareError>;

/// Maximum number of available column names listed in a `ColumnNotFound` message
pub const MAX_LISTED_COLUMNS: usize = 10;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Column '{column}' not found in {table}. Available columns: {}", format_available(.available))]
    ColumnNotFound {
        column: String,
        table: String,
        available: Vec<String>,
    },

    #[error("Could not create schema '{schema}': {message}")]
    SchemaCreation { schema: String, message: String },

    #[error("Query failed: {message} (SQL: {sql})")]
    BackendQuery { sql: String, message: String },

    #[error("Run not found: {query}")]
    RunNotFound { query: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl CompareError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    pub fn column_not_found(
        column: impl Into<String>,
        table: impl Into<String>,
        available: &[String],
    ) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
            table: table.into(),
            available: available.to_vec(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a backend failure, keeping the statement that caused it
    pub fn backend(sql: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::BackendQuery {
            sql: sql.into(),
            message: err.to_string(),
        }
    }

    pub fn run_not_found(query: impl Into<String>) -> Self {
        Self::RunNotFound {
            query: query.into(),
        }
    }
}

fn format_available(available: &[String]) -> String {
    let shown: Vec<&str> = available
        .iter()
        .take(MAX_LISTED_COLUMNS)
        .map(String::as_str)
        .collect();
    if available.len() > MAX_LISTED_COLUMNS {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}
