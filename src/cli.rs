//! Command-line interface for sqlcompare

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlcompare")]
#[command(about = "Compare two SQL tables, queries or data files and inspect the differences")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override workspace location
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize sqlcompare workspace
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,

        /// Default schema for join tables
        #[arg(long)]
        schema: Option<String>,

        /// Default connection identifier
        #[arg(long)]
        connection: Option<String>,
    },

    /// Compare two tables (or two data files)
    Table {
        /// Previous table name or file path
        previous: String,

        /// Current table name or file path
        current: String,

        /// Comma-separated index columns used to match rows
        #[arg(short, long)]
        index: String,

        /// Connection identifier, e.g. duckdb:///data/warehouse.duckdb
        #[arg(short, long)]
        connection: Option<String>,

        /// Schema holding the join table
        #[arg(long)]
        schema: Option<String>,

        /// Human-readable prefix for the run id
        #[arg(long)]
        name: Option<String>,

        /// Comma-separated columns to compare (all common columns by default)
        #[arg(long)]
        include: Option<String>,

        /// Comma-separated columns to leave out of the comparison
        #[arg(long)]
        ignore: Option<String>,
    },

    /// Compare the results of two SELECT statements
    Query {
        /// Previous SELECT statement
        previous: String,

        /// Current SELECT statement
        current: String,

        /// Comma-separated index columns used to match rows
        #[arg(short, long)]
        index: String,

        /// Connection identifier
        #[arg(short, long)]
        connection: Option<String>,

        /// Schema holding the materialized queries and the join table
        #[arg(long)]
        schema: Option<String>,

        /// Human-readable prefix for the run id
        #[arg(long)]
        name: Option<String>,
    },

    /// Compare the two datasets defined in a YAML file
    Dataset {
        /// Dataset file with `previous` and `new` sections
        path: PathBuf,

        /// Connection identifier (optional when both sides are files)
        #[arg(short, long)]
        connection: Option<String>,

        /// Schema holding the dataset tables and the join table
        #[arg(long)]
        schema: Option<String>,

        /// Human-readable prefix for the run id
        #[arg(long)]
        name: Option<String>,
    },

    /// Inspect the differences of a saved run
    Inspect {
        /// Run id or a unique part of it
        run: String,

        /// Only show differences in this column
        #[arg(long)]
        column: Option<String>,

        /// Maximum number of rows to show
        #[arg(long, default_value_t = crate::inspect::DEFAULT_LIMIT)]
        limit: usize,

        /// Show per-column difference counts
        #[arg(long)]
        stats: bool,

        /// Show rows missing from the current dataset
        #[arg(long, conflicts_with_all = ["stats", "missing_previous", "list_columns"])]
        missing_current: bool,

        /// Show rows missing from the previous dataset
        #[arg(long, conflicts_with_all = ["stats", "list_columns"])]
        missing_previous: bool,

        /// List compared columns with their difference counts
        #[arg(long, conflicts_with = "stats")]
        list_columns: bool,

        /// Export instead of displaying: "rows" or "summary"
        #[arg(long)]
        save: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// List saved comparison runs
    List {
        /// Only runs whose id contains this text
        pattern: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}
