//! # sqlcompare
//!
//! Compares two relational datasets (tables, query results, data files or YAML
//! dataset definitions) by
//! materializing a full outer join in the backend and deriving row-level and
//! column-level differences from generated SQL. Runs are persisted so they can
//! be inspected later.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod comparator;
pub mod condition;
pub mod data;
pub mod dataset;
pub mod error;
pub mod inspect;
pub mod join;
pub mod matcher;
pub mod output;
pub mod progress;
pub mod query;
pub mod resolver;
pub mod run;
pub mod sql;
pub mod store;
pub mod workspace;

pub use backend::{with_connection, Database, DuckDbBackend};
pub use comparator::{CompareOptions, CompareOutcome, CompareSummary, Comparator, StatEntry};
pub use dataset::Dataset;
pub use error::{CompareError, Result};
pub use query::QueryGenerator;
pub use resolver::{RunLookup, RunResolver};
pub use run::ComparisonRun;
pub use store::{FileRunStore, MemoryRunStore, RunStore};
pub use workspace::CompareWorkspace;

/// Current format version of the workspace config file
pub const FORMAT_VERSION: u32 = 1;
