//! Comparison run metadata

use crate::sql::sanitize_name;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest name prefix kept in a run id; the id also names files on disk
pub const MAX_RUN_NAME_LEN: usize = 64;

/// Tables taking part in a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTables {
    pub previous: String,
    pub new: String,
    /// Fully qualified, quoted name of the materialized join table
    pub join: String,
}

/// One persisted compare invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRun {
    pub run_id: String,
    pub tables: RunTables,
    /// Index column names in the previous dataset's casing
    pub index_columns: Vec<String>,
    pub columns_previous: Vec<String>,
    pub columns_new: Vec<String>,
    pub common_columns: Vec<String>,
    /// How to reconnect to the backend holding the join table
    pub connection: String,
    pub created: DateTime<Utc>,
}

/// First 8 hex chars of a fresh v4 uuid
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Sanitized run name, cut to [`MAX_RUN_NAME_LEN`]
pub fn clean_run_name(name: &str) -> String {
    // sanitize_name only emits ASCII, so any byte offset is a char boundary
    let mut name = sanitize_name(name.trim());
    name.truncate(MAX_RUN_NAME_LEN);
    name
}

/// Build a run id: `<name>_<YYYYmmdd_HHMMSS>_<8 hex chars>`
pub fn generate_run_id(run_name: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let name = clean_run_name(run_name);
    if name.is_empty() {
        format!("{}_{}", timestamp, short_id())
    } else {
        format!("{}_{}_{}", name, timestamp, short_id())
    }
}

/// Default run name derived from the two table references
pub fn default_run_name(previous: &str, new: &str) -> String {
    clean_run_name(&format!("compare_{}_{}", previous, new))
}

/// Default run name for two data files, built from their file stems
pub fn file_run_name(previous: &Path, new: &Path) -> String {
    let stem = |path: &Path| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    default_run_name(&stem(previous), &stem(new))
}

/// Unquoted base name of the join table for a run
pub fn join_table_base(run_id: &str) -> String {
    format!("sqlcompare_{}_join", sanitize_name(run_id))
}
