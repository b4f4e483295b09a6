//! Re-querying a persisted comparison run

use crate::backend::{Database, QueryResult};
use crate::comparator::{read_stats, summarize, CompareSummary};
use crate::error::{CompareError, Result};
use crate::output::{write_csv, JsonFormatter};
use crate::query::{QueryGenerator, COLUMN_FIELD};
use crate::run::ComparisonRun;
use crate::sql::{limit_query, sanitize_name};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of rows shown by `inspect`
pub const DEFAULT_LIMIT: usize = 25;

const SUMMARY_SAMPLE_ROWS: usize = 10;

/// Which view of a run to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectMode {
    Diffs,
    Stats,
    MissingCurrent,
    MissingPrevious,
    ListColumns,
}

/// What `--save` writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Rows,
    Summary,
}

impl SaveMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rows" => Ok(Self::Rows),
            "summary" => Ok(Self::Summary),
            _ => Err(CompareError::invalid_argument(format!(
                "Invalid save mode: {}. Use 'rows' or 'summary'",
                s
            ))),
        }
    }
}

/// JSON report written by `--save summary`
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub generated: DateTime<Utc>,
    pub run: ComparisonRun,
    pub summary: CompareSummary,
    pub sample_diffs: serde_json::Value,
}

/// Keep the rows whose `Column` field equals `column`, ignoring case
pub fn filter_by_column(mut result: QueryResult, column: &str) -> QueryResult {
    if let Some(idx) = result.column_index(COLUMN_FIELD) {
        let wanted = column.trim().to_lowercase();
        result
            .rows
            .retain(|row| row[idx].to_string().trim().to_lowercase() == wanted);
    }
    result
}

/// `analysis_<run>[_<column>]_<timestamp>.<ext>`
pub fn export_file_name(run_id: &str, column: Option<&str>, extension: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    match column {
        Some(column) => format!(
            "analysis_{}_{}_{}.{}",
            run_id,
            sanitize_name(column),
            timestamp,
            extension
        ),
        None => format!("analysis_{}_{}.{}", run_id, timestamp, extension),
    }
}

/// Read-only views over the join table of a persisted run
pub struct Inspector<'a> {
    db: &'a dyn Database,
    run: &'a ComparisonRun,
    generator: QueryGenerator,
}

impl<'a> Inspector<'a> {
    pub fn new(db: &'a dyn Database, run: &'a ComparisonRun) -> Result<Self> {
        Ok(Self {
            db,
            run,
            generator: QueryGenerator::from_run(run)?,
        })
    }

    pub fn generator(&self) -> &QueryGenerator {
        &self.generator
    }

    /// SQL behind a view
    pub fn query_for(&self, mode: InspectMode, column: Option<&str>, limit: Option<usize>) -> String {
        let sql = match mode {
            InspectMode::Diffs => return self.generator.diff_query(column, limit),
            InspectMode::Stats => self.generator.stats_query(column),
            InspectMode::ListColumns => self.generator.stats_query(None),
            InspectMode::MissingCurrent => self.generator.missing_in_current_query(),
            InspectMode::MissingPrevious => self.generator.missing_in_previous_query(),
        };
        match limit {
            Some(limit) if mode != InspectMode::ListColumns => limit_query(&sql, limit),
            _ => sql,
        }
    }

    /// Run a view against the backend
    pub fn fetch(&self, mode: InspectMode, column: Option<&str>, limit: Option<usize>) -> Result<QueryResult> {
        let mut result = self.db.query(&self.query_for(mode, column, limit))?;
        match mode {
            InspectMode::Diffs => {
                if let Some(column) = column {
                    result = filter_by_column(result, column);
                }
                if let Some(first) = self.generator.first_index_name() {
                    result.sort_by_column(first);
                }
            }
            InspectMode::MissingCurrent => {
                if let Some(idx) = self.generator.index().first() {
                    result.sort_by_column(&format!("{}_previous", idx.previous));
                }
            }
            InspectMode::MissingPrevious => {
                if let Some(idx) = self.generator.index().first() {
                    result.sort_by_column(&format!("{}_new", idx.new));
                }
            }
            InspectMode::Stats | InspectMode::ListColumns => {}
        }
        Ok(result)
    }

    /// Differing-row count per compared column
    pub fn column_counts(&self) -> Result<Vec<(String, i64)>> {
        let stats = read_stats(&self.fetch(InspectMode::ListColumns, None, None)?);
        Ok(stats.into_iter().map(|s| (s.column, s.diff_count)).collect())
    }

    pub fn summary(&self) -> Result<CompareSummary> {
        summarize(self.db, &self.generator)
    }

    pub fn summary_report(&self) -> Result<SummaryReport> {
        let sample = self.fetch(InspectMode::Diffs, None, Some(SUMMARY_SAMPLE_ROWS))?;
        Ok(SummaryReport {
            generated: Utc::now(),
            run: self.run.clone(),
            summary: self.summary()?,
            sample_diffs: JsonFormatter::result_to_json(&sample),
        })
    }

    /// Write the full, unlimited view as CSV into `dir`
    pub fn export_rows(&self, mode: InspectMode, column: Option<&str>, dir: &Path) -> Result<PathBuf> {
        let result = self.fetch(mode, column, None)?;
        let path = dir.join(export_file_name(&self.run.run_id, column, "csv"));
        write_csv(&path, &result)?;
        log::info!("Exported {} rows to {}", result.len(), path.display());
        Ok(path)
    }

    /// Write the JSON summary report into `dir`
    pub fn export_summary(&self, dir: &Path) -> Result<PathBuf> {
        let report = self.summary_report()?;
        fs::create_dir_all(dir)?;
        let path = dir.join(export_file_name(&self.run.run_id, None, "json"));
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        log::info!("Exported summary to {}", path.display());
        Ok(path)
    }
}
