//! Compare lifecycle: validate, join, summarize, persist

use crate::backend::{Database, QueryResult};
use crate::error::{CompareError, Result};
use crate::join::JoinMaterializer;
use crate::matcher::{common_columns, filter_columns, resolve_index_columns};
use crate::output::{format_table, TableLimits};
use crate::progress::ProgressReporter;
use crate::query::{QueryGenerator, COLUMN_FIELD, DIFF_COUNT_FIELD};
use crate::run::{default_run_name, generate_run_id, ComparisonRun, RunTables};
use crate::sql::{count_query, quote_ident, quote_qualified, sanitize_name, Side};
use crate::store::RunStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Schema holding join tables when nothing else is configured
pub const DEFAULT_SCHEMA: &str = "sqlcompare";

const MISSING_SAMPLE_ROWS: usize = 5;
const DIFF_SAMPLE_ROWS: usize = 10;

/// Options for one compare invocation
#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub index_columns: Vec<String>,
    pub run_name: Option<String>,
    pub schema: String,
    pub include_columns: Option<Vec<String>>,
    pub ignore_columns: Option<Vec<String>>,
}

impl CompareOptions {
    pub fn new(index_columns: Vec<String>) -> Self {
        Self {
            index_columns,
            run_name: None,
            schema: DEFAULT_SCHEMA.to_string(),
            include_columns: None,
            ignore_columns: None,
        }
    }

    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = Some(run_name.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_include_columns(mut self, columns: Vec<String>) -> Self {
        self.include_columns = Some(columns);
        self
    }

    pub fn with_ignore_columns(mut self, columns: Vec<String>) -> Self {
        self.ignore_columns = Some(columns);
        self
    }
}

/// Split a comma-separated column list, dropping blanks
pub fn parse_column_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Differing-row count for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub column: String,
    pub diff_count: i64,
}

/// Aggregate view of a finished comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSummary {
    pub missing_in_current: i64,
    pub missing_in_previous: i64,
    pub diff_total: i64,
    pub stats: Vec<StatEntry>,
}

impl CompareSummary {
    pub fn columns_with_diffs(&self) -> impl Iterator<Item = &StatEntry> {
        self.stats.iter().filter(|s| s.diff_count > 0)
    }

    pub fn columns_without_diffs(&self) -> impl Iterator<Item = &StatEntry> {
        self.stats.iter().filter(|s| s.diff_count == 0)
    }
}

/// Result of a successful compare
#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub run: ComparisonRun,
    pub summary: CompareSummary,
}

impl CompareOutcome {
    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }
}

/// Runs comparisons against one backend and records them in a store
pub struct Comparator<'a> {
    db: &'a dyn Database,
    store: &'a dyn RunStore,
    show_progress: bool,
}

impl<'a> Comparator<'a> {
    pub fn new(db: &'a dyn Database, store: &'a dyn RunStore) -> Self {
        Self {
            db,
            store,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Compare two tables reachable through the backend
    pub fn compare(&self, previous: &str, new: &str, options: &CompareOptions) -> Result<CompareOutcome> {
        let index_columns = validate_index(options)?;
        let run_name = options
            .run_name
            .clone()
            .unwrap_or_else(|| default_run_name(previous, new));
        let run_id = generate_run_id(&run_name);
        self.run_compare(run_id, previous, new, &index_columns, options)
    }

    /// Materialize two SELECT statements as tables, then compare them
    pub fn compare_queries(
        &self,
        previous_sql: &str,
        new_sql: &str,
        options: &CompareOptions,
    ) -> Result<CompareOutcome> {
        let index_columns = validate_index(options)?;
        let run_name = options
            .run_name
            .clone()
            .unwrap_or_else(|| "query".to_string());
        let run_id = generate_run_id(&run_name);

        let materializer = JoinMaterializer::new(self.db);
        materializer.ensure_schema(&options.schema);

        let previous = self.materialize_query(&options.schema, &format!("tmp_prev_{}", run_id), previous_sql)?;
        let new = self.materialize_query(&options.schema, &format!("tmp_new_{}", run_id), new_sql)?;

        self.run_compare(run_id, &previous, &new, &index_columns, options)
    }

    fn materialize_query(&self, schema: &str, name: &str, sql: &str) -> Result<String> {
        let table = format!("{}.{}", schema, sanitize_name(name));
        let quoted = format!("{}.{}", quote_qualified(schema), quote_ident(&sanitize_name(name)));
        self.db.execute(&format!("DROP TABLE IF EXISTS {}", quoted))?;
        self.db.execute(&format!(
            "CREATE TABLE {} AS {}",
            quoted,
            sql.trim().trim_end_matches(';')
        ))?;
        log::debug!("Materialized query as {}", table);
        Ok(table)
    }

    fn run_compare(
        &self,
        run_id: String,
        previous: &str,
        new: &str,
        index_columns: &[String],
        options: &CompareOptions,
    ) -> Result<CompareOutcome> {
        let mut progress = ProgressReporter::new(self.show_progress);
        let materializer = JoinMaterializer::new(self.db);

        log::info!("Comparing {} → {} (run {})", previous, new, run_id);
        progress.step("Preparing schema...");
        materializer.ensure_schema(&options.schema);

        progress.step("Reading columns...");
        let columns_previous = materializer.introspect(previous)?;
        let columns_new = materializer.introspect(new)?;

        let index = resolve_index_columns(index_columns, previous, &columns_previous, new, &columns_new)?;
        let common = filter_columns(
            common_columns(&columns_previous, &columns_new, &index),
            options.include_columns.as_deref(),
            options.ignore_columns.as_deref(),
        )?;
        log::debug!("Comparing {} common columns: {}", common.len(), common.join(", "));

        progress.step("Joining tables...");
        let join_table = materializer.join_table_name(&options.schema, &run_id);
        materializer.materialize(&join_table, previous, new, &columns_previous, &columns_new, &index)?;

        let run = ComparisonRun {
            run_id,
            tables: RunTables {
                previous: previous.to_string(),
                new: new.to_string(),
                join: join_table,
            },
            index_columns: index.iter().map(|idx| idx.name.clone()).collect(),
            columns_previous,
            columns_new,
            common_columns: common,
            connection: self.db.identifier().to_string(),
            created: Utc::now(),
        };

        progress.step("Summarizing differences...");
        let generator = QueryGenerator::new(run.tables.join.clone(), index, run.common_columns.clone());
        let summary = summarize(self.db, &generator)?;
        progress.finish();

        self.log_summary(&run, &generator, &summary);

        self.store.put(&run)?;
        log::info!("Saved comparison run {}", run.run_id);

        Ok(CompareOutcome { run, summary })
    }

    fn log_summary(&self, run: &ComparisonRun, generator: &QueryGenerator, summary: &CompareSummary) {
        log::info!(
            "Rows only in previous ({}): {}",
            run.tables.previous,
            summary.missing_in_current
        );
        if summary.missing_in_current > 0 {
            self.log_sample(
                "Sample rows missing in current",
                &generator.unmatched_side_query(Side::Previous, &run.columns_previous, MISSING_SAMPLE_ROWS),
                generator,
            );
        }

        log::info!("Rows only in current ({}): {}", run.tables.new, summary.missing_in_previous);
        if summary.missing_in_previous > 0 {
            self.log_sample(
                "Sample rows missing in previous",
                &generator.unmatched_side_query(Side::New, &run.columns_new, MISSING_SAMPLE_ROWS),
                generator,
            );
        }

        log::info!("Total differences: {}", summary.diff_total);
        if !summary.stats.is_empty() {
            let changed: Vec<String> = summary
                .columns_with_diffs()
                .map(|s| format!("{}: {}", s.column, s.diff_count))
                .collect();
            if changed.is_empty() {
                log::info!("No column has differences");
            } else {
                log::info!("Columns with differences: {}", changed.join(", "));
            }

            let unchanged: Vec<&str> = summary.columns_without_diffs().map(|s| s.column.as_str()).collect();
            if !unchanged.is_empty() {
                log::info!("Columns without differences: {}", unchanged.join(", "));
            }
        }

        if summary.diff_total > 0 {
            self.log_sample(
                "Sample differences",
                &generator.diff_query(None, Some(DIFF_SAMPLE_ROWS)),
                generator,
            );
        }
    }

    /// Best effort: a failing sample query is logged and skipped
    fn log_sample(&self, title: &str, sql: &str, generator: &QueryGenerator) {
        match self.db.query(sql) {
            Ok(mut sample) => {
                if let Some(first) = generator.first_index_name() {
                    sample.sort_by_column(first);
                }
                log::info!("{}:\n{}", title, format_table(&sample, TableLimits::default()));
            }
            Err(e) => log::warn!("Could not fetch {}: {}", title.to_lowercase(), e),
        }
    }
}

fn validate_index(options: &CompareOptions) -> Result<Vec<String>> {
    let index: Vec<String> = options
        .index_columns
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if index.is_empty() {
        return Err(CompareError::invalid_argument("At least one index column is required"));
    }
    Ok(index)
}

fn count(db: &dyn Database, sql: &str) -> Result<i64> {
    let count_sql = count_query(sql);
    db.query(&count_sql)?
        .scalar_i64()
        .ok_or_else(|| CompareError::backend(count_sql, "count query returned no value"))
}

/// Per-column stats rows read back from a stats query
pub fn read_stats(result: &QueryResult) -> Vec<StatEntry> {
    let (Some(col), Some(cnt)) = (
        result.column_index(COLUMN_FIELD),
        result.column_index(DIFF_COUNT_FIELD),
    ) else {
        return Vec::new();
    };
    result
        .rows
        .iter()
        .map(|row| StatEntry {
            column: row[col].to_string(),
            diff_count: row[cnt].as_i64().unwrap_or(0),
        })
        .collect()
}

/// Missing counts, diff total and per-column stats for a join table
pub fn summarize(db: &dyn Database, generator: &QueryGenerator) -> Result<CompareSummary> {
    let missing_in_current = count(db, &generator.missing_in_current_query())?;
    let missing_in_previous = count(db, &generator.missing_in_previous_query())?;
    let diff_total = count(db, &generator.diff_query(None, None))?;
    let stats = if generator.common_columns().is_empty() {
        Vec::new()
    } else {
        read_stats(&db.query(&generator.stats_query(None))?)
    };

    Ok(CompareSummary {
        missing_in_current,
        missing_in_previous,
        diff_total,
        stats,
    })
}
