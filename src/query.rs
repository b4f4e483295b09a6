//! Generated diff, stats and missing-row queries over a materialized join table

use crate::condition::{diff_condition, index_all_null};
use crate::error::Result;
use crate::matcher::{find_column, resolve_index_columns, IndexColumn};
use crate::run::ComparisonRun;
use crate::sql::{limit_query, quote_ident, quote_literal, side_column, Side};

/// Output column carrying the name of the changed column
pub const COLUMN_FIELD: &str = "Column";
/// Output column carrying the previous value as text
pub const BEFORE_FIELD: &str = "Before";
/// Output column carrying the current value as text
pub const CURRENT_FIELD: &str = "Current";
/// Output column of the stats query holding the differing-row count
pub const DIFF_COUNT_FIELD: &str = "diff_count";

/// Builds every query the comparison needs from the join table layout
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    join_table: String,
    index: Vec<IndexColumn>,
    common_columns: Vec<String>,
}

impl QueryGenerator {
    pub fn new(join_table: impl Into<String>, index: Vec<IndexColumn>, common_columns: Vec<String>) -> Self {
        Self {
            join_table: join_table.into(),
            index,
            common_columns,
        }
    }

    /// Rebuild the generator from a persisted run, re-matching index columns on both sides
    pub fn from_run(run: &ComparisonRun) -> Result<Self> {
        let index = resolve_index_columns(
            &run.index_columns,
            &run.tables.previous,
            &run.columns_previous,
            &run.tables.new,
            &run.columns_new,
        )?;
        Ok(Self::new(run.tables.join.clone(), index, run.common_columns.clone()))
    }

    pub fn join_table(&self) -> &str {
        &self.join_table
    }

    pub fn index(&self) -> &[IndexColumn] {
        &self.index
    }

    pub fn common_columns(&self) -> &[String] {
        &self.common_columns
    }

    /// Name of the first index column, used to sort samples
    pub fn first_index_name(&self) -> Option<&str> {
        self.index.first().map(|idx| idx.name.as_str())
    }

    /// Case-insensitive lookup of a common column
    pub fn match_common_column(&self, column: &str) -> Option<&str> {
        find_column(column, &self.common_columns)
    }

    /// Predicate for a changed value in `column` on a matched row
    pub fn diff_condition(&self, column: &str) -> String {
        diff_condition(column, &self.index)
    }

    /// Coalesced key values, preferring the new side
    fn index_projection(&self) -> String {
        self.index
            .iter()
            .map(|idx| {
                format!(
                    "COALESCE({}, {}) AS {}",
                    side_column(&idx.new, Side::New),
                    side_column(&idx.previous, Side::Previous),
                    quote_ident(&idx.name)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Differences for a single, already matched, common column
    pub fn column_diff_query(&self, column: &str) -> String {
        format!(
            "SELECT {}, {} AS {}, CAST({} AS VARCHAR) AS {}, CAST({} AS VARCHAR) AS {} FROM {} WHERE {}",
            self.index_projection(),
            quote_literal(column),
            quote_ident(COLUMN_FIELD),
            side_column(column, Side::Previous),
            quote_ident(BEFORE_FIELD),
            side_column(column, Side::New),
            quote_ident(CURRENT_FIELD),
            self.join_table,
            self.diff_condition(column)
        )
    }

    /// Query with the diff output shape that never returns a row
    pub fn empty_diff_query(&self) -> String {
        let mut fields: Vec<String> = self
            .index
            .iter()
            .map(|idx| format!("CAST(NULL AS VARCHAR) AS {}", quote_ident(&idx.name)))
            .collect();
        for field in [COLUMN_FIELD, BEFORE_FIELD, CURRENT_FIELD] {
            fields.push(format!("CAST(NULL AS VARCHAR) AS {}", quote_ident(field)));
        }
        format!("SELECT {} WHERE 1 = 0", fields.join(", "))
    }

    /// Differences for one column (case-insensitive) or, without a column, for all of them
    pub fn diff_query(&self, column: Option<&str>, limit: Option<usize>) -> String {
        let query = match column {
            Some(column) => match self.match_common_column(column) {
                Some(matched) => self.column_diff_query(matched),
                None => self.empty_diff_query(),
            },
            None if self.common_columns.is_empty() => self.empty_diff_query(),
            None => self
                .common_columns
                .iter()
                .map(|c| self.column_diff_query(c))
                .collect::<Vec<_>>()
                .join(" UNION ALL "),
        };

        match limit {
            Some(limit) => limit_query(&query, limit),
            None => query,
        }
    }

    /// Differing-row count per column, highest first
    pub fn stats_query(&self, column: Option<&str>) -> String {
        let columns: Vec<&str> = match column {
            Some(column) => self.match_common_column(column).into_iter().collect(),
            None => self.common_columns.iter().map(String::as_str).collect(),
        };

        if columns.is_empty() {
            return format!(
                "SELECT CAST(NULL AS VARCHAR) AS {}, CAST(0 AS BIGINT) AS {} WHERE 1 = 0",
                quote_ident(COLUMN_FIELD),
                quote_ident(DIFF_COUNT_FIELD)
            );
        }

        let parts: Vec<String> = columns
            .iter()
            .map(|c| {
                format!(
                    "SELECT {} AS {}, COUNT(*) AS {} FROM {} WHERE {}",
                    quote_literal(c),
                    quote_ident(COLUMN_FIELD),
                    quote_ident(DIFF_COUNT_FIELD),
                    self.join_table,
                    self.diff_condition(c)
                )
            })
            .collect();

        format!(
            "SELECT {col}, {cnt} FROM ({parts}) AS stats ORDER BY {cnt} DESC, {col}",
            col = quote_ident(COLUMN_FIELD),
            cnt = quote_ident(DIFF_COUNT_FIELD),
            parts = parts.join(" UNION ALL ")
        )
    }

    /// Rows present in the previous dataset but missing from the current one
    pub fn missing_in_current_query(&self) -> String {
        format!(
            "SELECT * FROM {} WHERE {}",
            self.join_table,
            index_all_null(&self.index, Side::New)
        )
    }

    /// Rows present in the current dataset but missing from the previous one
    pub fn missing_in_previous_query(&self) -> String {
        format!(
            "SELECT * FROM {} WHERE {}",
            self.join_table,
            index_all_null(&self.index, Side::Previous)
        )
    }

    /// One side's columns of the unmatched rows, under their original names
    pub fn unmatched_side_query(&self, side: Side, columns: &[String], limit: usize) -> String {
        let missing_side = match side {
            Side::Previous => Side::New,
            Side::New => Side::Previous,
        };
        let projection = columns
            .iter()
            .map(|c| format!("{} AS {}", side_column(c, side), quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {} FROM {} WHERE {} LIMIT {}",
            projection,
            self.join_table,
            index_all_null(&self.index, missing_side),
            limit
        )
    }
}
