//! Output formatting utilities

use crate::backend::{Cell, QueryResult};
use crate::error::Result;
use crate::run::ComparisonRun;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

const ELLIPSIS: &str = "…";

/// Limits applied when rendering a result as a text table
#[derive(Debug, Clone, Copy)]
pub struct TableLimits {
    pub max_rows: usize,
    pub max_cols: usize,
    pub max_cell_width: Option<usize>,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            max_rows: 20,
            max_cols: 12,
            max_cell_width: Some(60),
        }
    }
}

fn trim_cell(value: &str, max_width: Option<usize>) -> String {
    match max_width {
        Some(width) if value.chars().count() > width => {
            if width <= 1 {
                ELLIPSIS.to_string()
            } else {
                let kept: String = value.chars().take(width - 1).collect();
                format!("{}{}", kept, ELLIPSIS)
            }
        }
        _ => value.to_string(),
    }
}

/// Render a result as a bordered text table.
///
/// Too many columns keeps the left and right halves around an ellipsis column;
/// too many rows keeps head and tail around an ellipsis row.
pub fn format_table(result: &QueryResult, limits: TableLimits) -> String {
    if result.columns.is_empty() {
        return String::new();
    }

    let n_cols = result.columns.len();
    let keep: Vec<Option<usize>> = if n_cols > limits.max_cols && limits.max_cols >= 2 {
        let left = limits.max_cols / 2;
        let right = limits.max_cols - left;
        (0..left)
            .map(Some)
            .chain(std::iter::once(None))
            .chain((n_cols - right..n_cols).map(Some))
            .collect()
    } else {
        (0..n_cols.min(limits.max_cols.max(1))).map(Some).collect()
    };

    let header: Vec<String> = keep
        .iter()
        .map(|k| match k {
            Some(i) => result.columns[*i].clone(),
            None => ELLIPSIS.to_string(),
        })
        .collect();

    let render_row = |row: &[Cell]| -> Vec<String> {
        keep.iter()
            .map(|k| match k {
                Some(i) => trim_cell(&row[*i].to_string(), limits.max_cell_width),
                None => ELLIPSIS.to_string(),
            })
            .collect()
    };

    let n_rows = result.rows.len();
    let mut body: Vec<Vec<String>> = Vec::new();
    if n_rows > limits.max_rows && limits.max_rows >= 2 {
        let top = limits.max_rows / 2;
        let bottom = limits.max_rows - top;
        body.extend(result.rows[..top].iter().map(|r| render_row(r)));
        body.push(vec![ELLIPSIS.to_string(); header.len()]);
        body.extend(result.rows[n_rows - bottom..].iter().map(|r| render_row(r)));
    } else {
        body.extend(result.rows.iter().take(limits.max_rows).map(|r| render_row(r)));
    }

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let separator = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!(" {}{} ", c, " ".repeat(w - c.chars().count())))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut out = vec![separator.clone(), line(&header), separator.clone()];
    out.extend(body.iter().map(|row| line(row)));
    out.push(separator);
    out.join("\n")
}

/// Write a result as CSV, quoting values containing separators, quotes or newlines
pub fn write_csv(path: &Path, result: &QueryResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, csv_content(result))?;
    Ok(())
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV text for a result; NULL becomes an empty field
pub fn csv_content(result: &QueryResult) -> String {
    let mut content = String::new();
    let headers: Vec<String> = result.columns.iter().map(|c| csv_escape(c)).collect();
    content.push_str(&headers.join(","));
    content.push('\n');

    for row in &result.rows {
        let values: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Cell::Null => String::new(),
                other => csv_escape(&other.to_string()),
            })
            .collect();
        content.push_str(&values.join(","));
        content.push('\n');
    }

    content
}

/// JSON rendering of query results and runs
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn cell_to_json(cell: &Cell) -> Value {
        match cell {
            Cell::Null => Value::Null,
            Cell::Bool(b) => json!(b),
            Cell::Int(i) => json!(i),
            Cell::Float(f) => json!(f),
            Cell::Text(s) => json!(s),
        }
    }

    /// Rows as an array of objects keyed by column name
    pub fn result_to_json(result: &QueryResult) -> Value {
        let rows: Vec<Value> = result
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (column, cell) in result.columns.iter().zip(row) {
                    object.insert(column.clone(), Self::cell_to_json(cell));
                }
                Value::Object(object)
            })
            .collect();
        Value::Array(rows)
    }

    pub fn format_result(result: &QueryResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(&Self::result_to_json(result))?)
    }

    pub fn format_runs(runs: &[ComparisonRun]) -> Result<String> {
        Ok(serde_json::to_string_pretty(runs)?)
    }
}

/// Pretty printer for sqlcompare output
pub struct PrettyPrinter;

impl PrettyPrinter {
    pub fn print_table(result: &QueryResult) {
        println!("{}", format_table(result, TableLimits::default()));
    }

    /// Print the stored runs, newest first
    pub fn print_run_list(runs: &[ComparisonRun]) {
        if runs.is_empty() {
            println!("📭 No comparison runs found.");
            return;
        }

        println!("📊 Found {} comparison runs:", runs.len());
        for (i, run) in runs.iter().enumerate() {
            let prefix = if i == runs.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {}  {} → {}  ({}, {})",
                prefix,
                run.run_id,
                run.tables.previous,
                run.tables.new,
                run.connection,
                run.created.format("%Y-%m-%d %H:%M")
            );
        }
    }

    /// Print run metadata
    pub fn print_run(run: &ComparisonRun) {
        println!("🔎 Run: {}", run.run_id);
        println!("├─ Created: {}", run.created.format("%Y-%m-%d %H:%M:%S"));
        println!("├─ Previous: {}", run.tables.previous);
        println!("├─ Current: {}", run.tables.new);
        println!("├─ Join table: {}", run.tables.join);
        println!("├─ Index: {}", run.index_columns.join(", "));
        println!("├─ Compared columns: {}", run.common_columns.len());
        println!("└─ Connection: {}", run.connection);
    }

    /// Print the follow-up hints after a successful compare
    pub fn print_compare_hints(run_id: &str) {
        println!("✅ Comparison saved with ID: {}", run_id);
        println!("🔎 To review the diff, run: sqlcompare inspect {}", run_id);
        println!(
            "💾 To export a summary report, run: sqlcompare inspect {} --save summary",
            run_id
        );
        println!(
            "💡 Tips: --stats for per-column counts, --missing-current/--missing-previous for row-only, \
             --column <name> to filter, --list-columns to inspect available fields."
        );
    }

    /// Print candidates for an ambiguous run reference
    pub fn print_ambiguous(query: &str, ids: &[String]) {
        println!("⚠️  Multiple runs match '{}':", query);
        for id in ids {
            println!("   {}", id);
        }
        println!("💡 Please use a more specific ID");
    }
}
