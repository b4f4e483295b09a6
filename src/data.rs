//! Loading data files into backend tables

use crate::backend::{Cell, Database, QueryResult};
use crate::error::{CompareError, Result};
use crate::output::csv_content;
use crate::run::short_id;
use crate::sql::{
    is_sql_file, parse_sql_file, quote_literal, quote_qualified, sanitize_name, substitute_env_vars,
};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::fs;
use std::path::{Path, PathBuf};

/// A file loaded into a table
#[derive(Debug, Clone)]
pub struct DataInfo {
    pub source: PathBuf,
    pub table: String,
    pub row_count: u64,
    pub columns: Vec<String>,
}

impl DataInfo {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Loads csv/tsv/parquet/json/jsonl, spreadsheet and `.sql` files into tables of a backend
pub struct DataLoader<'a> {
    db: &'a dyn Database,
}

impl<'a> DataLoader<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Check if file format is supported
    pub fn is_supported_format(file_path: &Path) -> bool {
        if is_sql_file(file_path) || is_spreadsheet(file_path) {
            return true;
        }
        reader_for(file_path, "").is_some()
    }

    /// Load a file into `table` (optionally schema-qualified), replacing any table of that name
    pub fn load_file(&self, file_path: &Path, table: &str) -> Result<DataInfo> {
        if !file_path.is_file() {
            return Err(CompareError::invalid_argument(format!(
                "File not found: {}",
                file_path.display()
            )));
        }

        if is_spreadsheet(file_path) {
            let csv_path = spreadsheet_to_csv(file_path)?;
            let loaded = self.create_table(file_path, table, &reader_sql("read_csv_auto", &csv_path, ""));
            if let Err(e) = fs::remove_file(&csv_path) {
                log::debug!("Could not remove {}: {}", csv_path.display(), e);
            }
            loaded?;
        } else if is_sql_file(file_path) {
            let source = self.prepare_sql_file(file_path)?;
            self.create_table(file_path, table, &source)?;
        } else {
            let path_literal = quote_literal(&file_path.to_string_lossy());
            let source = reader_for(file_path, &path_literal).ok_or_else(|| {
                CompareError::invalid_argument(format!(
                    "Unsupported file format: {}",
                    file_path.display()
                ))
            })?;
            self.create_table(file_path, table, &source)?;
        }

        let row_count = self
            .db
            .query(&format!("SELECT COUNT(*) FROM {}", quote_qualified(table)))?
            .scalar_i64()
            .unwrap_or(0) as u64;
        let columns = self
            .db
            .query(&format!("SELECT * FROM {} WHERE 1 = 0", quote_qualified(table)))?
            .columns;

        log::info!(
            "Loaded {} ({} rows, {} columns) into {}",
            file_path.display(),
            row_count,
            columns.len(),
            table
        );

        Ok(DataInfo {
            source: file_path.to_path_buf(),
            table: table.to_string(),
            row_count,
            columns,
        })
    }

    fn create_table(&self, file_path: &Path, table: &str, source: &str) -> Result<()> {
        let create_sql = format!(
            "CREATE OR REPLACE TABLE {} AS {}",
            quote_qualified(table),
            source
        );
        self.db
            .execute(&create_sql)
            .map(|_| ())
            .map_err(|e| convert_load_error(e, file_path))
    }

    /// Run a `.sql` file's ATTACH header and setup statements, returning its SELECT
    fn prepare_sql_file(&self, file_path: &Path) -> Result<String> {
        let sql_file = parse_sql_file(file_path)?;

        if let Some(attach) = &sql_file.attach {
            let attach = substitute_env_vars(attach)?;
            log::debug!("Attaching database for {}", file_path.display());
            self.db.execute(&attach)?;
        }

        for statement in &sql_file.setup {
            self.db.execute(statement)?;
        }

        Ok(sql_file.query)
    }
}

/// Table name for a loaded file, e.g. `prev_orders_csv_1a2b3c4d`
pub fn table_name_for(file_path: &Path, prefix: &str, tag: &str) -> String {
    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    format!("{}_{}_{}", prefix, sanitize_name(&name), sanitize_name(tag))
}

fn reader_sql(function: &str, path: &Path, extra: &str) -> String {
    format!(
        "SELECT * FROM {}({}{})",
        function,
        quote_literal(&path.to_string_lossy()),
        extra
    )
}

fn is_spreadsheet(file_path: &Path) -> bool {
    file_path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "xlsx" | "xlsm" | "xls"))
        .unwrap_or(false)
}

/// Write the first worksheet of a spreadsheet to a temporary CSV file
fn spreadsheet_to_csv(file_path: &Path) -> Result<PathBuf> {
    let mut workbook = open_workbook_auto(file_path).map_err(|e| unreadable(file_path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| unreadable(file_path, "no worksheets"))?
        .map_err(|e| unreadable(file_path, e))?;

    let csv_path = std::env::temp_dir().join(format!("sqlcompare_sheet_{}.csv", short_id()));
    fs::write(&csv_path, csv_content(&sheet_to_result(&range)))?;
    Ok(csv_path)
}

fn unreadable(file_path: &Path, err: impl std::fmt::Display) -> CompareError {
    CompareError::invalid_argument(format!(
        "Could not read spreadsheet '{}': {}",
        file_path.display(),
        err
    ))
}

/// First row becomes the header; blank header cells are named by position
fn sheet_to_result(range: &Range<Data>) -> QueryResult {
    let mut rows = range.rows();
    let columns = rows
        .next()
        .map(|header| {
            header
                .iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    Data::Empty => format!("column_{}", i + 1),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = rows
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => Cell::Null,
                    Data::Int(i) => Cell::Int(*i),
                    Data::Float(f) => Cell::Float(*f),
                    Data::Bool(b) => Cell::Bool(*b),
                    Data::String(s) => Cell::Text(s.clone()),
                    other => Cell::Text(other.to_string()),
                })
                .collect()
        })
        .collect();

    QueryResult { columns, rows }
}

fn reader_for(file_path: &Path, path_literal: &str) -> Option<String> {
    let extension = file_path.extension()?.to_str()?.to_lowercase();
    let reader = match extension.as_str() {
        "csv" => format!("SELECT * FROM read_csv_auto({})", path_literal),
        "tsv" => format!("SELECT * FROM read_csv_auto({}, delim = '\\t')", path_literal),
        "parquet" => format!("SELECT * FROM read_parquet({})", path_literal),
        "json" => format!("SELECT * FROM read_json_auto({})", path_literal),
        "jsonl" | "ndjson" => format!(
            "SELECT * FROM read_json_auto({}, format = 'newline_delimited')",
            path_literal
        ),
        _ => return None,
    };
    Some(reader)
}

/// Turn common reader failures into readable argument errors
fn convert_load_error(error: CompareError, file_path: &Path) -> CompareError {
    let message = match &error {
        CompareError::BackendQuery { message, .. } => message.clone(),
        _ => return error,
    };

    if message.contains("CSV Error")
        || message.contains("Could not convert")
        || message.contains("Invalid CSV")
        || message.contains("Unterminated quoted field")
    {
        CompareError::invalid_argument(format!(
            "Malformed CSV file '{}': {}",
            file_path.display(),
            message
        ))
    } else if message.contains("JSON") {
        CompareError::invalid_argument(format!(
            "Malformed JSON file '{}': {}",
            file_path.display(),
            message
        ))
    } else if message.contains("Permission denied") {
        CompareError::invalid_argument(format!(
            "Permission denied accessing file: {}",
            file_path.display()
        ))
    } else {
        error
    }
}
