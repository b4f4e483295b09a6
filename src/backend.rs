//! Database execution interface and the DuckDB implementation

use crate::error::{CompareError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A single value returned by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) => Some(*f as i64),
            Cell::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Total order used when sorting sample rows: NULLs sort last
    pub fn cmp_nulls_last(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Null, _) => Ordering::Greater,
            (_, Cell::Null) => Ordering::Less,
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Float(a), Cell::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Cell::Int(a), Cell::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Cell::Float(a), Cell::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }

    fn from_value_ref(value: ValueRef<'_>) -> Cell {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Boolean(b) => Cell::Bool(b),
            ValueRef::TinyInt(i) => Cell::Int(i.into()),
            ValueRef::SmallInt(i) => Cell::Int(i.into()),
            ValueRef::Int(i) => Cell::Int(i.into()),
            ValueRef::BigInt(i) => Cell::Int(i),
            ValueRef::HugeInt(i) => i64::try_from(i)
                .map(Cell::Int)
                .unwrap_or_else(|_| Cell::Text(i.to_string())),
            ValueRef::UTinyInt(i) => Cell::Int(i.into()),
            ValueRef::USmallInt(i) => Cell::Int(i.into()),
            ValueRef::UInt(i) => Cell::Int(i.into()),
            ValueRef::UBigInt(i) => i64::try_from(i)
                .map(Cell::Int)
                .unwrap_or_else(|_| Cell::Text(i.to_string())),
            ValueRef::Float(f) => Cell::Float(f.into()),
            ValueRef::Double(f) => Cell::Float(f),
            ValueRef::Decimal(d) => Cell::Text(d.to_string()),
            ValueRef::Text(s) => Cell::Text(String::from_utf8_lossy(s).to_string()),
            ValueRef::Blob(b) => Cell::Text(format!("<blob:{} bytes>", b.len())),
            ValueRef::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + 719_163)
                .map(|d| Cell::Text(d.to_string()))
                .unwrap_or_else(|| Cell::Text(days.to_string())),
            ValueRef::Time64(unit, t) => {
                let micros = to_micros(unit, t);
                NaiveTime::from_num_seconds_from_midnight_opt(
                    (micros / 1_000_000) as u32,
                    ((micros % 1_000_000) * 1_000) as u32,
                )
                .map(|t| Cell::Text(t.to_string()))
                .unwrap_or_else(|| Cell::Text(micros.to_string()))
            }
            ValueRef::Timestamp(unit, ts) => DateTime::from_timestamp_micros(to_micros(unit, ts))
                .map(|dt| Cell::Text(dt.naive_utc().to_string()))
                .unwrap_or_else(|| Cell::Text(ts.to_string())),
            _ => Cell::Text("<unsupported>".to_string()),
        }
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * 1_000_000,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Rows plus column names returned by a query
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.to_uppercase();
        self.columns.iter().position(|c| c.to_uppercase() == wanted)
    }

    /// First cell of the first row, read as an integer (for COUNT queries)
    pub fn scalar_i64(&self) -> Option<i64> {
        self.rows.first().and_then(|row| row.first()).and_then(Cell::as_i64)
    }

    /// Sort rows by the named column, NULLs last; unknown columns leave the order untouched
    pub fn sort_by_column(&mut self, name: &str) {
        if let Some(idx) = self.column_index(name) {
            self.rows.sort_by(|a, b| a[idx].cmp_nulls_last(&b[idx]));
        }
    }
}

/// Metadata about a statement run through [`Database::execute`]
#[derive(Debug, Clone, Copy)]
pub struct ExecMeta {
    pub elapsed_ms: u128,
}

/// Generic query/execute interface the comparison engine runs against
pub trait Database {
    /// Opaque string naming how to reconnect to this backend
    fn identifier(&self) -> &str;

    fn execute(&self, sql: &str) -> Result<ExecMeta>;

    fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Name of the current catalog, when the backend has one
    fn current_catalog(&self) -> Option<String> {
        None
    }
}

/// Where a DuckDB connection points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuckDbTarget {
    Memory,
    File(PathBuf),
}

impl DuckDbTarget {
    /// Parse a connection identifier such as `duckdb:///data/cmp.duckdb` or `:memory:`
    pub fn parse(identifier: &str) -> Result<Self> {
        let trimmed = identifier.trim();
        let path = if let Some(rest) = trimmed.strip_prefix("duckdb:///") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("duckdb://") {
            rest
        } else if trimmed == ":memory:" {
            trimmed
        } else {
            let lower = trimmed.to_lowercase();
            if !(lower.ends_with(".duckdb") || lower.ends_with(".db")) {
                return Err(CompareError::config(format!(
                    "Unsupported connection '{}'. Use duckdb:///<path>, :memory: or a .duckdb file",
                    identifier
                )));
            }
            trimmed
        };

        if path.is_empty() || path == ":memory:" {
            Ok(Self::Memory)
        } else {
            // duckdb:////abs/path and duckdb:///rel/path both land here
            Ok(Self::File(PathBuf::from(path)))
        }
    }

    pub fn identifier(&self) -> String {
        match self {
            Self::Memory => "duckdb:///:memory:".to_string(),
            Self::File(path) => format!("duckdb:///{}", path.display()),
        }
    }
}

/// DuckDB-backed [`Database`]
pub struct DuckDbBackend {
    connection: Connection,
    identifier: String,
}

impl DuckDbBackend {
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self {
            connection,
            identifier: DuckDbTarget::Memory.identifier(),
        })
    }

    pub fn open_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(path)?;
        connection.execute("SET enable_progress_bar=false", [])?;
        Ok(Self {
            connection,
            identifier: DuckDbTarget::File(path.to_path_buf()).identifier(),
        })
    }

    /// Open whatever a connection identifier points at
    pub fn connect(identifier: &str) -> Result<Self> {
        match DuckDbTarget::parse(identifier)? {
            DuckDbTarget::Memory => Self::open_in_memory(),
            DuckDbTarget::File(path) => Self::open_file(&path),
        }
    }

    /// Close the connection, surfacing any error DuckDB reports on shutdown
    pub fn close(self) -> Result<()> {
        self.connection.close().map_err(|(_, e)| CompareError::DuckDb(e))
    }
}

impl Database for DuckDbBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn execute(&self, sql: &str) -> Result<ExecMeta> {
        log::debug!("execute: {}", sql);
        let started = Instant::now();
        self.connection
            .execute(sql, [])
            .map_err(|e| CompareError::backend(sql, e))?;
        Ok(ExecMeta {
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        log::debug!("query: {}", sql);
        let mut stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| CompareError::backend(sql, e))?;
        let mut rows = stmt.query([]).map_err(|e| CompareError::backend(sql, e))?;

        let columns = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();
        let column_count = columns.len();

        let mut result = QueryResult {
            columns,
            rows: Vec::new(),
        };
        while let Some(row) = rows.next().map_err(|e| CompareError::backend(sql, e))? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).map_err(|e| CompareError::backend(sql, e))?;
                cells.push(Cell::from_value_ref(value));
            }
            result.rows.push(cells);
        }

        Ok(result)
    }

    fn current_catalog(&self) -> Option<String> {
        self.query("SELECT current_database()")
            .ok()
            .and_then(|r| r.rows.into_iter().next())
            .and_then(|row| row.into_iter().next())
            .and_then(|cell| match cell {
                Cell::Text(name) if !name.is_empty() => Some(name),
                _ => None,
            })
    }
}

/// Open a connection, hand it to `f`, and close it on every exit path
pub fn with_connection<T>(
    identifier: &str,
    f: impl FnOnce(&DuckDbBackend) -> Result<T>,
) -> Result<T> {
    let backend = DuckDbBackend::connect(identifier)?;
    // An early return from `f` drops `backend`, which closes the connection
    let value = f(&backend)?;
    backend.close()?;
    Ok(value)
}
