//! SQL fragment helpers and `.sql` dataset file parsing

use crate::error::{CompareError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Side of the comparison a join-table column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Previous,
    New,
}

impl Side {
    pub fn suffix(self) -> &'static str {
        match self {
            Side::Previous => "_previous",
            Side::New => "_new",
        }
    }

    /// Alias used for this side's input table in the join statement
    pub fn alias(self) -> &'static str {
        match self {
            Side::Previous => "p",
            Side::New => "n",
        }
    }
}

/// Quote an identifier, doubling any embedded double quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling any embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote every dot-separated part of a qualified name
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .filter(|part| !part.is_empty())
        .map(|part| quote_ident(part.trim_matches('"')))
        .collect::<Vec<_>>()
        .join(".")
}

/// Reference to a join-table column, e.g. `"price_previous"`
pub fn side_column(column: &str, side: Side) -> String {
    quote_ident(&format!("{}{}", column, side.suffix()))
}

/// Reference to a column of one of the input tables inside the join statement
pub fn aliased_column(column: &str, side: Side) -> String {
    format!("{}.{}", side.alias(), quote_ident(column))
}

/// Replace anything that is not ASCII alphanumeric with `_`
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `SELECT COUNT(*)` wrapper around an arbitrary query
pub fn count_query(sql: &str) -> String {
    format!("SELECT COUNT(*) FROM ({}) AS counted", sql)
}

/// `LIMIT` wrapper around an arbitrary query
pub fn limit_query(sql: &str, limit: usize) -> String {
    format!("SELECT * FROM ({}) AS limited LIMIT {}", sql, limit)
}

/// A parsed `.sql` dataset file
#[derive(Debug, Clone)]
pub struct SqlFile {
    /// `ATTACH ...` statement found in a header comment, if any
    pub attach: Option<String>,
    /// Statements to run before the query (CREATE, INSERT, USE, ...)
    pub setup: Vec<String>,
    pub query: String,
    pub source_path: PathBuf,
}

/// Parse a SQL file into an optional ATTACH header, setup statements and a final SELECT
pub fn parse_sql_file(file_path: &Path) -> Result<SqlFile> {
    let content = fs::read_to_string(file_path).map_err(|e| {
        CompareError::invalid_argument(format!(
            "Failed to read SQL file '{}': {}",
            file_path.display(),
            e
        ))
    })?;

    let mut attach = None;
    let mut setup_lines = Vec::new();
    let mut query_lines = Vec::new();
    let mut in_select_query = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(comment) = trimmed.strip_prefix("--") {
            let comment = comment.trim();
            if comment.to_uppercase().starts_with("ATTACH") {
                attach = Some(comment.trim_end_matches(';').to_string());
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if !in_select_query
            && (trimmed.to_uppercase().starts_with("SELECT")
                || trimmed.to_uppercase().starts_with("WITH"))
        {
            in_select_query = true;
        }

        if in_select_query {
            query_lines.push(line);
        } else {
            setup_lines.push(line);
        }
    }

    if query_lines.is_empty() {
        return Err(CompareError::invalid_argument(format!(
            "No SELECT query found in file '{}'",
            file_path.display()
        )));
    }

    let setup = setup_lines
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let query = query_lines
        .join("\n")
        .trim()
        .trim_end_matches(';')
        .trim()
        .to_string();

    Ok(SqlFile {
        attach,
        setup,
        query,
        source_path: file_path.to_path_buf(),
    })
}

/// Substitute `{VAR_NAME}` placeholders with environment variables
pub fn substitute_env_vars(text: &str) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((before, after)) = rest.split_once('{') {
        output.push_str(before);
        match after.split_once('}') {
            Some((name, tail)) => {
                let value = env::var(name).map_err(|_| {
                    CompareError::config(format!("Environment variable '{}' not found", name))
                })?;
                output.push_str(&value);
                rest = tail;
            }
            None => {
                // Unterminated placeholder is kept as written
                output.push('{');
                rest = after;
            }
        }
    }
    output.push_str(rest);

    Ok(output)
}

/// Check if a file is a SQL file
pub fn is_sql_file(file_path: &Path) -> bool {
    file_path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}
