//! Case-insensitive resolution of logical column names against backend-reported names

use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};

/// Whether two identifiers refer to the same column once case is ignored
pub fn same_identifier(a: &str, b: &str) -> bool {
    a == b || a.to_uppercase() == b.to_uppercase()
}

/// First column in `available` matching `requested` case-insensitively
pub fn find_column<'a>(requested: &str, available: &'a [String]) -> Option<&'a str> {
    let requested = requested.trim();
    available
        .iter()
        .find(|c| same_identifier(c, requested))
        .map(String::as_str)
}

/// An index column resolved on both sides of the comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// External name, taken from the previous side's casing
    pub name: String,
    /// Actual column name in the previous dataset
    pub previous: String,
    /// Actual column name in the new dataset
    pub new: String,
}

/// Resolve one requested index column against both column lists
pub fn resolve_index_column(
    requested: &str,
    previous_table: &str,
    columns_previous: &[String],
    new_table: &str,
    columns_new: &[String],
) -> Result<IndexColumn> {
    let previous = find_column(requested, columns_previous).ok_or_else(|| {
        CompareError::column_not_found(
            requested,
            format!("previous table '{}'", previous_table),
            columns_previous,
        )
    })?;
    let new = find_column(requested, columns_new).ok_or_else(|| {
        CompareError::column_not_found(
            requested,
            format!("new table '{}'", new_table),
            columns_new,
        )
    })?;

    Ok(IndexColumn {
        name: previous.to_string(),
        previous: previous.to_string(),
        new: new.to_string(),
    })
}

/// Resolve every requested index column, failing on the first miss
pub fn resolve_index_columns(
    requested: &[String],
    previous_table: &str,
    columns_previous: &[String],
    new_table: &str,
    columns_new: &[String],
) -> Result<Vec<IndexColumn>> {
    requested
        .iter()
        .map(|name| {
            resolve_index_column(name, previous_table, columns_previous, new_table, columns_new)
        })
        .collect()
}

/// Columns present (exactly, as reported) on both sides, minus the index columns.
/// Order follows the previous side.
pub fn common_columns(
    columns_previous: &[String],
    columns_new: &[String],
    index: &[IndexColumn],
) -> Vec<String> {
    columns_previous
        .iter()
        .filter(|c| columns_new.contains(*c))
        .filter(|c| !index.iter().any(|idx| &idx.previous == *c || &idx.new == *c))
        .cloned()
        .collect()
}

/// Narrow the common columns to an include list and drop an ignore list.
///
/// Include names that are not common columns abort with `ColumnNotFound`;
/// unknown ignore names are only logged.
pub fn filter_columns(
    common: Vec<String>,
    include: Option<&[String]>,
    ignore: Option<&[String]>,
) -> Result<Vec<String>> {
    let mut selected = match include {
        Some(include) if !include.is_empty() => {
            for name in include {
                if find_column(name, &common).is_none() {
                    return Err(CompareError::column_not_found(
                        name.as_str(),
                        "common columns",
                        &common,
                    ));
                }
            }
            common
                .into_iter()
                .filter(|c| include.iter().any(|name| same_identifier(c, name.trim())))
                .collect()
        }
        _ => common,
    };

    if let Some(ignore) = ignore {
        for name in ignore {
            if find_column(name, &selected).is_none() {
                log::warn!("Ignored column '{}' is not a compared column", name);
            }
        }
        selected.retain(|c| !ignore.iter().any(|name| same_identifier(c, name.trim())));
    }

    Ok(selected)
}
