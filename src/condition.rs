//! Predicates over the join table

use crate::matcher::IndexColumn;
use crate::sql::{side_column, Side};

/// True when every index column of `side` is NULL, i.e. the row has no match on that side
pub fn index_all_null(index: &[IndexColumn], side: Side) -> String {
    let parts: Vec<String> = index
        .iter()
        .map(|idx| {
            let name = match side {
                Side::Previous => &idx.previous,
                Side::New => &idx.new,
            };
            format!("{} IS NULL", side_column(name, side))
        })
        .collect();
    if parts.is_empty() {
        // Compare refuses to run without index columns, so this never reaches the backend
        "1 = 0".to_string()
    } else {
        parts.join(" AND ")
    }
}

/// True when the previous and new values differ, a NULL only being equal to another NULL
pub fn values_differ(column: &str) -> String {
    let previous = side_column(column, Side::Previous);
    let new = side_column(column, Side::New);
    format!(
        "({p} <> {n} OR ({p} IS NULL AND {n} IS NOT NULL) OR ({p} IS NOT NULL AND {n} IS NULL))",
        p = previous,
        n = new
    )
}

/// Rows matched on both sides whose value in `column` changed
pub fn diff_condition(column: &str, index: &[IndexColumn]) -> String {
    format!(
        "{} AND NOT ({}) AND NOT ({})",
        values_differ(column),
        index_all_null(index, Side::Previous),
        index_all_null(index, Side::New)
    )
}
