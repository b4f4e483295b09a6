//! Unit tests for column matching and generated SQL

use sqlcompare::matcher::{common_columns, filter_columns, resolve_index_columns};
use sqlcompare::{CompareError, QueryGenerator};

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_index_resolves_across_casings() {
    let prev = strings(&["ID", "name"]);
    let new = strings(&["id", "Name"]);

    let index = resolve_index_columns(&strings(&["Id"]), "prev_items", &prev, "curr_items", &new).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].name, "ID");
    assert_eq!(index[0].previous, "ID");
    assert_eq!(index[0].new, "id");
}

#[test]
fn test_missing_index_names_side_and_columns() {
    let prev = strings(&["id", "name"]);
    let new = strings(&["key", "name"]);

    let err = resolve_index_columns(&strings(&["id"]), "prev_items", &prev, "curr_items", &new).unwrap_err();
    match err {
        CompareError::ColumnNotFound { column, table, available } => {
            assert_eq!(column, "id");
            assert!(table.contains("curr_items"));
            assert_eq!(available, new);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_common_columns_exclude_index_and_keep_previous_order() {
    let prev = strings(&["id", "b", "a", "only_prev"]);
    let new = strings(&["a", "id", "b", "only_new"]);
    let index = resolve_index_columns(&strings(&["id"]), "p", &prev, "n", &new).unwrap();

    let common = common_columns(&prev, &new, &index);
    assert_eq!(common, strings(&["b", "a"]));
    assert!(common.iter().all(|c| prev.contains(c) && new.contains(c)));
}

#[test]
fn test_include_and_ignore() {
    let common = strings(&["name", "value", "note"]);

    let included = filter_columns(common.clone(), Some(&strings(&["VALUE", "name"])), None).unwrap();
    assert_eq!(included, strings(&["name", "value"]));

    let ignored = filter_columns(common.clone(), None, Some(&strings(&["Note", "unknown"]))).unwrap();
    assert_eq!(ignored, strings(&["name", "value"]));

    assert!(matches!(
        filter_columns(common, Some(&strings(&["price"])), None),
        Err(CompareError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_generated_queries_quote_identifiers() {
    let prev = strings(&["Order Id", "Total"]);
    let new = strings(&["order id", "Total"]);
    let index = resolve_index_columns(&strings(&["ORDER ID"]), "p", &prev, "n", &new).unwrap();
    let generator = QueryGenerator::new("\"s\".\"j\"", index, strings(&["Total"]));

    let sql = generator.diff_query(None, None);
    assert!(sql.contains("COALESCE(\"order id_new\", \"Order Id_previous\") AS \"Order Id\""));
    assert!(generator.missing_in_current_query().contains("\"order id_new\" IS NULL"));
}
