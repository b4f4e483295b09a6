//! End-to-end comparisons against an in-memory DuckDB

use crate::common::seed_items;
use sqlcompare::backend::{Cell, Database, DuckDbBackend, QueryResult};
use sqlcompare::inspect::{InspectMode, Inspector};
use sqlcompare::sql::count_query;
use sqlcompare::{CompareOptions, CompareOutcome, Comparator, MemoryRunStore, QueryGenerator};

fn compare(db: &DuckDbBackend, store: &MemoryRunStore, previous: &str, current: &str) -> CompareOutcome {
    Comparator::new(db, store)
        .compare(previous, current, &CompareOptions::new(vec!["id".to_string()]))
        .unwrap()
}

fn count(db: &DuckDbBackend, sql: &str) -> i64 {
    db.query(&count_query(sql)).unwrap().scalar_i64().unwrap()
}

fn sorted_rows(mut result: QueryResult) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = result
        .rows
        .drain(..)
        .map(|row| row.iter().map(Cell::to_string).collect())
        .collect();
    rows.sort();
    rows
}

#[test]
fn test_changed_and_unmatched_rows() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();

    let outcome = compare(&db, &store, "prev_items", "curr_items");
    let generator = QueryGenerator::from_run(&outcome.run).unwrap();

    assert_eq!(count(&db, &generator.missing_in_current_query()), 1);
    assert_eq!(count(&db, &generator.missing_in_previous_query()), 1);
    assert_eq!(count(&db, &generator.diff_query(None, None)), 2);

    let stats = db.query(&generator.stats_query(None)).unwrap();
    assert_eq!(
        sorted_rows(stats),
        vec![vec!["name".to_string(), "1".to_string()], vec!["value".to_string(), "1".to_string()]]
    );

    let diffs = db.query(&generator.diff_query(None, None)).unwrap();
    assert_eq!(diffs.columns, vec!["id", "Column", "Before", "Current"]);
    assert_eq!(
        sorted_rows(diffs),
        vec![
            vec!["1".to_string(), "name".to_string(), "alpha".to_string(), "alfa".to_string()],
            vec!["1".to_string(), "value".to_string(), "10".to_string(), "11".to_string()],
        ]
    );

    let missing = db.query(&generator.missing_in_current_query()).unwrap();
    let id_prev = missing.column_index("id_previous").unwrap();
    assert_eq!(missing.rows[0][id_prev], Cell::Int(2));
}

#[test]
fn test_identical_tables() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    db.execute("CREATE TABLE prev_copy AS SELECT * FROM prev_items").unwrap();
    let store = MemoryRunStore::new();

    let outcome = compare(&db, &store, "prev_items", "prev_copy");
    assert_eq!(outcome.summary.missing_in_current, 0);
    assert_eq!(outcome.summary.missing_in_previous, 0);
    assert_eq!(outcome.summary.diff_total, 0);
    assert_eq!(outcome.summary.stats.len(), 2);
    assert!(outcome.summary.stats.iter().all(|s| s.diff_count == 0));
}

#[test]
fn test_union_equals_per_column_diffs() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();
    let outcome = compare(&db, &store, "prev_items", "curr_items");
    let generator = QueryGenerator::from_run(&outcome.run).unwrap();

    let union = sorted_rows(db.query(&generator.diff_query(None, None)).unwrap());
    let mut per_column = Vec::new();
    for column in generator.common_columns() {
        per_column.extend(sorted_rows(db.query(&generator.diff_query(Some(column), None)).unwrap()));
    }
    per_column.sort();
    assert_eq!(union, per_column);
}

#[test]
fn test_stats_match_column_diff_counts_and_descend() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    db.execute("CREATE TABLE prev_orders (id INTEGER, status VARCHAR, total INTEGER, note VARCHAR)")
        .unwrap();
    db.execute("INSERT INTO prev_orders VALUES (1, 'new', 5, 'a'), (2, 'new', 6, NULL), (3, 'paid', 7, 'c')")
        .unwrap();
    db.execute("CREATE TABLE curr_orders (id INTEGER, status VARCHAR, total INTEGER, note VARCHAR)")
        .unwrap();
    db.execute("INSERT INTO curr_orders VALUES (1, 'paid', 5, 'a'), (2, 'paid', 6, 'b'), (3, 'shipped', 8, 'c')")
        .unwrap();
    let store = MemoryRunStore::new();

    let outcome = compare(&db, &store, "prev_orders", "curr_orders");
    let generator = QueryGenerator::from_run(&outcome.run).unwrap();

    let stats = &outcome.summary.stats;
    assert_eq!(stats[0].column, "status");
    assert_eq!(stats[0].diff_count, 3);
    assert!(stats.windows(2).all(|w| w[0].diff_count >= w[1].diff_count));
    for entry in stats {
        assert_eq!(
            entry.diff_count,
            count(&db, &generator.diff_query(Some(&entry.column), None)),
            "stats disagree with diffs for {}",
            entry.column
        );
    }
    // NULL -> 'b' is a change
    assert_eq!(stats.iter().find(|s| s.column == "note").unwrap().diff_count, 1);
}

#[test]
fn test_unmatched_rows_never_count_as_diffs() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();
    let outcome = compare(&db, &store, "prev_items", "curr_items");
    let generator = QueryGenerator::from_run(&outcome.run).unwrap();

    let diffs = db.query(&generator.diff_query(None, None)).unwrap();
    let id = diffs.column_index("id").unwrap();
    assert!(diffs.rows.iter().all(|row| row[id] == Cell::Int(1)));
}

#[test]
fn test_nonexistent_column_is_empty() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();
    let outcome = compare(&db, &store, "prev_items", "curr_items");
    let generator = QueryGenerator::from_run(&outcome.run).unwrap();

    let result = db.query(&generator.diff_query(Some("nonexistent"), Some(10))).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["id", "Column", "Before", "Current"]);
    assert!(db.query(&generator.stats_query(Some("nonexistent"))).unwrap().is_empty());
}

#[test]
fn test_inspector_views() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();
    let outcome = compare(&db, &store, "prev_items", "curr_items");
    let inspector = Inspector::new(&db, &outcome.run).unwrap();

    assert_eq!(inspector.fetch(InspectMode::Diffs, None, Some(1)).unwrap().len(), 1);
    assert_eq!(inspector.fetch(InspectMode::Diffs, Some("NAME"), None).unwrap().len(), 1);
    assert_eq!(inspector.fetch(InspectMode::Stats, Some("value"), None).unwrap().len(), 1);
    assert_eq!(inspector.fetch(InspectMode::MissingPrevious, None, None).unwrap().len(), 1);
    assert_eq!(
        inspector.column_counts().unwrap(),
        vec![("name".to_string(), 1), ("value".to_string(), 1)]
    );
    assert_eq!(inspector.summary().unwrap(), outcome.summary);
}

#[test]
fn test_inspector_exports() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();
    let outcome = compare(&db, &store, "prev_items", "curr_items");
    let inspector = Inspector::new(&db, &outcome.run).unwrap();

    let csv = inspector
        .export_rows(InspectMode::Diffs, Some("name"), temp_dir.path())
        .unwrap();
    let content = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(content, "id,Column,Before,Current\n1,name,alpha,alfa\n");
    assert!(csv.file_name().unwrap().to_str().unwrap().starts_with("analysis_"));

    let summary = inspector.export_summary(temp_dir.path()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(summary).unwrap()).unwrap();
    assert_eq!(report["summary"]["diff_total"], 2);
    assert_eq!(report["run"]["run_id"], outcome.run.run_id.as_str());
    assert_eq!(report["sample_diffs"].as_array().unwrap().len(), 2);
}
