//! Comparisons driven by YAML dataset definitions

use crate::common::{seed_items, CliTestRunner};
use sqlcompare::backend::{with_connection, Database, DuckDbBackend};
use sqlcompare::{CompareError, CompareOptions, Comparator, Dataset, MemoryRunStore, QueryGenerator, RunStore};
use std::fs;
use std::path::Path;

const SELECT_DATASET: &str = r#"
previous:
  select_sql: SELECT id, name, value FROM prev_items
  index: [id]
new:
  select_sql: SELECT id, name, value FROM curr_items;
  index: [ID]
"#;

#[test]
fn test_dataset_materialize_and_compare() {
    let db = DuckDbBackend::open_in_memory().unwrap();
    seed_items(&db).unwrap();
    let store = MemoryRunStore::new();

    let dataset = Dataset::from_yaml(SELECT_DATASET, Path::new("."), "items").unwrap();
    let index = dataset.validate().unwrap();
    let (previous, new) = dataset.materialize(&db, "cmp", "0badf00d").unwrap();
    assert_eq!(previous, "cmp.dataset_items_0badf00d_previous");

    let outcome = Comparator::new(&db, &store)
        .compare(&previous, &new, &CompareOptions::new(index).with_schema("cmp"))
        .unwrap();
    assert_eq!(outcome.summary.missing_in_current, 1);
    assert_eq!(outcome.summary.missing_in_previous, 1);
    assert_eq!(outcome.summary.diff_total, 2);
}

#[test]
fn test_dataset_command_with_select_sql() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let identifier = fixture.create_seeded_db("warehouse.duckdb").unwrap();
    let path = fixture.root().join("items.yaml");
    fs::write(&path, SELECT_DATASET).unwrap();

    runner.expect_success(&[
        "dataset",
        path.to_str().unwrap(),
        "--connection",
        &identifier,
        "--schema",
        "dataset_schema",
    ]);

    let runs = fixture.workspace.run_store().list().unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert!(run.run_id.starts_with("dataset_items_"));
    assert!(run.tables.previous.starts_with("dataset_schema.dataset_items_"));
    assert!(run.tables.new.ends_with("_new"));

    let diff_rows = with_connection(&run.connection, |db| {
        let generator = QueryGenerator::from_run(run)?;
        Ok(db.query(&generator.diff_query(None, None))?.len())
    })
    .unwrap();
    assert_eq!(diff_rows, 2);
}

#[test]
fn test_dataset_command_with_files_uses_scratch_db() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_csv("previous.csv", &[vec!["id", "name"], vec!["1", "alpha"], vec!["2", "bravo"]])
        .unwrap();
    fixture
        .create_csv("current.csv", &[vec!["id", "name"], vec!["1", "alfa"], vec!["2", "bravo"]])
        .unwrap();
    let path = fixture.root().join("files.yaml");
    fs::write(
        &path,
        "previous:\n  file_name: \"{{here}}/previous.csv\"\n  index: [id]\n\
         new:\n  file_name: \"{{here}}/current.csv\"\n  index: [id]\n",
    )
    .unwrap();

    runner.expect_success(&["dataset", path.to_str().unwrap()]);

    let runs = fixture.workspace.run_store().list().unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].connection.contains(".sqlcompare"));
    assert_eq!(runs[0].common_columns, vec!["name"]);
}

#[test]
fn test_dataset_command_rejects_invalid_definitions() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let identifier = fixture.create_seeded_db("warehouse.duckdb").unwrap();

    let mismatched = fixture.root().join("mismatched.yaml");
    fs::write(
        &mismatched,
        "previous: {select_sql: SELECT * FROM prev_items, index: [id, name]}\n\
         new: {select_sql: SELECT * FROM curr_items, index: [id]}\n",
    )
    .unwrap();
    let err = runner.expect_failure(&["dataset", mismatched.to_str().unwrap(), "-c", &identifier]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));

    let conflicting = fixture.root().join("conflicting.yaml");
    fs::write(
        &conflicting,
        "previous: {select_sql: SELECT * FROM prev_items, index: [id], connection: other.duckdb}\n\
         new: {select_sql: SELECT * FROM curr_items, index: [id]}\n",
    )
    .unwrap();
    let err = runner.expect_failure(&["dataset", conflicting.to_str().unwrap(), "-c", &identifier]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));

    let missing = fixture.root().join("missing.yaml");
    let err = runner.expect_failure(&["dataset", missing.to_str().unwrap()]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));

    assert!(fixture.workspace.run_store().list().unwrap().is_empty());
}
