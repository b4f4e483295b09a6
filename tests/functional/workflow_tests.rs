//! Full CLI workflows: compare, list, inspect

use crate::common::CliTestRunner;
use sqlcompare::backend::{with_connection, Database};
use sqlcompare::{CompareError, RunStore};
use std::fs;

#[test]
fn test_init_writes_settings() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init", "--schema", "audit", "--connection", "duckdb:///w.duckdb"]);

    let settings = runner.fixture().workspace.settings().unwrap();
    assert_eq!(settings.default_schema.as_deref(), Some("audit"));
    assert_eq!(settings.default_connection.as_deref(), Some("duckdb:///w.duckdb"));
}

#[test]
fn test_table_compare_then_inspect() {
    let runner = CliTestRunner::new().unwrap();
    let identifier = runner.fixture().create_seeded_db("warehouse.duckdb").unwrap();

    runner.expect_success(&[
        "table", "prev_items", "curr_items", "--index", "id", "--connection", &identifier, "--name", "items",
    ]);

    let store = runner.fixture().workspace.run_store();
    let runs = store.list().unwrap();
    assert_eq!(runs.len(), 1);
    let run_id = runs[0].run_id.clone();
    assert!(run_id.starts_with("items_"));
    assert_eq!(runs[0].connection, identifier);

    runner.expect_success(&["inspect", &run_id]);
    runner.expect_success(&["inspect", "items", "--stats", "--format", "json"]);
    runner.expect_success(&["inspect", &run_id, "--column", "name", "--limit", "5"]);
    runner.expect_success(&["inspect", &run_id, "--missing-current"]);
    runner.expect_success(&["inspect", &run_id, "--missing-previous"]);
    runner.expect_success(&["inspect", &run_id, "--list-columns"]);
    runner.expect_success(&["list"]);
    runner.expect_success(&["list", "items", "--format", "json"]);
}

#[test]
fn test_compare_csv_files() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let previous = fixture
        .create_csv(
            "previous.csv",
            &[vec!["id", "name", "value"], vec!["1", "alpha", "10"], vec!["2", "bravo", "20"]],
        )
        .unwrap();
    let current = fixture
        .create_csv(
            "current.csv",
            &[vec!["id", "name", "value"], vec!["1", "alfa", "11"], vec!["3", "charlie", "30"]],
        )
        .unwrap();

    runner.expect_success(&[
        "table",
        previous.to_str().unwrap(),
        current.to_str().unwrap(),
        "--index",
        "ID",
    ]);

    let runs = fixture.workspace.run_store().list().unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].tables.previous.starts_with("prev_previous_csv_"));
    assert!(runs[0].run_id.starts_with("compare_previous_current_"));
    assert!(runs[0].connection.contains(".sqlcompare"));
    assert!(fixture.workspace.db_dir.read_dir().unwrap().next().is_some());

    runner.expect_success(&["inspect", &runs[0].run_id, "--stats"]);
}

#[test]
fn test_compare_files_in_deeply_nested_directories() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let nested = ["a".repeat(100), "b".repeat(100), "c".repeat(100)].join("/");
    fs::create_dir_all(fixture.root().join(&nested)).unwrap();

    let rows = [vec!["id", "name"], vec!["1", "alpha"]];
    let previous = fixture.create_csv(&format!("{}/previous_orders.csv", nested), &rows).unwrap();
    let current = fixture.create_csv(&format!("{}/current_orders.csv", nested), &rows).unwrap();
    assert!(previous.to_string_lossy().len() + current.to_string_lossy().len() > 255);

    runner.expect_success(&["table", previous.to_str().unwrap(), current.to_str().unwrap(), "--index", "id"]);

    let runs = fixture.workspace.run_store().list().unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].run_id.starts_with("compare_previous_orders_current_orders_"));
    assert!(runs[0].run_id.len() < 100);
}

#[test]
fn test_loading_files_keeps_existing_tables() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let identifier = fixture.create_seeded_db("warehouse.duckdb").unwrap();
    with_connection(&identifier, |db| {
        db.execute("CREATE TABLE prev_orders_csv (note VARCHAR)")?;
        db.execute("INSERT INTO prev_orders_csv VALUES ('keep me')")?;
        Ok(())
    })
    .unwrap();

    fs::create_dir_all(fixture.root().join("old")).unwrap();
    fs::create_dir_all(fixture.root().join("new")).unwrap();
    let previous = fixture.create_csv("old/orders.csv", &[vec!["id", "qty"], vec!["1", "2"]]).unwrap();
    let current = fixture.create_csv("new/orders.csv", &[vec!["id", "qty"], vec!["1", "3"]]).unwrap();

    runner.expect_success(&[
        "table",
        previous.to_str().unwrap(),
        current.to_str().unwrap(),
        "--index",
        "id",
        "--connection",
        &identifier,
    ]);

    let runs = fixture.workspace.run_store().list().unwrap();
    assert_ne!(runs[0].tables.previous, "prev_orders_csv");
    let note = with_connection(&identifier, |db| db.query("SELECT note FROM prev_orders_csv"))
        .unwrap();
    assert_eq!(note.len(), 1);
}

#[test]
fn test_query_compare() {
    let runner = CliTestRunner::new().unwrap();
    let identifier = runner.fixture().create_seeded_db("warehouse.duckdb").unwrap();

    runner.expect_success(&[
        "query",
        "SELECT id, name FROM prev_items",
        "SELECT id, name FROM curr_items",
        "--index",
        "id",
        "--connection",
        &identifier,
        "--schema",
        "scratch",
    ]);

    let runs = runner.fixture().workspace.run_store().list().unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].tables.join.contains("\"scratch\""));
    assert_eq!(runs[0].common_columns, vec!["name"]);
}

#[test]
fn test_failures() {
    let runner = CliTestRunner::new().unwrap();
    let identifier = runner.fixture().create_seeded_db("warehouse.duckdb").unwrap();
    let csv = runner
        .fixture()
        .create_csv("one.csv", &[vec!["id"], vec!["1"]])
        .unwrap();

    let err = runner.expect_failure(&["table", "prev_items", "curr_items", "--index", " ", "--connection", &identifier]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));

    let err = runner.expect_failure(&["table", "prev_items", "curr_items", "--index", "sku", "--connection", &identifier]);
    assert!(matches!(err, CompareError::ColumnNotFound { .. }));

    let err = runner.expect_failure(&["table", csv.to_str().unwrap(), "curr_items", "--index", "id"]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));

    let err = runner.expect_failure(&["inspect", "does_not_exist"]);
    assert!(matches!(err, CompareError::RunNotFound { .. }));

    let err = runner.expect_failure(&["list", "--format", "xml"]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));
}

#[test]
fn test_invalid_save_mode_is_rejected() {
    let runner = CliTestRunner::new().unwrap();
    let identifier = runner.fixture().create_seeded_db("warehouse.duckdb").unwrap();
    runner.expect_success(&["table", "prev_items", "curr_items", "--index", "id", "--connection", &identifier]);
    let run_id = runner.fixture().workspace.run_store().ids().unwrap().remove(0);

    let err = runner.expect_failure(&["inspect", &run_id, "--save", "xlsx"]);
    assert!(matches!(err, CompareError::InvalidArgument { .. }));
}
