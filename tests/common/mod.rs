//! Common test utilities and helpers

use sqlcompare::backend::{Database, DuckDbBackend};
use sqlcompare::{CompareError, CompareWorkspace, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture manager for creating temporary test environments
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub workspace: CompareWorkspace,
}

impl TestFixture {
    /// Create a new test fixture with initialized workspace
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let workspace = CompareWorkspace::create_new(temp_dir.path().to_path_buf())?;

        Ok(Self { temp_dir, workspace })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a test CSV file from rows of cells
    pub fn create_csv(&self, name: &str, data: &[Vec<&str>]) -> Result<PathBuf> {
        let path = self.root().join(name);
        let content: String = data.iter().map(|row| format!("{}\n", row.join(","))).collect();
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Path of a DuckDB file inside the fixture
    pub fn db_path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Connection identifier for a DuckDB file inside the fixture
    pub fn db_identifier(&self, name: &str) -> String {
        format!("duckdb:///{}", self.db_path(name).display())
    }

    /// Create a DuckDB file seeded with the standard previous/current tables
    pub fn create_seeded_db(&self, name: &str) -> Result<String> {
        let db = DuckDbBackend::open_file(&self.db_path(name))?;
        seed_items(&db)?;
        db.close()?;
        Ok(self.db_identifier(name))
    }
}

/// previous: (1,'alpha',10),(2,'bravo',20); current: (1,'alfa',11),(3,'charlie',30)
pub fn seed_items(db: &dyn Database) -> Result<()> {
    db.execute("CREATE TABLE prev_items (id INTEGER, name VARCHAR, value INTEGER)")?;
    db.execute("INSERT INTO prev_items VALUES (1, 'alpha', 10), (2, 'bravo', 20)")?;
    db.execute("CREATE TABLE curr_items (id INTEGER, name VARCHAR, value INTEGER)")?;
    db.execute("INSERT INTO curr_items VALUES (1, 'alfa', 11), (3, 'charlie', 30)")?;
    Ok(())
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a sqlcompare command against the fixture workspace
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use sqlcompare::cli::Cli;
        use sqlcompare::commands::execute_command;

        let mut cmd_args = vec!["sqlcompare"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| CompareError::invalid_argument(e.to_string()))?;

        let workspace_path = cli.workspace.as_deref().or(Some(self.fixture.root()));
        execute_command(cli.command, workspace_path)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        if let Err(e) = self.run_command(args) {
            panic!("Command {:?} should succeed: {}", args, e);
        }
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> CompareError {
        match self.run_command(args) {
            Ok(()) => panic!("Command {:?} should fail", args),
            Err(e) => e,
        }
    }
}
