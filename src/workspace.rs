//! Workspace management for sqlcompare operations

use crate::comparator::DEFAULT_SCHEMA;
use crate::error::{CompareError, Result};
use crate::store::FileRunStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the schema that holds join tables
pub const SCHEMA_ENV: &str = "SQLCOMPARE_COMPARISON_SCHEMA";
/// Environment variable overriding the default connection identifier
pub const CONNECTION_ENV: &str = "SQLCOMPARE_CONN_DEFAULT";

const WORKSPACE_DIR: &str = ".sqlcompare";
const GITIGNORE_ENTRY: &str = ".sqlcompare/db/";

/// Contents of `.sqlcompare/config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    pub created: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub default_connection: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: crate::FORMAT_VERSION,
            created: chrono::Utc::now(),
            default_schema: None,
            default_connection: None,
        }
    }
}

fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// First non-empty value of flag, environment, file setting
fn pick(flag: Option<&str>, env_value: Option<String>, file_value: Option<&str>) -> Option<String> {
    flag.filter(|v| present(v))
        .map(str::to_string)
        .or(env_value.filter(|v| present(v)))
        .or_else(|| file_value.filter(|v| present(v)).map(str::to_string))
}

impl Settings {
    /// Schema for join tables: flag, then environment, then config, then `sqlcompare`
    pub fn resolve_schema(&self, flag: Option<&str>) -> String {
        pick(flag, std::env::var(SCHEMA_ENV).ok(), self.default_schema.as_deref())
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string())
    }

    /// Connection identifier: flag, then environment, then config
    pub fn resolve_connection(&self, flag: Option<&str>) -> Option<String> {
        pick(flag, std::env::var(CONNECTION_ENV).ok(), self.default_connection.as_deref())
    }
}

/// Manages the .sqlcompare workspace directory
#[derive(Debug, Clone)]
pub struct CompareWorkspace {
    /// Project root directory (where .sqlcompare/ lives)
    pub root: PathBuf,
    pub workspace_dir: PathBuf,
    /// One JSON file per comparison run
    pub runs_dir: PathBuf,
    /// Scratch DuckDB files for file comparisons
    pub db_dir: PathBuf,
}

impl CompareWorkspace {
    /// Find existing workspace or create a new one
    pub fn find_or_create(start_dir: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let start = start_dir.unwrap_or(&current_dir);

        if let Some(workspace) = Self::find_existing(start) {
            return Ok(workspace);
        }

        Self::create_new(start.to_path_buf())
    }

    /// Walk up from `start_dir` looking for `.sqlcompare/`, stopping at a git root
    fn find_existing(start_dir: &Path) -> Option<Self> {
        let mut current = start_dir;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Some(Self::from_root(current.to_path_buf()));
            }
            if current.join(".git").exists() {
                return None;
            }
            current = current.parent()?;
        }
    }

    /// Create a new workspace in the specified root directory
    pub fn create_new(root: PathBuf) -> Result<Self> {
        let workspace = Self::from_root(root);

        fs::create_dir_all(&workspace.runs_dir)?;
        fs::create_dir_all(&workspace.db_dir)?;
        workspace.write_settings(&Settings::default(), false)?;
        workspace.ensure_gitignore()?;

        log::info!("Created sqlcompare workspace at: {}", workspace.root.display());
        Ok(workspace)
    }

    pub fn from_root(root: PathBuf) -> Self {
        let workspace_dir = root.join(WORKSPACE_DIR);
        Self {
            runs_dir: workspace_dir.join("runs"),
            db_dir: workspace_dir.join("db"),
            workspace_dir,
            root,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.workspace_dir.join("config.json")
    }

    /// Settings from config.json, defaults when the file is absent
    pub fn settings(&self) -> Result<Settings> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            CompareError::config(format!("Invalid config file '{}': {}", path.display(), e))
        })
    }

    /// Write config.json; an existing file is kept unless `force` is set
    pub fn write_settings(&self, settings: &Settings, force: bool) -> Result<()> {
        let path = self.config_path();
        if path.exists() && !force {
            return Ok(());
        }
        fs::create_dir_all(&self.workspace_dir)?;
        fs::write(path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }

    pub fn run_store(&self) -> FileRunStore {
        FileRunStore::new(self.runs_dir.clone())
    }

    /// Path of a scratch DuckDB file inside the workspace
    pub fn scratch_db_path(&self, name: &str) -> PathBuf {
        self.db_dir.join(format!("{}.duckdb", name))
    }

    /// Ensure .gitignore excludes the scratch databases
    pub fn ensure_gitignore(&self) -> Result<()> {
        let gitignore_path = self.root.join(".gitignore");
        let entry = format!("# sqlcompare scratch databases\n{}\n", GITIGNORE_ENTRY);

        if gitignore_path.exists() {
            let content = fs::read_to_string(&gitignore_path)?;
            if !content.contains(GITIGNORE_ENTRY) {
                let new_content = if content.ends_with('\n') {
                    format!("{}\n{}", content, entry)
                } else {
                    format!("{}\n\n{}", content, entry)
                };
                fs::write(gitignore_path, new_content)?;
                log::info!("Updated .gitignore with sqlcompare entries");
            }
        } else {
            fs::write(gitignore_path, entry)?;
            log::info!("Created .gitignore with sqlcompare entries");
        }

        Ok(())
    }
}
