//! Persistence of comparison runs

use crate::error::{CompareError, Result};
use crate::run::ComparisonRun;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Key-value store of runs keyed by run id
pub trait RunStore {
    /// Insert or replace one run
    fn put(&self, run: &ComparisonRun) -> Result<()>;

    fn get(&self, run_id: &str) -> Result<Option<ComparisonRun>>;

    /// Every stored run, newest first
    fn list(&self) -> Result<Vec<ComparisonRun>>;

    fn ids(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|r| r.run_id).collect())
    }
}

/// One JSON file per run inside a directory
#[derive(Debug, Clone)]
pub struct FileRunStore {
    dir: PathBuf,
}

impl FileRunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }

    fn read_run(path: &Path) -> Result<ComparisonRun> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            CompareError::config(format!("Invalid run file '{}': {}", path.display(), e))
        })
    }
}

impl RunStore for FileRunStore {
    fn put(&self, run: &ComparisonRun) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let final_path = self.run_path(&run.run_id);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", run.run_id));

        fs::write(&tmp_path, serde_json::to_string_pretty(run)?)?;
        fs::rename(&tmp_path, &final_path)?;

        log::debug!("Saved run {} to {}", run.run_id, final_path.display());
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<ComparisonRun>> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_run(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<ComparisonRun>> {
        let mut runs = Vec::new();
        if !self.dir.exists() {
            return Ok(runs);
        }

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            let path = entry.path();
            let is_run_file = entry.file_type().is_file()
                && path.extension().map(|ext| ext == "json").unwrap_or(false);
            if !is_run_file {
                continue;
            }

            match Self::read_run(path) {
                Ok(run) => runs.push(run),
                Err(e) => log::warn!("Skipping unreadable run file: {}", e),
            }
        }

        runs.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.run_id.cmp(&a.run_id)));
        Ok(runs)
    }
}

/// In-process store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: RefCell<IndexMap<String, ComparisonRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for MemoryRunStore {
    fn put(&self, run: &ComparisonRun) -> Result<()> {
        self.runs
            .borrow_mut()
            .insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<ComparisonRun>> {
        Ok(self.runs.borrow().get(run_id).cloned())
    }

    fn list(&self) -> Result<Vec<ComparisonRun>> {
        let mut runs: Vec<ComparisonRun> = self.runs.borrow().values().cloned().collect();
        runs.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.run_id.cmp(&a.run_id)));
        Ok(runs)
    }
}
