//! YAML dataset definitions: two sides, each a file or a SELECT, sharing index columns

use crate::backend::Database;
use crate::data::DataLoader;
use crate::error::{CompareError, Result};
use crate::join::JoinMaterializer;
use crate::run::clean_run_name;
use crate::sql::{quote_qualified, sanitize_name};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the directory holding the dataset file
const HERE_PLACEHOLDER: &str = "{{here}}";

/// One side (`previous` or `new`) of a dataset file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetSide {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub select_sql: Option<String>,
    #[serde(default)]
    pub index: Option<Vec<String>>,
    #[serde(default, alias = "conn")]
    pub connection: Option<String>,
}

/// Where a side's rows come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Select(String),
}

impl DatasetSide {
    pub fn source(&self, label: &str) -> Result<DatasetSource> {
        match (&self.file_name, &self.select_sql) {
            (Some(_), Some(_)) => Err(CompareError::invalid_argument(format!(
                "{} cannot include both file_name and select_sql",
                label
            ))),
            (Some(file), None) => Ok(DatasetSource::File(PathBuf::from(file))),
            (None, Some(sql)) => Ok(DatasetSource::Select(sql.clone())),
            (None, None) => Err(CompareError::invalid_argument(format!(
                "{} must include file_name or select_sql",
                label
            ))),
        }
    }

    pub fn index_columns(&self, label: &str) -> Result<Vec<String>> {
        match &self.index {
            Some(index) if index.iter().any(|c| !c.trim().is_empty()) => Ok(index.clone()),
            _ => Err(CompareError::invalid_argument(format!(
                "Dataset file is missing {}.index",
                label
            ))),
        }
    }

    fn uses_file_only(&self) -> bool {
        self.file_name.is_some() && self.select_sql.is_none()
    }

    fn expand_here(&mut self, base_dir: &str) {
        for value in [&mut self.file_name, &mut self.select_sql, &mut self.connection]
            .into_iter()
            .flatten()
        {
            *value = value.replace(HERE_PLACEHOLDER, base_dir);
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    previous: Option<DatasetSide>,
    new: Option<DatasetSide>,
}

/// A parsed dataset file
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Sanitized file stem, used in table and run names
    pub name: String,
    pub previous: DatasetSide,
    pub new: DatasetSide,
}

impl Dataset {
    /// Read and parse a dataset file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CompareError::invalid_argument(format!(
                "Dataset file not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base_dir, &name)
    }

    /// Parse dataset YAML; `{{here}}` expands to `base_dir`
    pub fn from_yaml(content: &str, base_dir: &Path, name: &str) -> Result<Self> {
        let parsed: DatasetFile = serde_yaml::from_str(content).map_err(|e| {
            CompareError::invalid_argument(format!("Invalid dataset file: {}", e))
        })?;
        let (Some(mut previous), Some(mut new)) = (parsed.previous, parsed.new) else {
            return Err(CompareError::invalid_argument(
                "Dataset file must include previous and new sections",
            ));
        };

        let base_dir = base_dir.to_string_lossy();
        previous.expand_here(&base_dir);
        new.expand_here(&base_dir);

        Ok(Self {
            name: clean_run_name(name),
            previous,
            new,
        })
    }

    /// Check both sides and return the shared index columns
    pub fn validate(&self) -> Result<Vec<String>> {
        self.previous.source("previous")?;
        self.new.source("new")?;

        let previous = self.previous.index_columns("previous")?;
        let new = self.new.index_columns("new")?;
        if normalize_columns(&previous) != normalize_columns(&new) {
            return Err(CompareError::invalid_argument(
                "previous.index and new.index must match",
            ));
        }
        Ok(previous)
    }

    /// Connection named by `--connection` or the sections, after checking they agree
    pub fn connection(&self, flag: Option<&str>) -> Result<Option<String>> {
        let previous = self.previous.connection.as_deref().filter(|c| !c.trim().is_empty());
        let new = self.new.connection.as_deref().filter(|c| !c.trim().is_empty());

        if let Some(flag) = flag {
            for (label, section) in [("previous", previous), ("new", new)] {
                if section.is_some_and(|c| c != flag) {
                    return Err(CompareError::invalid_argument(format!(
                        "Dataset connection for {} does not match --connection",
                        label
                    )));
                }
            }
            return Ok(Some(flag.to_string()));
        }

        match (previous, new) {
            (Some(p), Some(n)) if p != n => Err(CompareError::invalid_argument(
                "Previous and new dataset entries must use the same connection",
            )),
            (p, n) => Ok(p.or(n).map(str::to_string)),
        }
    }

    /// Both sides are plain files, so a scratch database can hold them
    pub fn uses_files_only(&self) -> bool {
        self.previous.uses_file_only() && self.new.uses_file_only()
    }

    /// Table names for the two sides inside `schema`
    pub fn table_names(&self, schema: &str, tag: &str) -> (String, String) {
        let base = format!("dataset_{}_{}", self.name, sanitize_name(tag));
        (
            format!("{}.{}_previous", schema, base),
            format!("{}.{}_new", schema, base),
        )
    }

    /// Load or select both sides into tables, returning (previous, new)
    pub fn materialize(&self, db: &dyn Database, schema: &str, tag: &str) -> Result<(String, String)> {
        JoinMaterializer::new(db).ensure_schema(schema);

        let (previous_table, new_table) = self.table_names(schema, tag);
        create_side(db, &self.previous.source("previous")?, &previous_table)?;
        create_side(db, &self.new.source("new")?, &new_table)?;

        log::info!("Prepared dataset tables: {}, {}", previous_table, new_table);
        Ok((previous_table, new_table))
    }
}

fn create_side(db: &dyn Database, source: &DatasetSource, table: &str) -> Result<()> {
    match source {
        DatasetSource::File(path) => {
            if !DataLoader::is_supported_format(path) {
                return Err(CompareError::invalid_argument(format!(
                    "Unsupported file format: {}",
                    path.display()
                )));
            }
            DataLoader::new(db).load_file(path, table)?;
        }
        DatasetSource::Select(sql) => {
            db.execute(&format!(
                "CREATE TABLE {} AS {}",
                quote_qualified(table),
                sql.trim().trim_end_matches(';')
            ))?;
        }
    }
    Ok(())
}

/// Upper-cased, trimmed column names
pub fn normalize_columns(columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| c.trim().to_uppercase()).collect()
}
