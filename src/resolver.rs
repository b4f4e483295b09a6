//! Run id resolution (exact id or unique substring)

use crate::error::{CompareError, Result};
use crate::run::ComparisonRun;
use crate::store::RunStore;

/// Number of run ids suggested when a lookup finds nothing
const RECENT_IDS: usize = 5;

/// Outcome of looking a run up by id or id fragment
#[derive(Debug, Clone)]
pub enum RunLookup {
    Found(ComparisonRun),
    /// Several runs contain the fragment; the caller has to pick one
    Ambiguous(Vec<String>),
}

/// Resolves user-supplied run references against a store
pub struct RunResolver<'a> {
    store: &'a dyn RunStore,
}

impl<'a> RunResolver<'a> {
    pub fn new(store: &'a dyn RunStore) -> Self {
        Self { store }
    }

    /// Exact id first, then substring match over every stored id
    pub fn resolve(&self, query: &str) -> Result<RunLookup> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CompareError::invalid_argument("Run id must not be empty"));
        }

        if let Some(run) = self.store.get(query)? {
            return Ok(RunLookup::Found(run));
        }

        let runs = self.store.list()?;
        let recent: Vec<String> = runs.iter().take(RECENT_IDS).map(|r| r.run_id.clone()).collect();
        let mut matches: Vec<ComparisonRun> = runs
            .into_iter()
            .filter(|run| run.run_id.contains(query))
            .collect();

        match matches.len() {
            0 if recent.is_empty() => Err(CompareError::run_not_found(query)),
            0 => Err(CompareError::run_not_found(format!(
                "{} (recent runs: {})",
                query,
                recent.join(", ")
            ))),
            1 => Ok(RunLookup::Found(matches.remove(0))),
            _ => Ok(RunLookup::Ambiguous(
                matches.into_iter().map(|r| r.run_id).collect(),
            )),
        }
    }

    /// Runs whose id contains `pattern` (case-insensitive); all runs without a pattern
    pub fn filter(&self, pattern: Option<&str>) -> Result<Vec<ComparisonRun>> {
        let runs = self.store.list()?;
        Ok(match pattern {
            Some(pattern) => {
                let pattern = pattern.to_lowercase();
                runs.into_iter()
                    .filter(|r| r.run_id.to_lowercase().contains(&pattern))
                    .collect()
            }
            None => runs,
        })
    }
}
