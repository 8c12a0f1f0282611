use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::SearchError;
use super::study::{Direction, FrozenTrial, Study};
use crate::churn::ensemble::ParamValue;
use crate::config::write_atomic;

/// Persisted outcome of a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub study_name: String,
    pub direction: Direction,
    pub best_trial: Option<FrozenTrial>,
    pub trials: Vec<FrozenTrial>,
}

impl SearchResults {
    pub fn from_study(study: &Study) -> Self {
        Self {
            study_name: study.study_name.clone(),
            direction: study.direction,
            best_trial: study.best_trial().cloned(),
            trials: study.trials().to_vec(),
        }
    }

    /// Write pretty JSON atomically.
    pub fn save(&self, path: &Path) -> Result<(), SearchError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let bytes = std::fs::read(path).map_err(|source| SearchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parameters of the best trial stored at `path`.
pub fn load_best_params(path: &Path) -> Result<BTreeMap<String, ParamValue>, SearchError> {
    let results = SearchResults::load(path)?;
    results
        .best_trial
        .map(|trial| trial.params)
        .ok_or(SearchError::NoCompletedTrials {
            study_name: results.study_name,
        })
}
