//! Trial-based hyperparameter search over the ensemble's parameters.
//!
//! Parameter names follow the `"<model>__<param>"` convention understood by
//! [`EnsembleParams::set`](super::ensemble::EnsembleParams::set), so the best
//! trial's mapping can be applied directly as overrides.

mod objective;
mod results;
mod sampler;
mod study;
mod trial;

use std::path::PathBuf;

use thiserror::Error;

use super::ensemble::EnsembleError;
use super::folds::FoldError;
use crate::config::ConfigError;

pub use objective::{SEARCH_FOLDS, SEARCH_SPACE, cross_validated_auc, ensemble_objective, suggest_ensemble_params};
pub use results::{SearchResults, load_best_params};
pub use sampler::{Distribution, RandomSampler, Sampler, TpeSampler};
pub use study::{Direction, FrozenTrial, Study, TrialState};
pub use trial::Trial;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
    #[error(transparent)]
    Fold(#[from] FoldError),
    #[error("Metric failed: {0}")]
    Metric(String),
    #[error("Parameter {name} was suggested with conflicting ranges")]
    ConflictingDistribution { name: String },
    #[error("Invalid range for {name}: [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },
    #[error("Study {study_name} has no completed trials")]
    NoCompletedTrials { study_name: String },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid search results in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Write(#[from] ConfigError),
}
