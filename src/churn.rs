//! Bank churn pipeline: features, stratified folds, soft-voting ensemble and search.

pub mod ensemble;
pub mod features;
pub mod folds;
pub mod record;
pub mod runner;
pub mod search;
pub mod submission;
pub mod trainer;

use thiserror::Error;

use crate::submission::SubmissionError;

pub use ensemble::{EnsembleError, EnsembleParams, ParamValue, SoftVotingEnsemble};
pub use features::{FeatureError, FeatureMatrix, FeaturePipeline, FittedPipeline, data_pipeline};
pub use folds::{Fold, FoldError, StratifiedKFold};
pub use record::{Record, RecordError};
pub use search::SearchError;
pub use trainer::{FoldScore, KFoldOptions, KFoldReport, kfold_prediction};

#[derive(Debug, Error)]
pub enum ChurnError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Fold(#[from] FoldError),
    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("Metric failed: {0}")]
    Metric(String),
    #[error("{records} training records but {labels} labels")]
    LabelMismatch { records: usize, labels: usize },
}
