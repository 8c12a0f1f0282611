//! Digit recognizer: pixel CSV rows, a small CNN and an early-stopped training loop.

pub mod backend;
pub mod data;
pub mod model;
pub mod submission;
pub mod train;

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::DigitsSettings;
use crate::submission::SubmissionError;

pub use backend::{BACKEND_ENV, resolve_backend};
pub use data::{DigitImage, IMAGE_PIXELS, IMAGE_SIDE, LabelledImages, columns_to_image};
pub use model::{ActivationKind, DigitClassifier, DigitClassifierConfig};
pub use train::{EarlyStopping, EpochMetrics, TrainOptions, TrainReport};

#[derive(Debug, Error)]
pub enum DigitsError {
    #[error("Failed to open {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("Failed to read {path} (row {row}): {source}")]
    Read {
        path: PathBuf,
        row: usize,
        source: csv::Error,
    },
    #[error("{path} row {row}, column {column}: '{value}' is not a number")]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },
    #[error("{path} row {row}: label '{value}' is not a digit")]
    InvalidLabel {
        path: PathBuf,
        row: usize,
        value: String,
    },
    #[error("Expected 784 pixel values, got {found}")]
    PixelCount { found: usize },
    #[error("{path} contains no rows")]
    Empty { path: PathBuf },
    #[error("Invalid training setting: {0}")]
    Settings(String),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Train on `<data_dir>/train.csv`, predict `<data_dir>/test.csv` and write the submission.
pub fn run(settings: &DigitsSettings) -> Result<TrainReport, DigitsError> {
    let train_path = settings.data_dir.join("train.csv");
    let test_path = settings.data_dir.join("test.csv");
    let labelled = data::load_labelled(&train_path)?;
    let test = data::load_unlabelled(&test_path)?;
    info!(
        "Loaded {} training and {} test images",
        labelled.len(),
        test.len()
    );
    let (train_set, val_set) = labelled.split(settings.val_fraction, settings.seed)?;
    let options = TrainOptions::from_settings(settings);
    let backend = resolve_backend(settings.backend);
    let (report, labels) = backend::train_and_predict(backend, &train_set, &val_set, &test, &options)?;
    submission::write_submission(&settings.submission_path, &labels)?;
    info!(
        "Wrote {} predictions to {}",
        labels.len(),
        settings.submission_path.display()
    );
    Ok(report)
}
