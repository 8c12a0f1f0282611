//! Churn feature pipeline: derived columns, dummy codes, text embeddings and scaling.

mod derive;
mod encode;
mod pipeline;
mod scale;
pub mod text;

use ndarray::Array2;
use thiserror::Error;

pub use derive::{DerivedFeatures, derive};
pub use encode::{CATEGORICAL_COLUMNS, CategoricalEncoder, CategoryValue, categorical_values};
pub use pipeline::{FeaturePipeline, FittedPipeline, NUMERIC_COLUMNS, data_pipeline};
#[cfg(test)]
pub(crate) use pipeline::take_fitted_rows;
pub use scale::{MinMaxScaler, SCALED_COLUMNS};
pub use text::TextEmbedder;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Cannot fit the feature pipeline on zero records")]
    EmptyInput,
    #[error("Transforming non-training data requires a fitted pipeline")]
    NotFitted,
    #[error("Column {column} produced an empty vocabulary")]
    EmptyVocabulary { column: String },
    #[error("Expected {expected} columns, found {found}")]
    ColumnMismatch { expected: usize, found: usize },
}

/// Named numeric columns, one row per input record.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }
}
