//! Histogram gradient-boosted trees for binary classification.
//!
//! One engine backs every ensemble member; the growth policy decides the tree shape:
//! - leaf-wise best-first growth,
//! - depth-wise level growth,
//! - oblivious (symmetric) trees.

mod binning;
mod grow;
mod histogram;
mod model;
mod train;
mod tree;

use thiserror::Error;

pub use binning::{BinMapper, BinnedMatrix, MAX_BINS};
pub use model::{GbdtModel, sigmoid};
pub use train::{GrowthPolicy, TrainOptions, train_gbdt};
pub use tree::{Node, Tree, TreeError};

#[derive(Debug, Error, PartialEq)]
pub enum GbdtError {
    #[error("Mismatched X/Y lengths: {rows} rows, {labels} labels")]
    MismatchedRows { rows: usize, labels: usize },
    #[error("Empty dataset")]
    EmptyDataset,
    #[error("Dataset has no feature columns")]
    NoFeatures,
    #[error("Labels must be 0 or 1, got {0}")]
    InvalidLabel(u8),
    #[error("learning_rate must be positive, got {0}")]
    InvalidLearningRate(f64),
    #[error("Expected {expected} feature columns, got {found}")]
    FeatureCount { expected: usize, found: usize },
    #[error("init_raw must be finite, got {0}")]
    NonFiniteInit(f64),
    #[error("Tree {tree}: {source}")]
    InvalidTree {
        tree: usize,
        #[source]
        source: TreeError,
    },
}
