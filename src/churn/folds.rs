//! Stratified k-fold splitting without shuffling.

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FoldError {
    #[error("Stratified k-fold needs at least 2 splits, got {0}")]
    InvalidSplitCount(usize),
    #[error("Cannot have {n_splits} folds with only {n_samples} samples")]
    TooFewSamples { n_splits: usize, n_samples: usize },
    #[error("{n_splits} folds exceed the member count of every class (largest has {largest_class})")]
    TooFewClassMembers {
        n_splits: usize,
        largest_class: usize,
    },
}

/// Train/validation row indices of one fold, both ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    pub n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Assign every row to one validation fold, keeping class proportions.
    ///
    /// Classes are ordered by first appearance. Labels are sorted and dealt
    /// round-robin to decide how many members of each class a fold receives;
    /// members then fill folds in row order.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<Fold>, FoldError> {
        let k = self.n_splits;
        if k < 2 {
            return Err(FoldError::InvalidSplitCount(k));
        }
        if k > labels.len() {
            return Err(FoldError::TooFewSamples {
                n_splits: k,
                n_samples: labels.len(),
            });
        }

        let mut classes: Vec<u8> = Vec::new();
        let encoded: Vec<usize> = labels
            .iter()
            .map(|label| match classes.iter().position(|c| c == label) {
                Some(idx) => idx,
                None => {
                    classes.push(*label);
                    classes.len() - 1
                }
            })
            .collect();
        let mut counts = vec![0usize; classes.len()];
        for &class in &encoded {
            counts[class] += 1;
        }
        let largest_class = counts.iter().copied().max().unwrap_or(0);
        if largest_class < k {
            return Err(FoldError::TooFewClassMembers {
                n_splits: k,
                largest_class,
            });
        }
        let smallest_class = counts.iter().copied().min().unwrap_or(0);
        if smallest_class < k {
            warn!(
                smallest_class,
                n_splits = k,
                "The least populated class has fewer members than folds"
            );
        }

        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        // allocation[fold][class]
        let mut allocation = vec![vec![0usize; classes.len()]; k];
        for (idx, &class) in sorted.iter().enumerate() {
            allocation[idx % k][class] += 1;
        }

        let mut fold_of = vec![0usize; labels.len()];
        for class in 0..classes.len() {
            let mut targets = (0..k).flat_map(|fold| std::iter::repeat_n(fold, allocation[fold][class]));
            for (row, _) in encoded.iter().enumerate().filter(|&(_, &c)| c == class) {
                fold_of[row] = targets.next().unwrap_or(k - 1);
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (validation, train) = (0..labels.len()).partition(|&row| fold_of[row] == fold);
                Fold { train, validation }
            })
            .collect())
    }
}
