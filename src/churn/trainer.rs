//! Cross-validated training of the soft-voting ensemble.

use serde::Serialize;
use tracing::{info, info_span};

use super::ChurnError;
use super::ensemble::{EnsembleParams, SoftVotingEnsemble};
use super::features::FeaturePipeline;
use super::folds::StratifiedKFold;
use super::record::Record;
use crate::ml::metrics::roc_auc;

#[derive(Debug, Clone)]
pub struct KFoldOptions {
    pub num_folds: usize,
    pub params: EnsembleParams,
    pub pipeline: FeaturePipeline,
}

impl Default for KFoldOptions {
    fn default() -> Self {
        Self {
            num_folds: 5,
            params: EnsembleParams::default(),
            pipeline: FeaturePipeline::default(),
        }
    }
}

/// Validation scores of one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldScore {
    pub fold: usize,
    pub accuracy: f64,
    pub roc_auc: f64,
}

#[derive(Debug, Clone)]
pub struct KFoldReport {
    /// Mean over folds of each test row's positive probability.
    pub test_predictions: Vec<f64>,
    /// Per-fold test probabilities, one `Vec` per fold.
    pub fold_predictions: Vec<Vec<f64>>,
    pub folds: Vec<FoldScore>,
    pub mean_roc_auc: f64,
}

/// Train one ensemble per stratified fold and average their test predictions.
///
/// Each fold fits its own feature pipeline on its training rows only and
/// reuses it for the validation rows and the test set.
pub fn kfold_prediction(
    train: &[Record],
    labels: &[u8],
    test: &[Record],
    options: &KFoldOptions,
) -> Result<KFoldReport, ChurnError> {
    if train.len() != labels.len() {
        return Err(ChurnError::LabelMismatch {
            records: train.len(),
            labels: labels.len(),
        });
    }
    let folds = StratifiedKFold::new(options.num_folds).split(labels)?;

    let mut fold_predictions = Vec::with_capacity(folds.len());
    let mut scores = Vec::with_capacity(folds.len());
    for (fold_idx, fold) in folds.iter().enumerate() {
        let _span = info_span!("fold", fold = fold_idx).entered();
        let train_records = gather(train, &fold.train);
        let train_labels: Vec<u8> = fold.train.iter().map(|&row| labels[row]).collect();
        let val_records = gather(train, &fold.validation);
        let val_labels: Vec<u8> = fold.validation.iter().map(|&row| labels[row]).collect();

        let (x_train, fitted) = options.pipeline.fit_transform(&train_records)?;
        let x_val = fitted.transform(&val_records)?;

        let model = SoftVotingEnsemble::fit(x_train.values.view(), &train_labels, &options.params)?;
        let predicted = model.predict_proba(x_val.values.view())?;
        let accuracy = model.score(x_val.values.view(), &val_labels)?;
        let auc = roc_auc(&val_labels, &predicted.to_vec()).map_err(ChurnError::Metric)?;
        info!("Accuracy (Fold {fold_idx}): {accuracy}");
        info!("ROC-AUC Score (Fold {fold_idx}): {auc}");

        let x_test = fitted.transform(test)?;
        fold_predictions.push(model.predict_proba(x_test.values.view())?.to_vec());
        scores.push(FoldScore {
            fold: fold_idx,
            accuracy,
            roc_auc: auc,
        });
    }

    let test_predictions = mean_over_folds(&fold_predictions, test.len());
    let mean_roc_auc = scores.iter().map(|score| score.roc_auc).sum::<f64>() / scores.len() as f64;
    info!("Average ROC-AUC Score: {mean_roc_auc}");
    Ok(KFoldReport {
        test_predictions,
        fold_predictions,
        folds: scores,
        mean_roc_auc,
    })
}

fn gather(records: &[Record], rows: &[usize]) -> Vec<Record> {
    rows.iter().map(|&row| records[row].clone()).collect()
}

/// Column-wise arithmetic mean of per-fold predictions.
pub fn mean_over_folds(fold_predictions: &[Vec<f64>], n_rows: usize) -> Vec<f64> {
    let mut mean = vec![0.0f64; n_rows];
    if fold_predictions.is_empty() {
        return mean;
    }
    for predictions in fold_predictions {
        for (slot, value) in mean.iter_mut().zip(predictions) {
            *slot += value;
        }
    }
    let n_folds = fold_predictions.len() as f64;
    for slot in &mut mean {
        *slot /= n_folds;
    }
    mean
}
