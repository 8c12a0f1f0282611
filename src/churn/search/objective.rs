use ndarray::{ArrayView2, Axis};

use super::SearchError;
use super::sampler::Distribution;
use super::trial::Trial;
use crate::churn::ensemble::{EnsembleParams, ParamValue, SoftVotingEnsemble};
use crate::churn::folds::StratifiedKFold;
use crate::ml::metrics::roc_auc;

/// Folds used to score every trial, independent of the final training run.
pub const SEARCH_FOLDS: usize = 5;

/// Searched parameters and their inclusive ranges.
pub const SEARCH_SPACE: &[(&str, Distribution)] = &[
    ("lgbm__n_estimators", Distribution::Int { low: 500, high: 2500 }),
    ("lgbm__subsample", Distribution::Float { low: 0.05, high: 1.0 }),
    ("lgbm__colsample_bytree", Distribution::Float { low: 0.05, high: 1.0 }),
    ("lgbm__learning_rate", Distribution::Float { low: 1e-3, high: 0.1 }),
    ("lgbm__max_depth", Distribution::Int { low: 1, high: 10 }),
    ("lgbm__num_leaves", Distribution::Int { low: 2, high: 1000 }),
    ("lgbm__reg_alpha", Distribution::Float { low: 0.05, high: 1.0 }),
    ("lgbm__reg_lambda", Distribution::Float { low: 0.05, high: 1.0 }),
    ("xgb__n_estimators", Distribution::Int { low: 500, high: 2500 }),
    ("xgb__learning_rate", Distribution::Float { low: 1e-3, high: 0.1 }),
    ("xgb__max_depth", Distribution::Int { low: 1, high: 10 }),
    ("xgb__subsample", Distribution::Float { low: 0.05, high: 1.0 }),
    ("xgb__colsample_bytree", Distribution::Float { low: 0.05, high: 1.0 }),
    ("xgb__min_child_weight", Distribution::Int { low: 1, high: 20 }),
    ("cat__iterations", Distribution::Int { low: 500, high: 1500 }),
    ("cat__learning_rate", Distribution::Float { low: 1e-3, high: 0.1 }),
    ("cat__depth", Distribution::Int { low: 1, high: 10 }),
    ("cat__subsample", Distribution::Float { low: 0.05, high: 1.0 }),
    ("cat__colsample_bylevel", Distribution::Float { low: 0.05, high: 1.0 }),
    ("cat__min_data_in_leaf", Distribution::Int { low: 1, high: 100 }),
    ("vc__lgbm_weight", Distribution::Float { low: 0.1, high: 5.0 }),
    ("vc__xgb_weight", Distribution::Float { low: 0.1, high: 5.0 }),
    ("vc__cat_weight", Distribution::Float { low: 0.1, high: 5.0 }),
];

/// Sample every searched parameter on top of the default ensemble.
pub fn suggest_ensemble_params(trial: &mut Trial<'_>) -> Result<EnsembleParams, SearchError> {
    let mut params = EnsembleParams::default();
    for &(name, distribution) in SEARCH_SPACE {
        let value = match distribution {
            Distribution::Int { low, high } => ParamValue::Int(trial.suggest_int(name, low, high)?),
            Distribution::Float { low, high } => {
                ParamValue::Float(trial.suggest_float(name, low, high)?)
            }
        };
        params.set(name, value)?;
    }
    Ok(params)
}

/// Mean stratified k-fold ROC-AUC of one ensemble configuration on a fixed matrix.
pub fn cross_validated_auc(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    num_folds: usize,
    params: &EnsembleParams,
) -> Result<f64, SearchError> {
    let folds = StratifiedKFold::new(num_folds).split(y)?;
    let mut total = 0.0f64;
    for fold in &folds {
        let x_train = x.select(Axis(0), &fold.train);
        let y_train: Vec<u8> = fold.train.iter().map(|&row| y[row]).collect();
        let x_val = x.select(Axis(0), &fold.validation);
        let y_val: Vec<u8> = fold.validation.iter().map(|&row| y[row]).collect();

        let model = SoftVotingEnsemble::fit(x_train.view(), &y_train, params)?;
        let predicted = model.predict_proba(x_val.view())?;
        total += roc_auc(&y_val, &predicted.to_vec()).map_err(SearchError::Metric)?;
    }
    Ok(total / folds.len() as f64)
}

/// Study objective: sample an ensemble and score it by [`SEARCH_FOLDS`]-fold ROC-AUC.
pub fn ensemble_objective<'a>(
    x: ArrayView2<'a, f64>,
    y: &'a [u8],
) -> impl FnMut(&mut Trial<'_>) -> Result<f64, SearchError> + 'a {
    move |trial| {
        let params = suggest_ensemble_params(trial)?;
        cross_validated_auc(x, y, SEARCH_FOLDS, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::churn::folds::FoldError;
    use crate::churn::search::sampler::RandomSampler;
    use crate::churn::test_support::tiny_params;
    use ndarray::Array2;

    #[test]
    fn suggestions_cover_the_whole_space() {
        let mut sampler = RandomSampler::new(8);
        let mut trial = Trial::new(0, &mut sampler, &[]);
        let params = suggest_ensemble_params(&mut trial).unwrap();
        assert_eq!(trial.params().len(), SEARCH_SPACE.len());
        assert!((500..=2500).contains(&params.lgbm.n_estimators));
        assert!((1..=10).contains(&params.cat.depth));
        assert!((0.1..=5.0).contains(&params.vc.cat_weight));
        assert_eq!(
            trial.params()["vc__cat_weight"].as_f64(),
            params.vc.cat_weight
        );
    }

    #[test]
    fn cross_validated_auc_scores_a_learnable_problem() {
        let x = Array2::from_shape_fn((60, 2), |(row, col)| ((row * 7 + col * 3) % 60) as f64);
        let y: Vec<u8> = (0..60).map(|row| u8::from((row * 7) % 60 >= 30)).collect();
        let auc = cross_validated_auc(x.view(), &y, 3, &tiny_params()).unwrap();
        assert!(auc > 0.9, "auc {auc}");
    }

    #[test]
    fn objective_always_scores_with_five_folds() {
        // Four members per class: enough for three folds, too few for five.
        let x = Array2::from_shape_fn((8, 2), |(row, col)| (row + col) as f64);
        let y: [u8; 8] = [0, 1, 0, 1, 0, 1, 0, 1];
        assert!(StratifiedKFold::new(3).split(&y).is_ok());

        let mut sampler = RandomSampler::new(2);
        let mut trial = Trial::new(0, &mut sampler, &[]);
        let mut objective = ensemble_objective(x.view(), &y);
        let err = objective(&mut trial).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Fold(FoldError::TooFewClassMembers {
                n_splits: SEARCH_FOLDS,
                largest_class: 4,
            })
        ));
    }
}
