//! Three boosted members averaged by weighted soft voting.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ml::gbdt::{GbdtError, GbdtModel, GrowthPolicy, TrainOptions, train_gbdt};
use crate::ml::metrics::binary_accuracy;

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("Unknown hyperparameter {key}")]
    UnknownParameter { key: String },
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Voting weights must sum to a positive value")]
    ZeroWeights,
    #[error("{member} failed: {source}")]
    Member {
        member: &'static str,
        #[source]
        source: GbdtError,
    },
}

/// A sampled or configured hyperparameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    fn as_count(self, key: &str) -> Result<usize, EnsembleError> {
        let value = self.as_f64();
        if value < 0.0 || value.fract() != 0.0 {
            return Err(EnsembleError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a non-negative integer, got {value}"),
            });
        }
        Ok(value as usize)
    }

    fn as_fraction(self, key: &str) -> Result<f64, EnsembleError> {
        let value = self.as_f64();
        if !(value > 0.0 && value <= 1.0) {
            return Err(EnsembleError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a value in (0, 1], got {value}"),
            });
        }
        Ok(value)
    }

    fn as_non_negative(self, key: &str) -> Result<f64, EnsembleError> {
        let value = self.as_f64();
        if !(value >= 0.0) {
            return Err(EnsembleError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a non-negative value, got {value}"),
            });
        }
        Ok(value)
    }
}

/// Leaf-wise member (`lgbm__*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LgbmParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// 0 leaves depth unbounded.
    pub max_depth: usize,
    pub num_leaves: usize,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub subsample: f64,
    /// Row subsampling only happens when this is positive.
    pub subsample_freq: usize,
    pub colsample_bytree: f64,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub random_state: u64,
}

impl Default for LgbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 960,
            learning_rate: 0.04531704129811222,
            max_depth: 6,
            num_leaves: 803,
            reg_alpha: 0.4132098753297654,
            reg_lambda: 0.9992674466487466,
            subsample: 0.4604756677696442,
            subsample_freq: 0,
            colsample_bytree: 0.465375841230126,
            min_child_samples: 20,
            min_child_weight: 1e-3,
            random_state: 503,
        }
    }
}

impl LgbmParams {
    fn train_options(&self) -> TrainOptions {
        TrainOptions {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            policy: GrowthPolicy::LeafWise {
                num_leaves: self.num_leaves,
                max_depth: self.max_depth,
            },
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
            min_child_weight: self.min_child_weight,
            min_child_samples: self.min_child_samples,
            subsample: self.subsample,
            subsample_freq: self.subsample_freq,
            colsample_bytree: self.colsample_bytree,
            seed: self.random_state,
            ..TrainOptions::default()
        }
    }

    fn set(&mut self, key: &str, param: &str, value: ParamValue) -> Result<(), EnsembleError> {
        match param {
            "n_estimators" => self.n_estimators = value.as_count(key)?,
            "learning_rate" => self.learning_rate = value.as_fraction(key)?,
            "max_depth" => self.max_depth = value.as_count(key)?,
            "num_leaves" => self.num_leaves = value.as_count(key)?.max(2),
            "reg_alpha" => self.reg_alpha = value.as_non_negative(key)?,
            "reg_lambda" => self.reg_lambda = value.as_non_negative(key)?,
            "subsample" => self.subsample = value.as_fraction(key)?,
            "subsample_freq" => self.subsample_freq = value.as_count(key)?,
            "colsample_bytree" => self.colsample_bytree = value.as_fraction(key)?,
            "min_child_samples" => self.min_child_samples = value.as_count(key)?,
            "min_child_weight" => self.min_child_weight = value.as_non_negative(key)?,
            "random_state" => self.random_state = value.as_count(key)? as u64,
            _ => return Err(unknown(key)),
        }
        Ok(())
    }
}

/// Depth-wise member (`xgb__*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgbParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub gamma: f64,
    pub random_state: u64,
}

impl Default for XgbParams {
    fn default() -> Self {
        Self {
            n_estimators: 973,
            learning_rate: 0.0786311558099196,
            max_depth: 9,
            subsample: 0.6451633803299511,
            colsample_bytree: 0.20800229296622322,
            min_child_weight: 11.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            random_state: 503,
        }
    }
}

impl XgbParams {
    fn train_options(&self) -> TrainOptions {
        TrainOptions {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            policy: GrowthPolicy::DepthWise {
                max_depth: self.max_depth,
            },
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
            gamma: self.gamma,
            min_child_weight: self.min_child_weight,
            min_child_samples: 1,
            subsample: self.subsample,
            subsample_freq: 1,
            colsample_bytree: self.colsample_bytree,
            seed: self.random_state,
            ..TrainOptions::default()
        }
    }

    fn set(&mut self, key: &str, param: &str, value: ParamValue) -> Result<(), EnsembleError> {
        match param {
            "n_estimators" => self.n_estimators = value.as_count(key)?,
            "learning_rate" => self.learning_rate = value.as_fraction(key)?,
            "max_depth" => self.max_depth = value.as_count(key)?,
            "subsample" => self.subsample = value.as_fraction(key)?,
            "colsample_bytree" => self.colsample_bytree = value.as_fraction(key)?,
            "min_child_weight" => self.min_child_weight = value.as_non_negative(key)?,
            "reg_lambda" => self.reg_lambda = value.as_non_negative(key)?,
            "reg_alpha" => self.reg_alpha = value.as_non_negative(key)?,
            "gamma" => self.gamma = value.as_non_negative(key)?,
            "random_state" => self.random_state = value.as_count(key)? as u64,
            _ => return Err(unknown(key)),
        }
        Ok(())
    }
}

/// Oblivious-tree member (`cat__*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatParams {
    pub iterations: usize,
    pub learning_rate: f64,
    pub depth: usize,
    pub subsample: f64,
    pub colsample_bylevel: f64,
    pub min_data_in_leaf: usize,
    pub l2_leaf_reg: f64,
    pub random_state: u64,
}

impl Default for CatParams {
    fn default() -> Self {
        Self {
            iterations: 1395,
            learning_rate: 0.025092883785253036,
            depth: 6,
            subsample: 0.32039321811073496,
            colsample_bylevel: 0.47765607925544096,
            min_data_in_leaf: 30,
            l2_leaf_reg: 3.0,
            random_state: 503,
        }
    }
}

impl CatParams {
    fn train_options(&self) -> TrainOptions {
        TrainOptions {
            n_estimators: self.iterations,
            learning_rate: self.learning_rate,
            policy: GrowthPolicy::Oblivious { depth: self.depth },
            reg_lambda: self.l2_leaf_reg,
            min_child_weight: 0.0,
            min_child_samples: self.min_data_in_leaf,
            subsample: self.subsample,
            subsample_freq: 1,
            colsample_bylevel: self.colsample_bylevel,
            seed: self.random_state,
            ..TrainOptions::default()
        }
    }

    fn set(&mut self, key: &str, param: &str, value: ParamValue) -> Result<(), EnsembleError> {
        match param {
            "iterations" => self.iterations = value.as_count(key)?,
            "learning_rate" => self.learning_rate = value.as_fraction(key)?,
            "depth" => self.depth = value.as_count(key)?,
            "subsample" => self.subsample = value.as_fraction(key)?,
            "colsample_bylevel" => self.colsample_bylevel = value.as_fraction(key)?,
            "min_data_in_leaf" => self.min_data_in_leaf = value.as_count(key)?,
            "l2_leaf_reg" => self.l2_leaf_reg = value.as_non_negative(key)?,
            "random_state" => self.random_state = value.as_count(key)? as u64,
            _ => return Err(unknown(key)),
        }
        Ok(())
    }
}

/// Soft-voting weights (`vc__*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingWeights {
    pub lgbm_weight: f64,
    pub xgb_weight: f64,
    pub cat_weight: f64,
}

impl Default for VotingWeights {
    fn default() -> Self {
        Self {
            lgbm_weight: 3.0146183474429327,
            xgb_weight: 0.5762900154092979,
            cat_weight: 1.5605382149604368,
        }
    }
}

impl VotingWeights {
    pub fn as_array(&self) -> [f64; 3] {
        [self.lgbm_weight, self.xgb_weight, self.cat_weight]
    }

    fn set(&mut self, key: &str, param: &str, value: ParamValue) -> Result<(), EnsembleError> {
        let value = value.as_non_negative(key)?;
        match param {
            "lgbm_weight" => self.lgbm_weight = value,
            "xgb_weight" => self.xgb_weight = value,
            "cat_weight" => self.cat_weight = value,
            _ => return Err(unknown(key)),
        }
        Ok(())
    }
}

/// Hyperparameters of every member plus the voting weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleParams {
    pub lgbm: LgbmParams,
    pub xgb: XgbParams,
    pub cat: CatParams,
    pub vc: VotingWeights,
}

impl EnsembleParams {
    /// Set one parameter addressed as `"<model>__<param>"`.
    pub fn set(&mut self, key: &str, value: ParamValue) -> Result<(), EnsembleError> {
        let Some((model, param)) = key.split_once("__") else {
            return Err(unknown(key));
        };
        match (model.trim(), param.trim()) {
            ("lgbm", param) => self.lgbm.set(key, param, value),
            ("xgb", param) => self.xgb.set(key, param, value),
            ("cat", param) => self.cat.set(key, param, value),
            ("vc", param) => self.vc.set(key, param, value),
            _ => Err(unknown(key)),
        }
    }

    /// Apply every override; stops at the first unknown or invalid key.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, ParamValue>,
    ) -> Result<(), EnsembleError> {
        for (key, &value) in overrides {
            self.set(key, value)?;
        }
        Ok(())
    }
}

fn unknown(key: &str) -> EnsembleError {
    EnsembleError::UnknownParameter {
        key: key.to_string(),
    }
}

/// Fitted ensemble: `p = sum(w_i * p_i) / sum(w_i)`.
#[derive(Debug, Clone)]
pub struct SoftVotingEnsemble {
    members: Vec<(&'static str, GbdtModel)>,
    weights: [f64; 3],
}

impl SoftVotingEnsemble {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[u8],
        params: &EnsembleParams,
    ) -> Result<Self, EnsembleError> {
        let weights = params.vc.as_array();
        if !(weights.iter().sum::<f64>() > 0.0) {
            return Err(EnsembleError::ZeroWeights);
        }
        let specs = [
            ("lgbm", params.lgbm.train_options()),
            ("xgb", params.xgb.train_options()),
            ("cat", params.cat.train_options()),
        ];
        let mut members = Vec::with_capacity(specs.len());
        for (member, options) in specs {
            let model = train_gbdt(x, y, &options)
                .map_err(|source| EnsembleError::Member { member, source })?;
            debug!(member, trees = model.trees.len(), "Fitted ensemble member");
            members.push((member, model));
        }
        Ok(Self { members, weights })
    }

    /// Weighted positive-class probability per row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EnsembleError> {
        let total: f64 = self.weights.iter().sum();
        let mut blended = Array1::zeros(x.nrows());
        for ((member, model), weight) in self.members.iter().zip(self.weights) {
            let proba = model
                .predict_proba(x)
                .map_err(|source| EnsembleError::Member {
                    member: *member,
                    source,
                })?;
            blended.scaled_add(weight / total, &proba);
        }
        Ok(blended)
    }

    /// Accuracy of the argmax class; an exact tie predicts class 0.
    pub fn score(&self, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<f64, EnsembleError> {
        let proba = self.predict_proba(x)?;
        Ok(binary_accuracy(y, &proba.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::churn::test_support::tiny_params;
    use ndarray::Array2;

    #[test]
    fn overrides_route_by_namespace() {
        let mut params = EnsembleParams::default();
        let overrides = BTreeMap::from([
            ("lgbm__num_leaves".to_string(), ParamValue::Int(31)),
            ("xgb__learning_rate".to_string(), ParamValue::Float(0.05)),
            ("cat__depth".to_string(), ParamValue::Int(4)),
            ("vc__cat_weight".to_string(), ParamValue::Float(2.5)),
        ]);
        params.apply_overrides(&overrides).unwrap();
        assert_eq!(params.lgbm.num_leaves, 31);
        assert_eq!(params.xgb.learning_rate, 0.05);
        assert_eq!(params.cat.depth, 4);
        assert_eq!(params.vc.as_array()[2], 2.5);
        assert_eq!(params.lgbm.n_estimators, 960);
    }

    #[test]
    fn unknown_keys_are_errors() {
        let mut params = EnsembleParams::default();
        for key in ["svm__c", "lgbm__unknown", "vc___weight", "learning_rate"] {
            assert!(matches!(
                params.set(key, ParamValue::Float(1.0)),
                Err(EnsembleError::UnknownParameter { .. })
            ));
        }
        assert!(matches!(
            params.set("xgb__max_depth", ParamValue::Float(2.5)),
            Err(EnsembleError::InvalidValue { .. })
        ));
    }

    #[test]
    fn params_round_trip_through_json_values() {
        let value: ParamValue = serde_json::from_str("7").unwrap();
        assert_eq!(value, ParamValue::Int(7));
        let value: ParamValue = serde_json::from_str("0.25").unwrap();
        assert_eq!(value, ParamValue::Float(0.25));
    }

    #[test]
    fn blends_members_by_weight() {
        let x = Array2::from_shape_fn((40, 2), |(row, col)| (row * (col + 1)) as f64);
        let y: Vec<u8> = (0..40).map(|row| u8::from(row >= 20)).collect();
        let mut params = tiny_params();
        let ensemble = SoftVotingEnsemble::fit(x.view(), &y, &params).unwrap();
        let blended = ensemble.predict_proba(x.view()).unwrap();
        let members: Vec<Array1<f64>> = ensemble
            .members
            .iter()
            .map(|(_, model)| model.predict_proba(x.view()).unwrap())
            .collect();
        let w = params.vc.as_array();
        let total: f64 = w.iter().sum();
        for row in 0..40 {
            let expected =
                (w[0] * members[0][row] + w[1] * members[1][row] + w[2] * members[2][row]) / total;
            assert!((blended[row] - expected).abs() < 1e-12);
        }
        assert!(ensemble.score(x.view(), &y).unwrap() > 0.9);

        params.vc = VotingWeights {
            lgbm_weight: 0.0,
            xgb_weight: 0.0,
            cat_weight: 0.0,
        };
        assert!(matches!(
            SoftVotingEnsemble::fit(x.view(), &y, &params),
            Err(EnsembleError::ZeroWeights)
        ));
    }
}
