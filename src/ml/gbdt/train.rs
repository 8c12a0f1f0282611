use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use super::GbdtError;
use super::binning::{BinMapper, MAX_BINS};
use super::grow::{GrowContext, grow_depth_wise, grow_leaf_wise, grow_oblivious};
use super::histogram::SplitParams;
use super::model::{GbdtModel, sigmoid};

/// How each boosting round grows its tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthPolicy {
    /// Best-first growth; `max_depth == 0` means unlimited depth.
    LeafWise { num_leaves: usize, max_depth: usize },
    /// Level-by-level growth.
    DepthWise { max_depth: usize },
    /// Symmetric trees sharing one split per level.
    Oblivious { depth: usize },
}

/// Training hyperparameters for binary log-loss boosting.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf.
    pub learning_rate: f64,
    pub policy: GrowthPolicy,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// L1 penalty on leaf weights.
    pub reg_alpha: f64,
    /// Minimum loss reduction for a split.
    pub gamma: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    /// Minimum rows per child.
    pub min_child_samples: usize,
    /// Row sampling fraction per bagging round.
    pub subsample: f64,
    /// Resample rows every `subsample_freq` rounds; 0 disables row sampling.
    pub subsample_freq: usize,
    /// Feature sampling fraction per tree.
    pub colsample_bytree: f64,
    /// Feature sampling fraction per level (oblivious trees only).
    pub colsample_bylevel: f64,
    /// Upper bound on histogram bins per feature.
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            policy: GrowthPolicy::DepthWise { max_depth: 6 },
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            min_child_weight: 1e-3,
            min_child_samples: 1,
            subsample: 1.0,
            subsample_freq: 0,
            colsample_bytree: 1.0,
            colsample_bylevel: 1.0,
            max_bins: MAX_BINS,
            seed: 0,
        }
    }
}

const MIN_HESSIAN: f64 = 1e-16;

/// Train a binary classifier with Newton boosting on binned features.
///
/// `y` holds 0/1 labels aligned with the rows of `x`.
pub fn train_gbdt(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    options: &TrainOptions,
) -> Result<GbdtModel, GbdtError> {
    if x.nrows() != y.len() {
        return Err(GbdtError::MismatchedRows {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if y.is_empty() {
        return Err(GbdtError::EmptyDataset);
    }
    if x.ncols() == 0 {
        return Err(GbdtError::NoFeatures);
    }
    if let Some(&bad) = y.iter().find(|&&label| label > 1) {
        return Err(GbdtError::InvalidLabel(bad));
    }
    if !(options.learning_rate > 0.0) {
        return Err(GbdtError::InvalidLearningRate(options.learning_rate));
    }

    let n = y.len();
    let mapper = BinMapper::fit(x, options.max_bins);
    let binned = mapper.transform(x);
    let params = SplitParams {
        lambda: options.reg_lambda,
        alpha: options.reg_alpha,
        gamma: options.gamma,
        min_child_weight: options.min_child_weight,
        min_child_samples: options.min_child_samples,
    };

    let init_raw = match options.policy {
        GrowthPolicy::Oblivious { .. } => 0.0,
        _ => prior_logit(y),
    };
    let mut raw = vec![init_raw; n];
    let mut grad = vec![0.0f64; n];
    let mut hess = vec![0.0f64; n];
    let mut rng = StdRng::seed_from_u64(options.seed);
    let all_features: Vec<usize> = (0..x.ncols()).collect();
    let all_rows: Vec<u32> = (0..n as u32).collect();
    let mut bag = all_rows.clone();

    let mut trees = Vec::with_capacity(options.n_estimators);
    for round in 0..options.n_estimators {
        for i in 0..n {
            let p = sigmoid(raw[i]);
            grad[i] = p - f64::from(y[i]);
            hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
        }
        let bagging = options.subsample < 1.0 && options.subsample_freq > 0;
        if bagging && round % options.subsample_freq == 0 {
            bag = sample_rows(&mut rng, n, options.subsample);
        }
        let rows = if bagging { bag.clone() } else { all_rows.clone() };
        let features = sample_features(&mut rng, &all_features, options.colsample_bytree);

        let ctx = GrowContext {
            binned: &binned,
            mapper: &mapper,
            grad: &grad,
            hess: &hess,
            params,
            learning_rate: options.learning_rate,
        };
        let tree = match options.policy {
            GrowthPolicy::LeafWise {
                num_leaves,
                max_depth,
            } => grow_leaf_wise(&ctx, rows, &features, num_leaves, max_depth),
            GrowthPolicy::DepthWise { max_depth } => {
                grow_depth_wise(&ctx, rows, &features, max_depth)
            }
            GrowthPolicy::Oblivious { depth } => grow_oblivious(
                &ctx,
                rows,
                &features,
                depth,
                options.colsample_bylevel,
                &mut rng,
            ),
        };
        for (i, row) in x.rows().into_iter().enumerate() {
            raw[i] += tree.predict_row(row);
        }
        trees.push(tree);
    }

    let model = GbdtModel {
        feature_len: x.ncols(),
        init_raw,
        trees,
    };
    model.validate()?;
    Ok(model)
}

fn prior_logit(y: &[u8]) -> f64 {
    let positives = y.iter().filter(|&&label| label == 1).count();
    let p = (positives as f64 / y.len() as f64).clamp(1e-15, 1.0 - 1e-15);
    (p / (1.0 - p)).ln()
}

fn sample_rows(rng: &mut StdRng, n: usize, fraction: f64) -> Vec<u32> {
    let rows: Vec<u32> = (0..n as u32)
        .filter(|_| rng.random::<f64>() < fraction)
        .collect();
    if rows.is_empty() {
        (0..n as u32).collect()
    } else {
        rows
    }
}

/// Random subset of `features` keeping at least one, in ascending order.
pub(super) fn sample_features(rng: &mut StdRng, features: &[usize], fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 || features.len() <= 1 {
        return features.to_vec();
    }
    let amount = ((fraction * features.len() as f64).round() as usize).clamp(1, features.len());
    let mut picked = rand::seq::index::sample(rng, features.len(), amount).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|idx| features[idx]).collect()
}
