/// Gradient/hessian totals for a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(super) struct NodeStats {
    pub grad: f64,
    pub hess: f64,
    pub count: usize,
}

impl NodeStats {
    pub fn from_rows(rows: &[u32], grad: &[f64], hess: &[f64]) -> Self {
        let mut stats = Self::default();
        for &row in rows {
            stats.grad += grad[row as usize];
            stats.hess += hess[row as usize];
        }
        stats.count = rows.len();
        stats
    }

    pub fn minus(&self, other: &Self) -> Self {
        Self {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

/// Regularization and child-size limits shared by every growth policy.
#[derive(Debug, Clone, Copy)]
pub(super) struct SplitParams {
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// L1 penalty on leaf weights.
    pub alpha: f64,
    /// Minimum gain for a split to be kept.
    pub gamma: f64,
    pub min_child_weight: f64,
    pub min_child_samples: usize,
}

impl SplitParams {
    fn thresholded_grad(&self, grad: f64) -> f64 {
        if grad > self.alpha {
            grad - self.alpha
        } else if grad < -self.alpha {
            grad + self.alpha
        } else {
            0.0
        }
    }

    /// Structure score `soft(G)^2 / (H + lambda)`.
    pub fn score(&self, stats: &NodeStats) -> f64 {
        let g = self.thresholded_grad(stats.grad);
        g * g / (stats.hess + self.lambda)
    }

    /// Newton step for a leaf, before shrinkage.
    pub fn leaf_weight(&self, stats: &NodeStats) -> f64 {
        if stats.count == 0 {
            return 0.0;
        }
        -self.thresholded_grad(stats.grad) / (stats.hess + self.lambda)
    }

    /// Loss reduction of splitting `parent` into `left` and `right`.
    pub fn gain(&self, parent: &NodeStats, left: &NodeStats, right: &NodeStats) -> f64 {
        0.5 * (self.score(left) + self.score(right) - self.score(parent)) - self.gamma
    }

    pub fn child_allowed(&self, child: &NodeStats) -> bool {
        child.count >= self.min_child_samples.max(1) && child.hess >= self.min_child_weight
    }
}

/// Cumulative (left-side) stats for each bin of one feature within one node.
pub(super) fn cumulative_histogram(
    bins: &[u8],
    rows: &[u32],
    grad: &[f64],
    hess: &[f64],
    n_bins: usize,
) -> Vec<NodeStats> {
    let mut hist = vec![NodeStats::default(); n_bins];
    for &row in rows {
        let row = row as usize;
        let slot = &mut hist[bins[row] as usize];
        slot.grad += grad[row];
        slot.hess += hess[row];
        slot.count += 1;
    }
    for b in 1..n_bins {
        let prev = hist[b - 1];
        let slot = &mut hist[b];
        slot.grad += prev.grad;
        slot.hess += prev.hess;
        slot.count += prev.count;
    }
    hist
}

#[derive(Debug, Clone, Copy)]
pub(super) struct SplitCandidate {
    pub feature: usize,
    /// Rows with bin `<= bin` go left.
    pub bin: usize,
    pub gain: f64,
    pub left: NodeStats,
    pub right: NodeStats,
}

/// Best admissible split of `parent` on `feature`, if any has positive gain.
pub(super) fn best_split_for_feature(
    cumulative: &[NodeStats],
    parent: &NodeStats,
    feature: usize,
    params: &SplitParams,
) -> Option<SplitCandidate> {
    let mut best: Option<SplitCandidate> = None;
    for bin in 0..cumulative.len().saturating_sub(1) {
        let left = cumulative[bin];
        let right = parent.minus(&left);
        if !params.child_allowed(&left) || !params.child_allowed(&right) {
            continue;
        }
        let gain = params.gain(parent, &left, &right);
        if gain > 1e-12 && best.is_none_or(|current| gain > current.gain) {
            best = Some(SplitCandidate {
                feature,
                bin,
                gain,
                left,
                right,
            });
        }
    }
    best
}
