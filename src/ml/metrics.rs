//! Evaluation metrics for classification models.

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    /// Number of correct and incorrect predictions recorded so far.
    pub fn right_wrong(&self) -> (u64, u64) {
        let mut right = 0u64;
        let mut total = 0u64;
        for truth in 0..self.n_classes {
            for predicted in 0..self.n_classes {
                let v = self.get(truth, predicted) as u64;
                total += v;
                if truth == predicted {
                    right += v;
                }
            }
        }
        (right, total - right)
    }
}

#[derive(Debug, Clone)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let (right, wrong) = cm.right_wrong();
    let total = right + wrong;
    if total == 0 {
        0.0
    } else {
        (right as f32) / (total as f32)
    }
}

/// Accuracy of hard labels derived from positive-class probabilities.
///
/// A row is predicted positive only when `p > 1 - p`, so an exact `0.5`
/// resolves to the negative class.
pub fn binary_accuracy(labels: &[u8], positive_proba: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(positive_proba)
        .filter(|&(&label, &p)| {
            let predicted = u8::from(p > 1.0 - p);
            predicted == label
        })
        .count();
    correct as f64 / labels.len() as f64
}

/// Area under the ROC curve from binary labels and scores.
///
/// Uses the rank-sum (Mann-Whitney U) form with average ranks for tied scores.
/// Fails when only one class is present, since the curve is undefined.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64, String> {
    if labels.len() != scores.len() {
        return Err(format!(
            "Label/score length mismatch: {} vs {}",
            labels.len(),
            scores.len()
        ));
    }
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err("Only one class present in labels; ROC AUC is undefined".to_string());
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0f64;
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; tied block [start, end) shares the mean rank.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            if labels[idx] == 1 {
                pos_rank_sum += avg_rank;
            }
        }
        start = end;
    }

    let n_pos_f = n_pos as f64;
    let u = pos_rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Ok(u / (n_pos_f * n_neg as f64))
}
