use ndarray::{Array1, ArrayView1, ArrayView2};

use super::GbdtError;
use super::tree::Tree;

/// Gradient-boosted tree model for binary classification.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    /// Number of `f64` values per feature row.
    pub feature_len: usize,
    /// Raw log-odds before any tree is applied.
    pub init_raw: f64,
    pub trees: Vec<Tree>,
}

impl GbdtModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), GbdtError> {
        if self.feature_len == 0 {
            return Err(GbdtError::NoFeatures);
        }
        if !self.init_raw.is_finite() {
            return Err(GbdtError::NonFiniteInit(self.init_raw));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_len)
                .map_err(|source| GbdtError::InvalidTree { tree: idx, source })?;
        }
        Ok(())
    }

    /// Raw log-odds for one feature row.
    pub fn predict_raw(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.init_raw + self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>()
    }

    /// Positive-class probability for every row of `x`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, GbdtError> {
        if x.ncols() != self.feature_len {
            return Err(GbdtError::FeatureCount {
                expected: self.feature_len,
                found: x.ncols(),
            });
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| sigmoid(self.predict_raw(row)))
            .collect())
    }
}

pub fn sigmoid(raw: f64) -> f64 {
    if raw >= 0.0 {
        1.0 / (1.0 + (-raw).exp())
    } else {
        let e = raw.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::gbdt::{Node, TreeError};
    use ndarray::array;

    fn model() -> GbdtModel {
        GbdtModel {
            feature_len: 1,
            init_raw: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 1,
                        right: 2,
                    },
                    Node::Leaf { value: -2.0 },
                    Node::Leaf { value: 2.0 },
                ],
            }],
        }
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn predicts_through_trees_and_checks_width() {
        let model = model();
        let proba = model.predict_proba(array![[-1.0], [1.0]].view()).unwrap();
        assert!((proba[0] - sigmoid(-2.0)).abs() < 1e-12);
        assert!((proba[1] - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(
            model.predict_proba(array![[1.0, 2.0]].view()).unwrap_err(),
            GbdtError::FeatureCount {
                expected: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn validate_names_the_broken_tree() {
        let mut model = model();
        model.trees.push(Tree { nodes: Vec::new() });
        assert_eq!(
            model.validate(),
            Err(GbdtError::InvalidTree {
                tree: 1,
                source: TreeError::NoNodes,
            })
        );
    }
}
