use ndarray::ArrayView1;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Tree has no nodes")]
    NoNodes,
    #[error("Node {node} splits on feature {feature} but model has {n_features}")]
    FeatureOutOfRange {
        node: usize,
        feature: u32,
        n_features: usize,
    },
    #[error("Node {node} has invalid child index {child}")]
    InvalidChild { node: usize, child: usize },
}

/// Node of a binary regression tree; children are indices into [`Tree::nodes`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Split {
        feature: u32,
        /// Rows with `value <= threshold` (or `NaN`) go left.
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        /// Shrunk output added to the raw score.
        value: f64,
    },
}

/// Regression tree with the root at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row[*feature as usize];
                    idx = if v.is_nan() || v <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Check child indices and feature bounds so traversal cannot loop or panic.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeError> {
        if self.nodes.is_empty() {
            return Err(TreeError::NoNodes);
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature as usize >= n_features {
                    return Err(TreeError::FeatureOutOfRange {
                        node: idx,
                        feature: *feature,
                        n_features,
                    });
                }
                for child in [*left as usize, *right as usize] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(TreeError::InvalidChild { node: idx, child });
                    }
                }
            }
        }
        Ok(())
    }
}
