use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;

use super::binning::{BinMapper, BinnedMatrix};
use super::histogram::{
    NodeStats, SplitCandidate, SplitParams, best_split_for_feature, cumulative_histogram,
};
use super::train::sample_features;
use super::tree::{Node, Tree};

/// Everything a grower needs for one boosting round.
pub(super) struct GrowContext<'a> {
    pub binned: &'a BinnedMatrix,
    pub mapper: &'a BinMapper,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    pub params: SplitParams,
    pub learning_rate: f64,
}

impl GrowContext<'_> {
    fn stats(&self, rows: &[u32]) -> NodeStats {
        NodeStats::from_rows(rows, self.grad, self.hess)
    }

    fn leaf(&self, stats: &NodeStats) -> Node {
        Node::Leaf {
            value: self.learning_rate * self.params.leaf_weight(stats),
        }
    }

    fn cumulative(&self, feature: usize, rows: &[u32]) -> Vec<NodeStats> {
        cumulative_histogram(
            self.binned.feature(feature),
            rows,
            self.grad,
            self.hess,
            self.mapper.n_bins(feature),
        )
    }

    fn best_split(&self, rows: &[u32], parent: &NodeStats, features: &[usize]) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        for &feature in features {
            let cumulative = self.cumulative(feature, rows);
            if let Some(split) = best_split_for_feature(&cumulative, parent, feature, &self.params) {
                if best.is_none_or(|current| split.gain > current.gain) {
                    best = Some(split);
                }
            }
        }
        best
    }

    fn partition(&self, rows: Vec<u32>, feature: usize, bin: usize) -> (Vec<u32>, Vec<u32>) {
        let bins = self.binned.feature(feature);
        rows.into_iter()
            .partition(|&row| bins[row as usize] as usize <= bin)
    }

    fn split_node(&self, feature: usize, bin: usize, left: usize) -> Node {
        Node::Split {
            feature: feature as u32,
            threshold: self.mapper.threshold(feature, bin),
            left: left as u32,
            right: (left + 1) as u32,
        }
    }
}

struct PendingLeaf {
    node: usize,
    rows: Vec<u32>,
    depth: usize,
    split: SplitCandidate,
}

/// Best-first growth: always split the leaf with the largest gain.
///
/// `max_depth == 0` leaves depth unbounded; `num_leaves` caps the leaf count.
pub(super) fn grow_leaf_wise(
    ctx: &GrowContext<'_>,
    rows: Vec<u32>,
    features: &[usize],
    num_leaves: usize,
    max_depth: usize,
) -> Tree {
    let depth_ok = |depth: usize| max_depth == 0 || depth < max_depth;
    let root = ctx.stats(&rows);
    let mut nodes = vec![ctx.leaf(&root)];
    let mut pending: Vec<Option<PendingLeaf>> = Vec::new();
    let mut heap: BinaryHeap<(OrderedFloat<f64>, Reverse<usize>)> = BinaryHeap::new();

    let enqueue = |pending: &mut Vec<Option<PendingLeaf>>,
                       heap: &mut BinaryHeap<(OrderedFloat<f64>, Reverse<usize>)>,
                       node: usize,
                       rows: Vec<u32>,
                       stats: NodeStats,
                       depth: usize| {
        if !depth_ok(depth) {
            return;
        }
        if let Some(split) = ctx.best_split(&rows, &stats, features) {
            heap.push((OrderedFloat(split.gain), Reverse(pending.len())));
            pending.push(Some(PendingLeaf {
                node,
                rows,
                depth,
                split,
            }));
        }
    };
    enqueue(&mut pending, &mut heap, 0, rows, root, 0);

    let mut n_leaves = 1usize;
    while n_leaves < num_leaves {
        let Some((_, Reverse(slot))) = heap.pop() else {
            break;
        };
        let Some(leaf) = pending[slot].take() else {
            continue;
        };
        let split = leaf.split;
        let (left_rows, right_rows) = ctx.partition(leaf.rows, split.feature, split.bin);
        let left = nodes.len();
        nodes.push(ctx.leaf(&split.left));
        nodes.push(ctx.leaf(&split.right));
        nodes[leaf.node] = ctx.split_node(split.feature, split.bin, left);
        n_leaves += 1;

        enqueue(&mut pending, &mut heap, left, left_rows, split.left, leaf.depth + 1);
        enqueue(&mut pending, &mut heap, left + 1, right_rows, split.right, leaf.depth + 1);
    }
    Tree { nodes }
}

/// Level-by-level growth down to `max_depth`.
pub(super) fn grow_depth_wise(
    ctx: &GrowContext<'_>,
    rows: Vec<u32>,
    features: &[usize],
    max_depth: usize,
) -> Tree {
    let root = ctx.stats(&rows);
    let mut nodes = vec![ctx.leaf(&root)];
    let mut frontier = vec![(0usize, rows, root)];
    for _depth in 0..max_depth {
        let mut next = Vec::new();
        for (node, rows, stats) in frontier {
            let Some(split) = ctx.best_split(&rows, &stats, features) else {
                continue;
            };
            let (left_rows, right_rows) = ctx.partition(rows, split.feature, split.bin);
            let left = nodes.len();
            nodes.push(ctx.leaf(&split.left));
            nodes.push(ctx.leaf(&split.right));
            nodes[node] = ctx.split_node(split.feature, split.bin, left);
            next.push((left, left_rows, split.left));
            next.push((left + 1, right_rows, split.right));
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Tree { nodes }
}

/// Symmetric growth: every node on a level shares one `(feature, bin)` split.
///
/// Candidate features are resampled per level with `colsample_bylevel`.
pub(super) fn grow_oblivious(
    ctx: &GrowContext<'_>,
    rows: Vec<u32>,
    features: &[usize],
    depth: usize,
    colsample_bylevel: f64,
    rng: &mut StdRng,
) -> Tree {
    let mut leaves = vec![rows];
    let mut levels: Vec<(usize, usize)> = Vec::new();

    for _level in 0..depth {
        let level_features = sample_features(rng, features, colsample_bylevel);
        let parents: Vec<NodeStats> = leaves.iter().map(|rows| ctx.stats(rows)).collect();
        let Some((feature, bin)) = best_level_split(ctx, &leaves, &parents, &level_features) else {
            break;
        };
        let mut next = Vec::with_capacity(leaves.len() * 2);
        for rows in leaves {
            let (left, right) = ctx.partition(rows, feature, bin);
            next.push(left);
            next.push(right);
        }
        leaves = next;
        levels.push((feature, bin));
    }

    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut current = vec![0usize];
    for &(feature, bin) in &levels {
        let mut next = Vec::with_capacity(current.len() * 2);
        for node in current {
            let left = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[node] = ctx.split_node(feature, bin, left);
            next.push(left);
            next.push(left + 1);
        }
        current = next;
    }
    for (node, rows) in current.into_iter().zip(&leaves) {
        nodes[node] = ctx.leaf(&ctx.stats(rows));
    }
    Tree { nodes }
}

fn best_level_split(
    ctx: &GrowContext<'_>,
    leaves: &[Vec<u32>],
    parents: &[NodeStats],
    features: &[usize],
) -> Option<(usize, usize)> {
    let params = &ctx.params;
    let mut best: Option<(f64, usize, usize)> = None;
    for &feature in features {
        let cumulative: Vec<Vec<NodeStats>> = leaves
            .iter()
            .map(|rows| ctx.cumulative(feature, rows))
            .collect();
        for bin in 0..ctx.mapper.n_bins(feature).saturating_sub(1) {
            let mut total = 0.0f64;
            let mut admissible = true;
            for (leaf_cumulative, parent) in cumulative.iter().zip(parents) {
                if parent.count == 0 {
                    continue;
                }
                let left = leaf_cumulative[bin];
                let right = parent.minus(&left);
                // Empty children are allowed; oblivious trees cannot skip a leaf.
                let too_small = |child: &NodeStats| {
                    child.count > 0 && child.count < params.min_child_samples
                };
                if too_small(&left) || too_small(&right) {
                    admissible = false;
                    break;
                }
                total += 0.5 * (params.score(&left) + params.score(&right) - params.score(parent));
            }
            total -= params.gamma;
            if admissible && total > 1e-12 && best.is_none_or(|(gain, _, _)| total > gain) {
                best = Some((total, feature, bin));
            }
        }
    }
    best.map(|(_, feature, bin)| (feature, bin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};
    use rand::SeedableRng;

    struct Fixture {
        mapper: BinMapper,
        binned: BinnedMatrix,
        grad: Vec<f64>,
        hess: Vec<f64>,
    }

    // Label depends on feature 0 only; feature 1 is noise.
    fn fixture() -> Fixture {
        let x: Array2<f64> = array![
            [0.0, 3.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [3.0, 0.0],
            [4.0, 3.0],
            [5.0, 1.0],
            [6.0, 0.0],
            [7.0, 2.0],
        ];
        let y = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let mapper = BinMapper::fit(x.view(), 255);
        let binned = mapper.transform(x.view());
        let grad = y.iter().map(|&y| 0.5 - y).collect();
        Fixture {
            mapper,
            binned,
            grad,
            hess: vec![0.25; 8],
        }
    }

    fn ctx(fixture: &Fixture) -> GrowContext<'_> {
        GrowContext {
            binned: &fixture.binned,
            mapper: &fixture.mapper,
            grad: &fixture.grad,
            hess: &fixture.hess,
            params: SplitParams {
                lambda: 0.0,
                alpha: 0.0,
                gamma: 0.0,
                min_child_weight: 0.0,
                min_child_samples: 1,
            },
            learning_rate: 1.0,
        }
    }

    fn all_rows() -> Vec<u32> {
        (0..8).collect()
    }

    #[test]
    fn depth_wise_splits_on_informative_feature() {
        let fixture = fixture();
        let tree = grow_depth_wise(&ctx(&fixture), all_rows(), &[0, 1], 1);
        match &tree.nodes[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 3.0);
            }
            other => panic!("expected split, got {other:?}"),
        }
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(array![0.0, 0.0].view()), -2.0);
        assert_eq!(tree.predict_row(array![7.0, 0.0].view()), 2.0);
    }

    #[test]
    fn leaf_wise_respects_leaf_budget() {
        let fixture = fixture();
        let tree = grow_leaf_wise(&ctx(&fixture), all_rows(), &[0, 1], 2, 0);
        assert_eq!(tree.n_leaves(), 2);
        assert!(tree.validate(2).is_ok());
    }

    #[test]
    fn pure_leaves_stop_growth() {
        let fixture = fixture();
        let tree = grow_leaf_wise(&ctx(&fixture), all_rows(), &[0, 1], 31, 0);
        // After the first split both children are pure; no further gain exists.
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn oblivious_tree_is_complete() {
        let fixture = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        let tree = grow_oblivious(&ctx(&fixture), all_rows(), &[0, 1], 1, 1.0, &mut rng);
        assert_eq!(tree.n_leaves(), 2);
        assert!(tree.validate(2).is_ok());
        assert!(tree.predict_row(array![0.0, 0.0].view()) < 0.0);
        assert!(tree.predict_row(array![7.0, 0.0].view()) > 0.0);
    }
}
