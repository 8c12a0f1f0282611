use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprs::CsMat;

const OVERSAMPLES: usize = 10;
const POWER_ITERATIONS: usize = 5;

/// Rank-`k` projection of a sparse matrix via randomized range finding.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncatedSvd {
    /// `k x n_features`; rows are right singular vectors, zero past the matrix rank.
    components: Array2<f64>,
}

impl TruncatedSvd {
    pub fn fit(matrix: &CsMat<f64>, n_components: usize, seed: u64) -> Self {
        let (n_rows, n_cols) = (matrix.rows(), matrix.cols());
        let mut components = Array2::zeros((n_components, n_cols));
        let sketch = (n_components + OVERSAMPLES).min(n_rows).min(n_cols);
        if sketch == 0 {
            return Self { components };
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let omega = Array2::from_shape_fn((n_cols, sketch), |_| rng.random_range(-1.0..1.0));
        let mut q = orthonormalize(sparse_dot(matrix, &omega));
        for _ in 0..POWER_ITERATIONS {
            let z = orthonormalize(sparse_t_dot(matrix, &q));
            q = orthonormalize(sparse_dot(matrix, &z));
        }

        // B = Q^T A is small; its left singular vectors come from B B^T.
        let b_t = sparse_t_dot(matrix, &q);
        let gram = b_t.t().dot(&b_t);
        let (eigenvalues, eigenvectors) = symmetric_eigen(gram);
        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

        for (component, &idx) in order.iter().take(n_components).enumerate() {
            let lambda = eigenvalues[idx];
            if lambda <= 1e-12 {
                continue;
            }
            let mut v: Array1<f64> = b_t.dot(&eigenvectors.column(idx)) / lambda.sqrt();
            let pivot = v
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap_or(0.0);
            if pivot < 0.0 {
                v.mapv_inplace(|x| -x);
            }
            components.row_mut(component).assign(&v);
        }
        Self { components }
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Project rows of `matrix` onto the learned components.
    pub fn transform(&self, matrix: &CsMat<f64>) -> Array2<f64> {
        let projection = self.components.t().to_owned();
        sparse_dot(matrix, &projection)
    }
}

/// `A * dense` for a CSR matrix.
fn sparse_dot(matrix: &CsMat<f64>, dense: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((matrix.rows(), dense.ncols()));
    for (i, row) in matrix.outer_iterator().enumerate() {
        let mut out_row = out.row_mut(i);
        for (j, &value) in row.iter() {
            out_row.scaled_add(value, &dense.row(j));
        }
    }
    out
}

/// `A^T * dense` for a CSR matrix.
fn sparse_t_dot(matrix: &CsMat<f64>, dense: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((matrix.cols(), dense.ncols()));
    for (i, row) in matrix.outer_iterator().enumerate() {
        for (j, &value) in row.iter() {
            out.row_mut(j).scaled_add(value, &dense.row(i));
        }
    }
    out
}

/// Modified Gram-Schmidt on columns; dependent columns become zero.
fn orthonormalize(mut y: Array2<f64>) -> Array2<f64> {
    for k in 0..y.ncols() {
        for j in 0..k {
            let basis = y.column(j).to_owned();
            let projection = basis.dot(&y.column(k));
            y.column_mut(k).scaled_add(-projection, &basis);
        }
        let norm = y.column(k).dot(&y.column(k)).sqrt();
        if norm > 1e-10 {
            y.column_mut(k).mapv_inplace(|v| v / norm);
        } else {
            y.column_mut(k).fill(0.0);
        }
    }
    y
}

/// Cyclic Jacobi eigen-decomposition; eigenvectors are the returned columns.
fn symmetric_eigen(mut a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::eye(n);
    for _sweep in 0..64 {
        let off_diagonal: f64 = a
            .indexed_iter()
            .filter(|((p, q), _)| p != q)
            .map(|(_, x)| x * x)
            .sum();
        if off_diagonal < 1e-24 {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }
    (a.diag().to_vec(), v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn diagonal(values: &[f64]) -> CsMat<f64> {
        let mut triplets = TriMat::new((values.len(), values.len()));
        for (idx, &value) in values.iter().enumerate() {
            triplets.add_triplet(idx, idx, value);
        }
        triplets.to_csr()
    }

    #[test]
    fn jacobi_recovers_eigenpairs() {
        let (values, vectors) = symmetric_eigen(ndarray::array![[2.0, 1.0], [1.0, 2.0]]);
        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        assert!((sorted[0] - 1.0).abs() < 1e-10);
        assert!((sorted[1] - 3.0).abs() < 1e-10);
        let first = vectors.column(0);
        assert!((first.dot(&first) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn recovers_leading_axes_of_a_diagonal_matrix() {
        let matrix = diagonal(&[3.0, 2.0, 1.0, 0.5]);
        let svd = TruncatedSvd::fit(&matrix, 3, 503);
        let projected = svd.transform(&matrix);
        assert_eq!(projected.dim(), (4, 3));
        assert!((projected[[0, 0]] - 3.0).abs() < 1e-8);
        assert!((projected[[1, 1]] - 2.0).abs() < 1e-8);
        assert!((projected[[2, 2]] - 1.0).abs() < 1e-8);
        assert!(projected.row(3).iter().all(|v| v.abs() < 1e-8));
    }

    #[test]
    fn pads_components_past_the_rank() {
        let matrix = diagonal(&[2.0]);
        let svd = TruncatedSvd::fit(&matrix, 3, 1);
        assert_eq!(svd.n_components(), 3);
        let projected = svd.transform(&matrix);
        assert_eq!(projected.dim(), (1, 3));
        assert!((projected[[0, 0]] - 2.0).abs() < 1e-10);
        assert_eq!(projected[[0, 2]], 0.0);
    }
}
