use ndarray::ArrayView2;

/// Upper bound on bins per feature so bin indices fit in a `u8`.
pub const MAX_BINS: usize = 255;

/// Per-feature cut points learned from training data.
///
/// A value lands in bin `b` when `cuts[b - 1] < v <= cuts[b]`; values above the
/// last cut land in the final bin. `NaN` always maps to bin 0, which keeps it on
/// the left of every split, matching [`super::Tree`] routing on raw values.
#[derive(Debug, Clone)]
pub struct BinMapper {
    cuts: Vec<Vec<f64>>,
}

impl BinMapper {
    /// Learn quantile cut points for every column of `x`.
    pub fn fit(x: ArrayView2<'_, f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS);
        let cuts = x
            .columns()
            .into_iter()
            .map(|column| {
                let mut values: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
                values.sort_by(f64::total_cmp);
                feature_cuts(&values, max_bins)
            })
            .collect();
        Self { cuts }
    }

    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }

    /// Number of bins used by `feature`.
    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }

    /// Raw-value threshold equivalent to splitting after `bin`.
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.cuts[feature][bin]
    }

    pub fn bin_value(&self, feature: usize, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        self.cuts[feature].partition_point(|&cut| cut < value) as u8
    }

    /// Bin every value of `x`, stored feature-major.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> BinnedMatrix {
        let n_rows = x.nrows();
        let mut bins = Vec::with_capacity(n_rows * self.cuts.len());
        for (feature, column) in x.columns().into_iter().enumerate() {
            bins.extend(column.iter().map(|&v| self.bin_value(feature, v)));
        }
        BinnedMatrix { n_rows, bins }
    }
}

fn feature_cuts(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut distinct = sorted.to_vec();
    distinct.dedup();
    if distinct.len() < max_bins {
        return distinct;
    }
    let mut cuts = Vec::with_capacity(max_bins - 1);
    for k in 1..max_bins {
        let idx = (k * sorted.len() / max_bins).min(sorted.len() - 1);
        let value = sorted[idx];
        if cuts.last() != Some(&value) {
            cuts.push(value);
        }
    }
    cuts
}

/// Feature-major matrix of bin indices.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    n_rows: usize,
    bins: Vec<u8>,
}

impl BinnedMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Bin indices of one feature for every row.
    pub fn feature(&self, feature: usize) -> &[u8] {
        let start = feature * self.n_rows;
        &self.bins[start..start + self.n_rows]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn small_columns_use_distinct_values() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let mapper = BinMapper::fit(x.view(), 255);
        assert_eq!(mapper.n_bins(0), 4);
        assert_eq!(mapper.n_bins(1), 2);
        assert_eq!(mapper.bin_value(0, 1.0), 0);
        assert_eq!(mapper.bin_value(0, 2.0), 1);
        assert_eq!(mapper.bin_value(0, 2.5), 2);
        assert_eq!(mapper.bin_value(0, f64::INFINITY), 3);
        assert_eq!(mapper.bin_value(0, f64::NAN), 0);
    }

    #[test]
    fn bin_split_matches_threshold_routing() {
        let x = array![[0.5], [1.5], [2.5], [3.5], [4.5]];
        let mapper = BinMapper::fit(x.view(), 255);
        let binned = mapper.transform(x.view());
        for bin in 0..mapper.n_bins(0) - 1 {
            let threshold = mapper.threshold(0, bin);
            for (row, &b) in binned.feature(0).iter().enumerate() {
                assert_eq!(b as usize <= bin, x[[row, 0]] <= threshold);
            }
        }
    }

    #[test]
    fn wide_columns_are_capped() {
        let values: Vec<f64> = (0..10_000).map(|v| v as f64).collect();
        let x = ndarray::Array2::from_shape_vec((values.len(), 1), values).unwrap();
        let mapper = BinMapper::fit(x.view(), 16);
        assert!(mapper.n_bins(0) <= 16);
        assert!(mapper.n_bins(0) > 8);
    }
}
