use ndarray::{Array2, ArrayView2, Axis};

use super::FeatureError;

/// Columns rescaled to `[0, 1]` by the training range.
pub const SCALED_COLUMNS: [&str; 4] = ["CreditScore", "Age", "Balance", "EstimatedSalary"];

/// Per-column min-max scaler; values outside the fitted range are not clipped.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    ranges: Vec<f64>,
}

impl MinMaxScaler {
    /// Learn each column's minimum and range, ignoring `NaN`.
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let mut mins = Vec::with_capacity(x.ncols());
        let mut ranges = Vec::with_capacity(x.ncols());
        for column in x.axis_iter(Axis(1)) {
            let (min, max) = column
                .iter()
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            if min > max {
                mins.push(0.0);
                ranges.push(1.0);
                continue;
            }
            let range = max - min;
            mins.push(min);
            ranges.push(if range == 0.0 { 1.0 } else { range });
        }
        Self { mins, ranges }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, FeatureError> {
        if x.ncols() != self.mins.len() {
            return Err(FeatureError::ColumnMismatch {
                expected: self.mins.len(),
                found: x.ncols(),
            });
        }
        let mut out = x.to_owned();
        for (mut column, (min, range)) in out
            .axis_iter_mut(Axis(1))
            .zip(self.mins.iter().zip(&self.ranges))
        {
            column.mapv_inplace(|v| (v - min) / range);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scales_by_training_range_without_clipping() {
        let train = array![[0.0, 5.0], [10.0, 5.0], [f64::NAN, 5.0]];
        let scaler = MinMaxScaler::fit(train.view());
        let out = scaler.transform(array![[5.0, 5.0], [20.0, 7.0]].view()).unwrap();
        assert_eq!(out[[0, 0]], 0.5);
        assert_eq!(out[[1, 0]], 2.0);
        // Zero range divides by one.
        assert_eq!(out[[0, 1]], 0.0);
        assert_eq!(out[[1, 1]], 2.0);
    }

    #[test]
    fn rejects_wrong_width() {
        let scaler = MinMaxScaler::fit(array![[1.0, 2.0]].view());
        assert!(scaler.transform(array![[1.0]].view()).is_err());
    }
}
