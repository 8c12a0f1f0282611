#[cfg(test)]
use std::cell::RefCell;

use ndarray::{Array2, Axis, concatenate};
use tracing::debug;

use crate::churn::record::Record;

use super::encode::{CategoricalEncoder, CategoryValue, categorical_values};
use super::scale::{MinMaxScaler, SCALED_COLUMNS};
use super::text::TextEmbedder;
use super::{FeatureError, FeatureMatrix, derive};

/// Plain numeric columns, in output order.
pub const NUMERIC_COLUMNS: [&str; 11] = [
    "CreditScore",
    "Age",
    "Tenure",
    "Balance",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
    "SurnameLength",
    "IsSenior",
    "IsActiveByCrCard",
    "ProductsPerTenure",
];

/// Unfitted pipeline; fitting consumes a training split and yields a [`FittedPipeline`].
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    /// Seed for the randomized text reduction.
    pub seed: u64,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self { seed: 503 }
    }
}

/// Transformers fitted on one training split.
///
/// Immutable once built, so validation and test data can never refit it.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPipeline {
    encoder: CategoricalEncoder,
    text: TextEmbedder,
    scaler: MinMaxScaler,
}

struct Prepared {
    numeric: Array2<f64>,
    categories: Vec<[CategoryValue; 4]>,
    surnames: Vec<String>,
    combined: Vec<String>,
}

impl Prepared {
    fn from_records(records: &[Record]) -> Self {
        let mut numeric = Array2::zeros((records.len(), NUMERIC_COLUMNS.len()));
        let mut categories = Vec::with_capacity(records.len());
        let mut surnames = Vec::with_capacity(records.len());
        let mut combined = Vec::with_capacity(records.len());
        for (mut row, record) in numeric.axis_iter_mut(Axis(0)).zip(records) {
            let derived = derive(record);
            let values = [
                record.credit_score,
                record.age,
                record.tenure,
                record.balance,
                record.has_cr_card,
                record.is_active_member,
                record.estimated_salary,
                derived.surname_length,
                derived.is_senior,
                derived.is_active_by_cr_card,
                derived.products_per_tenure,
            ];
            for (slot, value) in row.iter_mut().zip(values) {
                *slot = value;
            }
            categories.push(categorical_values(record, &derived));
            surnames.push(record.surname.clone());
            combined.push(derived.sur_geo_gend_sal);
        }
        Self {
            numeric,
            categories,
            surnames,
            combined,
        }
    }

    fn text_columns(&self) -> [&[String]; 2] {
        [self.surnames.as_slice(), self.combined.as_slice()]
    }

    fn scaled_block(&self) -> Array2<f64> {
        self.numeric.select(Axis(1), &scaled_indices())
    }
}

#[cfg(test)]
thread_local! {
    static FITTED_ROWS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Record counts seen by `fit_transform` on this thread since the last call.
#[cfg(test)]
pub(crate) fn take_fitted_rows() -> Vec<usize> {
    FITTED_ROWS.with(|rows| rows.take())
}

fn scaled_indices() -> Vec<usize> {
    SCALED_COLUMNS
        .iter()
        .filter_map(|name| NUMERIC_COLUMNS.iter().position(|column| column == name))
        .collect()
}

impl FeaturePipeline {
    /// Fit every transformer on `records` and return their transformed matrix.
    pub fn fit_transform(
        &self,
        records: &[Record],
    ) -> Result<(FeatureMatrix, FittedPipeline), FeatureError> {
        if records.is_empty() {
            return Err(FeatureError::EmptyInput);
        }
        #[cfg(test)]
        FITTED_ROWS.with(|rows| rows.borrow_mut().push(records.len()));
        let prepared = Prepared::from_records(records);
        let fitted = FittedPipeline {
            encoder: CategoricalEncoder::fit(&prepared.categories),
            text: TextEmbedder::fit(prepared.text_columns(), self.seed)?,
            scaler: MinMaxScaler::fit(prepared.scaled_block().view()),
        };
        let matrix = fitted.assemble(&prepared)?;
        debug!(
            rows = matrix.n_rows(),
            columns = matrix.n_columns(),
            "Fitted feature pipeline"
        );
        Ok((matrix, fitted))
    }
}

impl FittedPipeline {
    /// Apply the fitted transformers; row count and order are preserved.
    pub fn transform(&self, records: &[Record]) -> Result<FeatureMatrix, FeatureError> {
        self.assemble(&Prepared::from_records(records))
    }

    pub fn column_names(&self) -> Vec<String> {
        NUMERIC_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(self.encoder.column_names())
            .chain(TextEmbedder::column_names())
            .collect()
    }

    fn assemble(&self, prepared: &Prepared) -> Result<FeatureMatrix, FeatureError> {
        let n_rows = prepared.numeric.nrows();
        let mut numeric = prepared.numeric.clone();
        let scaled = self.scaler.transform(prepared.scaled_block().view())?;
        for (src, dst) in scaled_indices().into_iter().enumerate() {
            numeric.column_mut(dst).assign(&scaled.column(src));
        }

        let dummy_columns = self.encoder.transform(&prepared.categories);
        let mut dummies = Array2::zeros((n_rows, dummy_columns.len()));
        for (idx, column) in dummy_columns.into_iter().enumerate() {
            for (row, value) in column.into_iter().enumerate() {
                dummies[[row, idx]] = value;
            }
        }
        let text = self.text.transform(prepared.text_columns());

        let values = concatenate(Axis(1), &[numeric.view(), dummies.view(), text.view()])
            .map_err(|_| FeatureError::ColumnMismatch {
                expected: n_rows,
                found: text.nrows(),
            })?;
        Ok(FeatureMatrix {
            columns: self.column_names(),
            values,
        })
    }
}

/// Fit on training data, or reuse `fitted` for anything else.
///
/// Returns the newly fitted pipeline when `is_train` is set.
pub fn data_pipeline(
    records: &[Record],
    is_train: bool,
    fitted: Option<&FittedPipeline>,
) -> Result<(FeatureMatrix, Option<FittedPipeline>), FeatureError> {
    if is_train {
        let (matrix, fitted) = FeaturePipeline::default().fit_transform(records)?;
        return Ok((matrix, Some(fitted)));
    }
    let fitted = fitted.ok_or(FeatureError::NotFitted)?;
    Ok((fitted.transform(records)?, None))
}
