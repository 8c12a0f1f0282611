use std::collections::BTreeSet;
use std::fmt;

use crate::churn::record::Record;

use super::derive::DerivedFeatures;

/// Columns expanded into dummies, in output order.
pub const CATEGORICAL_COLUMNS: [&str; 4] = ["Geography", "Gender", "NumOfProducts", "AgeCategory"];

/// A category level; integers sort numerically and text lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for CategoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

pub fn categorical_values(record: &Record, derived: &DerivedFeatures) -> [CategoryValue; 4] {
    [
        CategoryValue::Text(record.geography.clone()),
        CategoryValue::Text(record.gender.clone()),
        CategoryValue::Int(i64::from(record.num_of_products)),
        CategoryValue::Int(derived.age_category),
    ]
}

/// Dummy-column layout learned from a training split.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalEncoder {
    levels: Vec<Vec<CategoryValue>>,
}

impl CategoricalEncoder {
    pub fn fit(rows: &[[CategoryValue; 4]]) -> Self {
        let levels = (0..CATEGORICAL_COLUMNS.len())
            .map(|column| {
                rows.iter()
                    .map(|row| row[column].clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        Self { levels }
    }

    /// `<Column>_<value>` for every learned level.
    pub fn column_names(&self) -> Vec<String> {
        CATEGORICAL_COLUMNS
            .iter()
            .zip(&self.levels)
            .flat_map(|(name, levels)| levels.iter().map(move |level| format!("{name}_{level}")))
            .collect()
    }

    pub fn n_columns(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Encoded dummy columns, one `Vec` per output column.
    ///
    /// Each dummy is compressed to category codes over the values present in
    /// `rows`, so a dummy that is constant within this split codes to zeros.
    pub fn transform(&self, rows: &[[CategoryValue; 4]]) -> Vec<Vec<f64>> {
        let mut columns = Vec::with_capacity(self.n_columns());
        for (column, levels) in self.levels.iter().enumerate() {
            for level in levels {
                let indicator: Vec<bool> = rows.iter().map(|row| &row[column] == level).collect();
                let varies = indicator.iter().any(|&hit| hit) && indicator.iter().any(|&hit| !hit);
                columns.push(
                    indicator
                        .into_iter()
                        .map(|hit| if varies && hit { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
        }
        columns
    }
}
