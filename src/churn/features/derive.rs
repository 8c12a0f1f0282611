use crate::churn::record::Record;

/// Hand-crafted columns computed from a single record.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub surname_length: f64,
    pub age_category: i64,
    pub is_senior: f64,
    pub is_active_by_cr_card: f64,
    /// `Tenure / NumOfProducts`; a zero divisor stays `inf` or `NaN`.
    pub products_per_tenure: f64,
    /// Concatenated identity text fed to the text embedder.
    pub sur_geo_gend_sal: String,
}

pub fn derive(record: &Record) -> DerivedFeatures {
    // `{:?}` keeps the trailing `.0` on whole floats, e.g. "166777.0".
    let salary = record.estimated_salary.round_ties_even();
    DerivedFeatures {
        surname_length: record.surname.chars().count() as f64,
        age_category: (record.age / 20.0).round_ties_even() as i64,
        is_senior: if record.age >= 60.0 { 1.0 } else { 0.0 },
        is_active_by_cr_card: record.has_cr_card * record.is_active_member,
        products_per_tenure: record.tenure / f64::from(record.num_of_products),
        sur_geo_gend_sal: format!(
            "{}{}{}{}{salary:?}",
            record.customer_id, record.surname, record.geography, record.gender
        ),
    }
}
