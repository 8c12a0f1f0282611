//! CSV records for the bank churn competition.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to open {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("Failed to parse {path} (record {index}): {source}")]
    Parse {
        path: PathBuf,
        index: usize,
        source: csv::Error,
    },
    #[error("{path} has no Exited value for record {index}")]
    MissingLabel { path: PathBuf, index: usize },
    #[error("{path} has Exited={value} for record {index}; expected 0 or 1")]
    InvalidLabel {
        path: PathBuf,
        index: usize,
        value: u8,
    },
}

/// One customer row from `train.csv` or `test.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    #[serde(rename = "id")]
    pub id: u64,
    pub customer_id: u64,
    pub surname: String,
    pub credit_score: f64,
    pub geography: String,
    pub gender: String,
    pub age: f64,
    pub tenure: f64,
    pub balance: f64,
    pub num_of_products: u32,
    pub has_cr_card: f64,
    pub is_active_member: f64,
    pub estimated_salary: f64,
    /// Churn label; only present in the training file.
    #[serde(default)]
    pub exited: Option<u8>,
}

/// Read every record of a competition CSV file.
pub fn load_records(path: &Path) -> Result<Vec<Record>, RecordError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| RecordError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|source| RecordError::Parse {
                path: path.to_path_buf(),
                index,
                source,
            })
        })
        .collect()
}

/// Read the training file and split off the `Exited` labels.
pub fn load_labelled(path: &Path) -> Result<(Vec<Record>, Vec<u8>), RecordError> {
    let records = load_records(path)?;
    let labels = records
        .iter()
        .enumerate()
        .map(|(index, record)| match record.exited {
            None => Err(RecordError::MissingLabel {
                path: path.to_path_buf(),
                index,
            }),
            Some(value) if value > 1 => Err(RecordError::InvalidLabel {
                path: path.to_path_buf(),
                index,
                value,
            }),
            Some(value) => Ok(value),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((records, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "id,CustomerId,Surname,CreditScore,Geography,Gender,Age,Tenure,Balance,NumOfProducts,HasCrCard,IsActiveMember,EstimatedSalary";

    #[test]
    fn reads_train_and_test_layouts() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("train.csv");
        std::fs::write(
            &train,
            format!(
                "{HEADER},Exited\n0,15674932,Okwudilichukwu,668,France,Male,33.0,3,0.0,2,1.0,0.0,181449.97,0\n"
            ),
        )
        .unwrap();
        let test = dir.path().join("test.csv");
        std::fs::write(
            &test,
            format!("{HEADER}\n165034,15773898,Lucchese,586,France,Female,23.0,2,0.0,2,0.0,1.0,160976.75\n"),
        )
        .unwrap();

        let (records, labels) = load_labelled(&train).unwrap();
        assert_eq!(labels, vec![0]);
        assert_eq!(records[0].surname, "Okwudilichukwu");
        assert_eq!(records[0].num_of_products, 2);

        let test_records = load_records(&test).unwrap();
        assert_eq!(test_records[0].id, 165034);
        assert_eq!(test_records[0].exited, None);
        assert!(matches!(
            load_labelled(&test),
            Err(RecordError::MissingLabel { index: 0, .. })
        ));
    }

    #[test]
    fn parse_errors_name_the_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(
            &path,
            format!("{HEADER}\n0,1,A,oops,France,Male,33.0,3,0.0,2,1.0,0.0,1.0\n"),
        )
        .unwrap();
        assert!(matches!(
            load_records(&path),
            Err(RecordError::Parse { index: 0, .. })
        ));
    }
}
