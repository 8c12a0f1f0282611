use std::path::Path;

use serde::Serialize;

use super::record::Record;
use crate::submission::{SubmissionError, write_rows};

#[derive(Debug, Serialize)]
struct ChurnRow {
    id: u64,
    #[serde(rename = "Exited")]
    exited: f64,
}

/// Write the `id,Exited` submission for `test` in input order.
pub fn write_submission(path: &Path, test: &[Record], predictions: &[f64]) -> Result<(), SubmissionError> {
    write_rows(
        path,
        test.iter()
            .zip(predictions)
            .map(|(record, &exited)| ChurnRow { id: record.id, exited }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::churn::test_support::record;
    use tempfile::tempdir;

    #[test]
    fn writes_id_and_probability() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("submission.csv");
        let test = [record(165034, "A", "France", "Male", 30.0), record(165035, "B", "Spain", "Female", 41.0)];
        write_submission(&path, &test, &[0.25, 0.5]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,Exited\n165034,0.25\n165035,0.5\n");
    }
}
