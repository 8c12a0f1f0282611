use std::path::Path;

use serde::Serialize;

use crate::submission::{SubmissionError, write_rows};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DigitRow {
    image_id: usize,
    label: u8,
}

/// Write `ImageId,Label` rows with 1-based image ids.
pub fn write_submission(path: &Path, labels: &[u8]) -> Result<(), SubmissionError> {
    write_rows(
        path,
        labels.iter().enumerate().map(|(idx, &label)| DigitRow {
            image_id: idx + 1,
            label,
        }),
    )
}
