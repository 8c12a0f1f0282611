//! Competition submission files.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, write_atomic};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Failed to encode submission row: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to finish submission buffer: {0}")]
    Flush(String),
    #[error(transparent)]
    Write(#[from] ConfigError),
}

/// Serialize `rows` as CSV with a header and write them atomically to `path`.
pub fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), SubmissionError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| SubmissionError::Flush(err.to_string()))?;
    write_atomic(path, &bytes)?;
    Ok(())
}
