//! Competition pipelines: bank churn ensemble and digit recognizer.
/// Application directory resolution.
pub mod app_dirs;
/// Bank churn features, folds, ensemble and search.
pub mod churn;
/// Settings file loading.
pub mod config;
/// Digit recognizer CNN.
pub mod digits;
/// Logging setup.
pub mod logging;
/// Boosting engine and metrics.
pub mod ml;
/// Submission CSV writer.
pub mod submission;
