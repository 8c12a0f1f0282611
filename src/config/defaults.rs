use std::path::PathBuf;

use super::types::{DigitsBackend, SamplerKind};

pub(super) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(super) fn default_submission_path() -> PathBuf {
    PathBuf::from("./submission.csv")
}

pub(super) fn default_search_results_path() -> PathBuf {
    PathBuf::from("./search_results.json")
}

pub(super) fn default_num_folds() -> usize {
    5
}

pub(super) fn default_n_trials() -> usize {
    300
}

pub(super) fn default_sampler() -> SamplerKind {
    SamplerKind::Tpe
}

pub(super) fn default_seed() -> u64 {
    503
}

pub(super) fn default_num_epochs() -> usize {
    40
}

pub(super) fn default_batch_size() -> usize {
    64
}

pub(super) fn default_learning_rate() -> f64 {
    1e-4
}

pub(super) fn default_weight_decay() -> f64 {
    0.01
}

pub(super) fn default_activation() -> String {
    "ReLU".to_string()
}

pub(super) fn default_val_fraction() -> f64 {
    0.2
}

pub(super) fn default_backend() -> DigitsBackend {
    DigitsBackend::Cpu
}

pub(super) const MAX_VAL_FRACTION: f64 = 0.9;
