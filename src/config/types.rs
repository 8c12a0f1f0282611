use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_activation, default_backend, default_batch_size, default_data_dir,
    default_learning_rate, default_n_trials, default_num_epochs, default_num_folds,
    default_sampler, default_search_results_path, default_seed, default_submission_path,
    default_val_fraction, default_weight_decay,
};

/// Top-level settings file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Bank churn pipeline settings.
    #[serde(default)]
    pub churn: ChurnSettings,
    /// Digit recognizer settings.
    #[serde(default)]
    pub digits: DigitsSettings,
}

/// Settings for the churn ensemble and its hyperparameter search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnSettings {
    /// Directory holding `train.csv` and `test.csv`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where the `id,Exited` submission is written.
    #[serde(default = "default_submission_path")]
    pub submission_path: PathBuf,
    /// Where the search results are written and read back from.
    #[serde(default = "default_search_results_path")]
    pub search_results_path: PathBuf,
    /// Number of stratified folds.
    #[serde(default = "default_num_folds")]
    pub num_folds: usize,
    /// Number of search trials run by `--optimize`.
    #[serde(default = "default_n_trials")]
    pub n_trials: usize,
    /// Sampler used to propose trial parameters.
    #[serde(default = "default_sampler")]
    pub sampler: SamplerKind,
    /// Seed for the search sampler and the text embedding projection.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ChurnSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            submission_path: default_submission_path(),
            search_results_path: default_search_results_path(),
            num_folds: default_num_folds(),
            n_trials: default_n_trials(),
            sampler: default_sampler(),
            seed: default_seed(),
        }
    }
}

/// Trial parameter sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// Independent uniform draws.
    Random,
    /// Tree-structured Parzen estimator.
    Tpe,
}

/// Settings for the digit recognizer training loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitsSettings {
    /// Directory holding `train.csv` and `test.csv`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where the `ImageId,Label` submission is written.
    #[serde(default = "default_submission_path")]
    pub submission_path: PathBuf,
    /// Upper bound on training epochs.
    #[serde(default = "default_num_epochs")]
    pub num_epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// `ReLU` or `LeakyReLU`.
    #[serde(default = "default_activation")]
    pub activation: String,
    /// Share of the training rows held out for validation.
    #[serde(default = "default_val_fraction")]
    pub val_fraction: f64,
    /// Seed for the train/validation split, shuffling and augmentation.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_backend")]
    pub backend: DigitsBackend,
}

impl Default for DigitsSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            submission_path: default_submission_path(),
            num_epochs: default_num_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            weight_decay: default_weight_decay(),
            activation: default_activation(),
            val_fraction: default_val_fraction(),
            seed: default_seed(),
            backend: default_backend(),
        }
    }
}

/// Tensor backend used for CNN training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitsBackend {
    /// CPU via ndarray.
    Cpu,
    /// GPU via wgpu.
    Wgpu,
    #[cfg(feature = "digits-cuda")]
    Cuda,
}

impl DigitsBackend {
    /// Parse a backend name as accepted on the command line or in the environment.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" | "ndarray" => Some(Self::Cpu),
            "wgpu" | "vulkan" | "metal" => Some(Self::Wgpu),
            #[cfg(feature = "digits-cuda")]
            "cuda" => Some(Self::Cuda),
            _ => None,
        }
    }
}
