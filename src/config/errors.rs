use std::path::PathBuf;

use thiserror::Error;

/// Errors that may occur while loading settings or writing pipeline outputs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create an output directory.
    #[error("Unable to create directory {path}: {source}")]
    CreateDir {
        /// Directory path that failed to create.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write a file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// A setting parsed but holds an unusable value.
    #[error("Invalid setting {key}: {reason}")]
    InvalidValue {
        /// Dotted setting key.
        key: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}
