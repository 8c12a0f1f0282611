use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;

use super::defaults::MAX_VAL_FRACTION;
use super::errors::ConfigError;
use super::types::Settings;

/// Settings file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "compkit.toml";

/// Load settings from `explicit` if given, otherwise from [`DEFAULT_CONFIG_FILE`].
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    match explicit {
        Some(path) => load_from(path),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                load_from(&path)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

/// Load and validate settings from a TOML file.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.churn.num_folds < 2 {
        return Err(ConfigError::InvalidValue {
            key: "churn.num_folds",
            reason: format!("must be at least 2, got {}", settings.churn.num_folds),
        });
    }
    if settings.digits.batch_size == 0 {
        return Err(ConfigError::InvalidValue {
            key: "digits.batch_size",
            reason: "must be positive".to_string(),
        });
    }
    let val = settings.digits.val_fraction;
    if !(val > 0.0 && val <= MAX_VAL_FRACTION) {
        return Err(ConfigError::InvalidValue {
            key: "digits.val_fraction",
            reason: format!("must be in (0, {MAX_VAL_FRACTION}], got {val}"),
        });
    }
    Ok(())
}

/// Write `data` to `path` through a sibling temp file and a rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let suffix: u32 = rand::rng().random();
    let tmp_path = dir.join(format!("{file_name}.tmp-{suffix:08x}"));

    let write_result = std::fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(source) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ConfigError::Write {
            path: tmp_path,
            source,
        });
    }
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        ConfigError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DigitsBackend, SamplerKind};
    use tempfile::tempdir;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("compkit.toml");
        std::fs::write(
            &path,
            "[churn]\nnum_folds = 3\nsampler = \"random\"\n\n[digits]\nbackend = \"wgpu\"\n",
        )
        .unwrap();
        let settings = load_from(&path).unwrap();
        assert_eq!(settings.churn.num_folds, 3);
        assert_eq!(settings.churn.sampler, SamplerKind::Random);
        assert_eq!(settings.churn.n_trials, 300);
        assert_eq!(settings.digits.backend, DigitsBackend::Wgpu);
        assert_eq!(settings.digits.batch_size, 64);
        assert_eq!(settings.digits.activation, "ReLU");
    }

    #[test]
    fn rejects_single_fold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("compkit.toml");
        std::fs::write(&path, "[churn]\nnum_folds = 1\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "churn.num_folds", .. }));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_or_default(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
