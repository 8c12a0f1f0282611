mod support;

use compkit::config::{DigitsBackend, DigitsSettings};
use compkit::digits;
use support::fixtures;
use tempfile::tempdir;

#[test]
fn trains_and_writes_image_id_submission() {
    let dir = tempdir().unwrap();
    fixtures::write_digit_csvs(dir.path(), 30, 4);
    let settings = DigitsSettings {
        data_dir: dir.path().to_path_buf(),
        submission_path: dir.path().join("submission.csv"),
        num_epochs: 2,
        batch_size: 8,
        backend: DigitsBackend::Cpu,
        ..DigitsSettings::default()
    };
    let report = digits::run(&settings).unwrap();
    assert!(!report.epochs.is_empty() && report.epochs.len() <= 2);

    let text = std::fs::read_to_string(&settings.submission_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "ImageId,Label");
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("1,"));
    assert!(lines[4].starts_with("4,"));
}

#[test]
fn missing_data_dir_is_an_error() {
    let dir = tempdir().unwrap();
    let settings = DigitsSettings {
        data_dir: dir.path().join("absent"),
        ..DigitsSettings::default()
    };
    assert!(matches!(digits::run(&settings), Err(digits::DigitsError::Open { .. })));
}
