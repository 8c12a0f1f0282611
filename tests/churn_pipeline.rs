mod support;

use std::collections::BTreeMap;

use compkit::churn::record::{load_labelled, load_records};
use compkit::churn::submission::write_submission;
use compkit::churn::{ChurnError, KFoldOptions, ParamValue, kfold_prediction};
use support::fixtures;
use tempfile::tempdir;

fn small_options() -> KFoldOptions {
    let overrides: BTreeMap<String, ParamValue> = [
        ("lgbm__n_estimators", ParamValue::Int(10)),
        ("lgbm__min_child_samples", ParamValue::Int(2)),
        ("xgb__n_estimators", ParamValue::Int(10)),
        ("cat__iterations", ParamValue::Int(10)),
        ("cat__depth", ParamValue::Int(3)),
        ("cat__min_data_in_leaf", ParamValue::Int(1)),
        ("vc__lgbm_weight", ParamValue::Float(1.0)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();
    let mut options = KFoldOptions::default();
    options.params.apply_overrides(&overrides).expect("overrides");
    options
}

#[test]
fn kfold_prediction_runs_from_csv_to_submission() {
    let dir = tempdir().unwrap();
    fixtures::write_churn_csvs(dir.path(), 60, 9);
    let (train, labels) = load_labelled(&dir.path().join("train.csv")).unwrap();
    let test = load_records(&dir.path().join("test.csv")).unwrap();
    assert_eq!(train.len(), 60);
    assert_eq!(labels[0], fixtures::churn_label(0));
    assert!(test.iter().all(|record| record.exited.is_none()));

    let report = kfold_prediction(&train, &labels, &test, &small_options()).unwrap();
    assert_eq!(report.folds.len(), 5);
    assert_eq!(report.fold_predictions.len(), 5);
    assert_eq!(report.test_predictions.len(), test.len());
    assert!(report.test_predictions.iter().all(|p| (0.0..=1.0).contains(p)));
    for (row, &mean) in report.test_predictions.iter().enumerate() {
        let expected = report
            .fold_predictions
            .iter()
            .map(|fold| fold[row])
            .sum::<f64>()
            / report.fold_predictions.len() as f64;
        assert!((mean - expected).abs() < 1e-12);
    }

    let out = dir.path().join("out").join("submission.csv");
    write_submission(&out, &test, &report.test_predictions).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("id,Exited"));
    assert_eq!(lines.count(), test.len());
    assert!(text.contains("\n165034,"));
}

#[test]
fn unknown_override_is_rejected() {
    let mut options = KFoldOptions::default();
    let overrides = BTreeMap::from([("rf__n_estimators".to_string(), ParamValue::Int(3))]);
    assert!(options.params.apply_overrides(&overrides).is_err());
}

#[test]
fn label_count_must_match_records() {
    let dir = tempdir().unwrap();
    fixtures::write_churn_csvs(dir.path(), 20, 2);
    let (train, labels) = load_labelled(&dir.path().join("train.csv")).unwrap();
    let test = load_records(&dir.path().join("test.csv")).unwrap();
    let result = kfold_prediction(&train, &labels[..10], &test, &small_options());
    assert!(matches!(result, Err(ChurnError::LabelMismatch { records: 20, labels: 10 })));
}
