use tracing::info;

use super::ChurnError;
use super::ensemble::EnsembleParams;
use super::features::FeaturePipeline;
use super::record::{load_labelled, load_records};
use super::search::{
    RandomSampler, Sampler, SearchResults, Study, TpeSampler, ensemble_objective, load_best_params,
};
use super::submission::write_submission;
use super::trainer::{KFoldOptions, KFoldReport, kfold_prediction};
use crate::config::{ChurnSettings, SamplerKind};

pub const STUDY_NAME: &str = "bank-churn";

/// Load the competition files, optionally search hyperparameters, then
/// train the fold ensembles and write the submission.
pub fn run(settings: &ChurnSettings, optimize: bool) -> Result<KFoldReport, ChurnError> {
    let train_path = settings.data_dir.join("train.csv");
    let test_path = settings.data_dir.join("test.csv");
    let (train, labels) = load_labelled(&train_path)?;
    let test = load_records(&test_path)?;
    info!(
        "Loaded {} training and {} test records from {}",
        train.len(),
        test.len(),
        settings.data_dir.display()
    );

    let pipeline = FeaturePipeline {
        seed: settings.seed,
    };
    let mut params = EnsembleParams::default();
    if optimize {
        let (x, _) = pipeline.fit_transform(&train)?;
        let mut study = Study::new(STUDY_NAME, sampler(settings));
        study.optimize(settings.n_trials, ensemble_objective(x.values.view(), &labels));
        SearchResults::from_study(&study).save(&settings.search_results_path)?;
        info!(
            "Saved {} trials to {}",
            study.trials().len(),
            settings.search_results_path.display()
        );
        let best = load_best_params(&settings.search_results_path)?;
        info!("Best parameters: {best:?}");
        params.apply_overrides(&best)?;
    }

    let report = kfold_prediction(
        &train,
        &labels,
        &test,
        &KFoldOptions {
            num_folds: settings.num_folds,
            params,
            pipeline,
        },
    )?;
    write_submission(&settings.submission_path, &test, &report.test_predictions)?;
    info!("Wrote submission to {}", settings.submission_path.display());
    Ok(report)
}

fn sampler(settings: &ChurnSettings) -> Box<dyn Sampler> {
    match settings.sampler {
        SamplerKind::Random => Box::new(RandomSampler::new(settings.seed)),
        SamplerKind::Tpe => Box::new(TpeSampler::new(settings.seed)),
    }
}
