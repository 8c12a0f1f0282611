use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use super::SearchError;
use super::sampler::Sampler;
use super::trial::Trial;
use crate::churn::ensemble::ParamValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    Complete,
    Failed,
}

/// A finished trial and the parameters it sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    pub number: usize,
    pub state: TrialState,
    /// Objective value; `None` for failed trials.
    pub value: Option<f64>,
    pub params: BTreeMap<String, ParamValue>,
}

/// Sequential maximising study over a sampler.
pub struct Study {
    pub study_name: String,
    pub direction: Direction,
    sampler: Box<dyn Sampler>,
    trials: Vec<FrozenTrial>,
}

impl Study {
    pub fn new(study_name: impl Into<String>, sampler: Box<dyn Sampler>) -> Self {
        Self {
            study_name: study_name.into(),
            direction: Direction::Maximize,
            sampler,
            trials: Vec::new(),
        }
    }

    /// Run `n_trials` trials one after another.
    ///
    /// A failing objective marks its trial as failed and the study moves on.
    pub fn optimize<F>(&mut self, n_trials: usize, mut objective: F)
    where
        F: FnMut(&mut Trial<'_>) -> Result<f64, SearchError>,
    {
        for _ in 0..n_trials {
            let number = self.trials.len();
            let _span = info_span!("trial", number).entered();
            let mut trial = Trial::new(number, self.sampler.as_mut(), &self.trials);
            let outcome = objective(&mut trial);
            let params = trial.into_params();
            let frozen = match outcome {
                Ok(value) if value.is_finite() => {
                    info!("Trial {number} finished with value {value}");
                    FrozenTrial {
                        number,
                        state: TrialState::Complete,
                        value: Some(value),
                        params,
                    }
                }
                Ok(value) => {
                    warn!("Trial {number} failed: objective returned {value}");
                    failed(number, params)
                }
                Err(err) => {
                    warn!("Trial {number} failed: {err}");
                    failed(number, params)
                }
            };
            self.trials.push(frozen);
            if let Some(best) = self.best_trial() {
                info!(
                    "Best is trial {} with value {}",
                    best.number,
                    best.value.unwrap_or(f64::NAN)
                );
            }
        }
    }

    pub fn trials(&self) -> &[FrozenTrial] {
        &self.trials
    }

    /// Completed trial with the highest value; earlier trials win ties.
    pub fn best_trial(&self) -> Option<&FrozenTrial> {
        self.trials
            .iter()
            .filter(|trial| trial.state == TrialState::Complete)
            .fold(None, |best: Option<&FrozenTrial>, trial| match best {
                Some(current) if current.value >= trial.value => Some(current),
                _ => Some(trial),
            })
    }
}

fn failed(number: usize, params: BTreeMap<String, ParamValue>) -> FrozenTrial {
    FrozenTrial {
        number,
        state: TrialState::Failed,
        value: None,
        params,
    }
}
