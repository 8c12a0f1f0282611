use std::collections::BTreeMap;

use super::SearchError;
use super::sampler::{Distribution, Sampler};
use super::study::FrozenTrial;
use crate::churn::ensemble::ParamValue;

/// One running trial; every suggestion is recorded under its name.
pub struct Trial<'a> {
    number: usize,
    sampler: &'a mut dyn Sampler,
    history: &'a [FrozenTrial],
    params: BTreeMap<String, ParamValue>,
    distributions: BTreeMap<String, Distribution>,
}

impl<'a> Trial<'a> {
    pub(super) fn new(number: usize, sampler: &'a mut dyn Sampler, history: &'a [FrozenTrial]) -> Self {
        Self {
            number,
            sampler,
            history,
            params: BTreeMap::new(),
            distributions: BTreeMap::new(),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Integer in `[low, high]`, both inclusive.
    pub fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> Result<i64, SearchError> {
        match self.suggest(name, Distribution::Int { low, high })? {
            ParamValue::Int(value) => Ok(value),
            ParamValue::Float(value) => Ok(value.round() as i64),
        }
    }

    /// Float in `[low, high]`.
    pub fn suggest_float(&mut self, name: &str, low: f64, high: f64) -> Result<f64, SearchError> {
        Ok(self.suggest(name, Distribution::Float { low, high })?.as_f64())
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub(super) fn into_params(self) -> BTreeMap<String, ParamValue> {
        self.params
    }

    fn suggest(&mut self, name: &str, distribution: Distribution) -> Result<ParamValue, SearchError> {
        if !distribution.is_valid() {
            let (low, high) = distribution.bounds();
            return Err(SearchError::InvalidRange {
                name: name.to_string(),
                low,
                high,
            });
        }
        if let Some(existing) = self.distributions.get(name) {
            if *existing != distribution {
                return Err(SearchError::ConflictingDistribution {
                    name: name.to_string(),
                });
            }
            if let Some(&value) = self.params.get(name) {
                return Ok(value);
            }
        }
        let value = self.sampler.sample(name, distribution, self.history);
        self.distributions.insert(name.to_string(), distribution);
        self.params.insert(name.to_string(), value);
        Ok(value)
    }
}
