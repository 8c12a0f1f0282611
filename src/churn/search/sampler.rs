use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::study::{FrozenTrial, TrialState};
use crate::churn::ensemble::ParamValue;

/// Search space of one parameter; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    Int { low: i64, high: i64 },
    Float { low: f64, high: f64 },
}

impl Distribution {
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Int { low, high } => low <= high,
            Self::Float { low, high } => low.is_finite() && high.is_finite() && low <= high,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Int { low, high } => (low as f64, high as f64),
            Self::Float { low, high } => (low, high),
        }
    }

    /// Continuous range the samplers work in; integers widen by half a step.
    fn internal_bounds(&self) -> (f64, f64) {
        match *self {
            Self::Int { low, high } => (low as f64 - 0.5, high as f64 + 0.5),
            Self::Float { low, high } => (low, high),
        }
    }

    fn from_internal(&self, x: f64) -> ParamValue {
        match *self {
            Self::Int { low, high } => ParamValue::Int((x.round() as i64).clamp(low, high)),
            Self::Float { low, high } => ParamValue::Float(x.clamp(low, high)),
        }
    }

    fn sample_uniform(&self, rng: &mut StdRng) -> ParamValue {
        match *self {
            Self::Int { low, high } => ParamValue::Int(rng.random_range(low..=high)),
            Self::Float { low, high } => ParamValue::Float(rng.random_range(low..=high)),
        }
    }
}

/// Proposes a value for one parameter given the finished trials so far.
pub trait Sampler {
    fn sample(&mut self, name: &str, distribution: Distribution, history: &[FrozenTrial])
    -> ParamValue;
}

/// Independent uniform draws.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, _name: &str, distribution: Distribution, _history: &[FrozenTrial]) -> ParamValue {
        distribution.sample_uniform(&mut self.rng)
    }
}

/// Univariate tree-structured Parzen estimator for maximisation.
///
/// Completed trials are split into the best `gamma(n)` and the rest; each
/// group becomes a truncated-Gaussian mixture, and the candidate drawn from
/// the good mixture with the highest `l(x) / g(x)` wins.
#[derive(Debug, Clone)]
pub struct TpeSampler {
    rng: StdRng,
    pub n_startup_trials: usize,
    pub n_ei_candidates: usize,
}

impl TpeSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            n_startup_trials: 10,
            n_ei_candidates: 24,
        }
    }
}

fn gamma(n: usize) -> usize {
    (n.div_ceil(10)).min(25)
}

impl Sampler for TpeSampler {
    fn sample(&mut self, name: &str, distribution: Distribution, history: &[FrozenTrial]) -> ParamValue {
        let mut observations: Vec<(f64, f64)> = history
            .iter()
            .filter(|trial| trial.state == TrialState::Complete)
            .filter_map(|trial| Some((trial.value?, trial.params.get(name)?.as_f64())))
            .collect();
        if observations.len() < self.n_startup_trials.max(2) {
            return distribution.sample_uniform(&mut self.rng);
        }
        observations.sort_by(|a, b| b.0.total_cmp(&a.0));
        let n_below = gamma(observations.len()).max(1);
        let (below, above) = observations.split_at(n_below);
        let below: Vec<f64> = below.iter().map(|&(_, x)| x).collect();
        let above: Vec<f64> = above.iter().map(|&(_, x)| x).collect();

        let (low, high) = distribution.internal_bounds();
        let good = ParzenEstimator::new(&below, low, high);
        let bad = ParzenEstimator::new(&above, low, high);
        let mut best = (f64::NEG_INFINITY, 0.5 * (low + high));
        for _ in 0..self.n_ei_candidates.max(1) {
            let candidate = good.sample(&mut self.rng);
            let score = good.log_pdf(candidate) - bad.log_pdf(candidate);
            if score > best.0 {
                best = (score, candidate);
            }
        }
        distribution.from_internal(best.1)
    }
}

/// Equal-weight mixture of truncated Gaussians plus a wide prior component.
#[derive(Debug, Clone)]
struct ParzenEstimator {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    low: f64,
    high: f64,
}

impl ParzenEstimator {
    fn new(points: &[f64], low: f64, high: f64) -> Self {
        let range = (high - low).max(f64::EPSILON);
        let mut components: Vec<(f64, bool)> = points.iter().map(|&x| (x, false)).collect();
        components.push((0.5 * (low + high), true));
        components.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = components.len();
        let min_sigma = range / 100f64.min(1.0 + n as f64);
        let mut mus = Vec::with_capacity(n);
        let mut sigmas = Vec::with_capacity(n);
        for (idx, &(mu, is_prior)) in components.iter().enumerate() {
            let left = if idx == 0 {
                mu - low
            } else {
                mu - components[idx - 1].0
            };
            let right = if idx + 1 == n {
                high - mu
            } else {
                components[idx + 1].0 - mu
            };
            let sigma = if is_prior {
                range
            } else {
                left.max(right).clamp(min_sigma, range)
            };
            mus.push(mu);
            sigmas.push(sigma);
        }
        Self {
            mus,
            sigmas,
            low,
            high,
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        let idx = rng.random_range(0..self.mus.len());
        let (mu, sigma) = (self.mus[idx], self.sigmas[idx]);
        for _ in 0..32 {
            let x = mu + sigma * standard_normal(rng);
            if (self.low..=self.high).contains(&x) {
                return x;
            }
        }
        mu.clamp(self.low, self.high)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let n = self.mus.len() as f64;
        let density: f64 = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .map(|(&mu, &sigma)| {
                let z = (x - mu) / sigma;
                let mass = (normal_cdf((self.high - mu) / sigma) - normal_cdf((self.low - mu) / sigma))
                    .max(1e-12);
                (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt() * mass)
            })
            .sum::<f64>()
            / n;
        density.max(1e-300).ln()
    }
}

/// Box-Muller draw from `N(0, 1)`.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz-Stegun 7.1.26; absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn completed(number: usize, x: f64, value: f64) -> FrozenTrial {
        FrozenTrial {
            number,
            state: TrialState::Complete,
            value: Some(value),
            params: BTreeMap::from([("x".to_string(), ParamValue::Float(x))]),
        }
    }

    #[test]
    fn random_sampler_is_seeded() {
        let dist = Distribution::Float { low: 0.0, high: 1.0 };
        let mut a = RandomSampler::new(9);
        let mut b = RandomSampler::new(9);
        for _ in 0..5 {
            assert_eq!(a.sample("x", dist, &[]), b.sample("x", dist, &[]));
        }
    }

    #[test]
    fn tpe_moves_towards_good_region() {
        let history: Vec<FrozenTrial> = (0..40)
            .map(|i| {
                let x = i as f64 / 39.0;
                completed(i, x, -(x - 0.8) * (x - 0.8))
            })
            .collect();
        let dist = Distribution::Float { low: 0.0, high: 1.0 };
        let mut sampler = TpeSampler::new(1);
        let draws: Vec<f64> = (0..20)
            .map(|_| sampler.sample("x", dist, &history).as_f64())
            .collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!(mean > 0.65, "mean draw {mean}");
        assert!(draws.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn tpe_starts_random_and_keeps_integers() {
        let dist = Distribution::Int { low: 1, high: 10 };
        let mut sampler = TpeSampler::new(2);
        let value = sampler.sample("x", dist, &[]);
        assert!(matches!(value, ParamValue::Int(v) if (1..=10).contains(&v)));

        let history: Vec<FrozenTrial> = (0..12).map(|i| completed(i, (i % 10 + 1) as f64, i as f64)).collect();
        for _ in 0..10 {
            assert!(matches!(sampler.sample("x", dist, &history), ParamValue::Int(v) if (1..=10).contains(&v)));
        }
    }

    #[test]
    fn gamma_caps_the_good_group() {
        assert_eq!(gamma(10), 1);
        assert_eq!(gamma(11), 2);
        assert_eq!(gamma(1000), 25);
    }

    #[test]
    fn erf_matches_known_values() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
    }
}
