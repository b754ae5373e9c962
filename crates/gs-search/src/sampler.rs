//! Randomized parameter sampling.
//!
//! List-valued parameters are drawn by index from the sampler's own seeded
//! `ChaCha8Rng`, so a seeded sampler over lists is fully reproducible. The
//! same generator is handed to every [`Distribution`]; an implementation that
//! draws from some other source (a thread-local or global generator) will not
//! be reproducible, and the sampler does not try to correct for that.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use gs_types::{ConfigError, Configuration, GsResult, ParamValue};

/// A source of random variates for one parameter.
pub trait Distribution: Send + Sync + fmt::Debug {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue;

    /// Reject unusable parameters before any sampling happens.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Continuous uniform on `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub low: f64,
    pub high: f64,
}

impl Distribution for Uniform {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        ParamValue::Float(rng.gen_range(self.low..=self.high))
    }

    fn validate(&self) -> Result<(), String> {
        // gen_range scales the span by 1 / (1 - EPSILON) and panics if that overflows
        let scaled_span = (self.high - self.low) / (1.0 - f64::EPSILON);
        if self.low <= self.high && scaled_span.is_finite() {
            Ok(())
        } else {
            Err(format!("uniform bounds [{}, {}] are not a finite range", self.low, self.high))
        }
    }
}

/// Log-uniform on `[low, high]` (sampled in log-space then exponentiated).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogUniform {
    pub low: f64,
    pub high: f64,
}

impl Distribution for LogUniform {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        let log_val: f64 = rng.gen_range(self.low.ln()..=self.high.ln());
        ParamValue::Float(log_val.exp().clamp(self.low, self.high))
    }

    fn validate(&self) -> Result<(), String> {
        if self.low > 0.0
            && self.low <= self.high
            && (self.high.ln() - self.low.ln()).is_finite()
        {
            Ok(())
        } else {
            Err(format!(
                "log-uniform bounds [{}, {}] must be positive and ordered",
                self.low, self.high
            ))
        }
    }
}

/// Integers uniform on `[low, high]` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntUniform {
    pub low: i64,
    pub high: i64,
}

impl Distribution for IntUniform {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        ParamValue::Int(rng.gen_range(self.low..=self.high))
    }

    fn validate(&self) -> Result<(), String> {
        if self.low <= self.high {
            Ok(())
        } else {
            Err(format!("integer bounds [{}, {}] are empty", self.low, self.high))
        }
    }
}

/// How one parameter is sampled.
#[derive(Debug, Clone)]
pub enum ParamDistribution {
    /// Uniform choice among finite candidates.
    Choice(Vec<ParamValue>),
    Variate(Arc<dyn Distribution>),
}

/// Produces `n_iter` configurations drawn from per-parameter distributions.
///
/// Each iteration pass re-seeds from `seed` when one is set; without a seed
/// every pass draws fresh entropy.
#[derive(Debug, Clone)]
pub struct ParameterSampler {
    distributions: BTreeMap<String, ParamDistribution>,
    n_iter: usize,
    seed: Option<u64>,
}

impl ParameterSampler {
    pub fn builder(n_iter: usize) -> SamplerBuilder {
        SamplerBuilder {
            distributions: BTreeMap::new(),
            n_iter,
            seed: None,
        }
    }

    pub fn len(&self) -> usize {
        self.n_iter
    }

    pub fn is_empty(&self) -> bool {
        self.n_iter == 0
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn iter(&self) -> SamplerIter<'_> {
        let rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        SamplerIter {
            params: self.distributions.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            rng,
            remaining: self.n_iter,
        }
    }
}

impl<'a> IntoIterator for &'a ParameterSampler {
    type Item = Configuration;
    type IntoIter = SamplerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One sampling pass.
#[derive(Debug)]
pub struct SamplerIter<'a> {
    params: Vec<(&'a str, &'a ParamDistribution)>,
    rng: ChaCha8Rng,
    remaining: usize,
}

impl Iterator for SamplerIter<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Configuration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut config = Configuration::new();
        for (name, dist) in &self.params {
            let value = match dist {
                ParamDistribution::Choice(values) => {
                    values[self.rng.gen_range(0..values.len())].clone()
                }
                ParamDistribution::Variate(d) => d.sample(&mut self.rng),
            };
            config.insert(*name, value);
        }
        Some(config)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SamplerIter<'_> {}

/// Builder for [`ParameterSampler`]; `build` validates every parameter.
#[derive(Debug, Clone)]
pub struct SamplerBuilder {
    distributions: BTreeMap<String, ParamDistribution>,
    n_iter: usize,
    seed: Option<u64>,
}

impl SamplerBuilder {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn add_choice<T: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.distributions
            .insert(name.into(), ParamDistribution::Choice(values));
        self
    }

    pub fn add_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add_distribution(name, Uniform { low, high })
    }

    pub fn add_log_uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add_distribution(name, LogUniform { low, high })
    }

    pub fn add_int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add_distribution(name, IntUniform { low, high })
    }

    pub fn add_distribution(
        mut self,
        name: impl Into<String>,
        distribution: impl Distribution + 'static,
    ) -> Self {
        self.distributions
            .insert(name.into(), ParamDistribution::Variate(Arc::new(distribution)));
        self
    }

    pub fn build(self) -> GsResult<ParameterSampler> {
        for (name, dist) in &self.distributions {
            match dist {
                ParamDistribution::Choice(values) if values.is_empty() => {
                    return Err(ConfigError::EmptyCandidates {
                        parameter: name.clone(),
                    }
                    .into());
                }
                ParamDistribution::Choice(_) => {}
                ParamDistribution::Variate(d) => {
                    d.validate().map_err(|message| ConfigError::InvalidDistribution {
                        parameter: name.clone(),
                        message,
                    })?;
                }
            }
        }
        Ok(ParameterSampler {
            distributions: self.distributions,
            n_iter: self.n_iter,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_sampler(seed: u64) -> ParameterSampler {
        ParameterSampler::builder(4)
            .with_seed(seed)
            .add_choice("a", vec![1, 2])
            .add_choice("kernel", vec!["linear", "rbf", "poly"])
            .build()
            .unwrap()
    }

    #[test]
    fn seeded_sampler_is_reproducible() {
        let first: Vec<Configuration> = list_sampler(42).iter().collect();
        let second: Vec<Configuration> = list_sampler(42).iter().collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn seeded_passes_restart_from_the_seed() {
        let sampler = list_sampler(7);
        let first: Vec<_> = sampler.iter().collect();
        let second: Vec<_> = (&sampler).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn sampler_len_is_n_iter() {
        let sampler = list_sampler(0);
        assert_eq!(sampler.len(), 4);
        assert_eq!(sampler.iter().len(), 4);

        let none = ParameterSampler::builder(0)
            .add_choice("a", vec![1])
            .build()
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(none.iter().count(), 0);
    }

    #[test]
    fn choices_come_from_the_list() {
        let sampler = ParameterSampler::builder(50)
            .with_seed(3)
            .add_choice("solver", vec!["a", "b", "c"])
            .build()
            .unwrap();
        for config in sampler.iter() {
            let v = config.get("solver").and_then(ParamValue::as_str).unwrap();
            assert!(["a", "b", "c"].contains(&v));
        }
    }

    #[test]
    fn distributions_respect_bounds() {
        let sampler = ParameterSampler::builder(100)
            .with_seed(11)
            .add_float("subsample", 0.5, 1.0)
            .add_log_uniform("lr", 1e-5, 1e-1)
            .add_int("period", 5, 15)
            .build()
            .unwrap();

        for config in sampler.iter() {
            let subsample = config.get("subsample").and_then(ParamValue::as_f64).unwrap();
            assert!((0.5..=1.0).contains(&subsample));
            let lr = config.get("lr").and_then(ParamValue::as_f64).unwrap();
            assert!((1e-5..=1e-1).contains(&lr), "lr out of bounds: {lr}");
            let period = config.get("period").and_then(ParamValue::as_i64).unwrap();
            assert!((5..=15).contains(&period));
        }
    }

    #[test]
    fn seeded_distributions_are_reproducible_through_the_injected_rng() {
        let build = || {
            ParameterSampler::builder(5)
                .with_seed(99)
                .add_float("C", 0.0, 10.0)
                .add_choice("kernel", vec!["linear", "rbf"])
                .build()
                .unwrap()
        };
        let a: Vec<_> = build().iter().collect();
        let b: Vec<_> = build().iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_choice_is_rejected() {
        let err = ParameterSampler::builder(3)
            .add_choice("a", Vec::<i64>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(ParameterSampler::builder(1).add_float("x", 1.0, 0.0).build().is_err());
        assert!(ParameterSampler::builder(1).add_log_uniform("x", 0.0, 1.0).build().is_err());
        assert!(ParameterSampler::builder(1).add_int("x", 3, 2).build().is_err());
        assert!(ParameterSampler::builder(1).add_float("x", f64::NAN, 1.0).build().is_err());
        assert!(ParameterSampler::builder(1).add_float("x", 0.0, f64::INFINITY).build().is_err());
        assert!(ParameterSampler::builder(1)
            .add_log_uniform("x", 1.0, f64::INFINITY)
            .build()
            .is_err());

        let err = ParameterSampler::builder(1)
            .add_float("x", -f64::MAX, f64::MAX)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not a finite range"), "{err}");
    }

    #[test]
    fn widest_finite_spans_sample_without_panicking() {
        let sampler = ParameterSampler::builder(20)
            .with_seed(5)
            .add_float("x", -f64::MAX / 2.0, f64::MAX / 2.0)
            .add_log_uniform("y", f64::MIN_POSITIVE, f64::MAX)
            .build()
            .unwrap();
        for config in sampler.iter() {
            let x = config.get("x").and_then(ParamValue::as_f64).unwrap();
            assert!(x.is_finite());
            let y = config.get("y").and_then(ParamValue::as_f64).unwrap();
            assert!(y > 0.0 && y.is_finite());
        }
    }
}
