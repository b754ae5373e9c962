//! Estimator contract consumed by the search.
//!
//! Optional abilities (prediction, probabilities, own scoring, ...) are
//! sub-traits reached through `as_*` accessors. An estimator advertises a
//! capability by returning `Some(self)` from the matching accessor.

use std::fmt;

use crate::data::Matrix;
use crate::params::Configuration;

/// A trainable model.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Human-readable model name used in logs and error messages.
    fn name(&self) -> &str;

    /// Fresh, unfitted instance carrying only constructor-level parameters.
    ///
    /// No fitted state and no configuration applied by an earlier
    /// `set_params` on a previous clone may survive.
    fn clone_unfitted(&self) -> Box<dyn Estimator>;

    /// Apply a configuration. Unknown names or invalid values are errors.
    fn set_params(&mut self, params: &Configuration) -> anyhow::Result<()>;

    fn fit(&mut self, x: &Matrix, y: Option<&[f64]>, fit_params: &Configuration)
        -> anyhow::Result<()>;

    /// Classifiers may get stratified folds from the fold generator.
    fn is_classifier(&self) -> bool {
        false
    }

    /// The estimator consumes a precomputed square kernel/affinity matrix.
    fn is_pairwise(&self) -> bool {
        false
    }

    /// The estimator evaluates a user-supplied kernel function at predict
    /// time, which the search cannot slice.
    fn uses_custom_kernel(&self) -> bool {
        false
    }

    fn as_predictor(&self) -> Option<&dyn Predict> {
        None
    }

    fn as_self_scoring(&self) -> Option<&dyn SelfScore> {
        None
    }

    fn as_probabilistic(&self) -> Option<&dyn PredictProba> {
        None
    }

    fn as_decision_function(&self) -> Option<&dyn DecisionFunction> {
        None
    }

    fn as_transformer(&self) -> Option<&dyn Transform> {
        None
    }
}

pub trait Predict {
    fn predict(&self, x: &Matrix) -> anyhow::Result<Vec<f64>>;
}

/// The estimator's own quality measure; greater is better.
pub trait SelfScore {
    fn score(&self, x: &Matrix, y: Option<&[f64]>) -> anyhow::Result<f64>;
}

pub trait PredictProba {
    fn predict_proba(&self, x: &Matrix) -> anyhow::Result<Matrix>;
}

pub trait DecisionFunction {
    fn decision_function(&self, x: &Matrix) -> anyhow::Result<Matrix>;
}

pub trait Transform {
    fn transform(&self, x: &Matrix) -> anyhow::Result<Matrix>;
}

/// Capability names used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Predict,
    Score,
    PredictProba,
    DecisionFunction,
    Transform,
}

impl Capability {
    pub fn supported_by(self, estimator: &dyn Estimator) -> bool {
        match self {
            Self::Predict => estimator.as_predictor().is_some(),
            Self::Score => estimator.as_self_scoring().is_some(),
            Self::PredictProba => estimator.as_probabilistic().is_some(),
            Self::DecisionFunction => estimator.as_decision_function().is_some(),
            Self::Transform => estimator.as_transformer().is_some(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Predict => "predict",
            Self::Score => "score",
            Self::PredictProba => "predict_proba",
            Self::DecisionFunction => "decision_function",
            Self::Transform => "transform",
        };
        f.write_str(name)
    }
}
