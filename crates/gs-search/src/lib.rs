//! # gs-search
//!
//! Cross-validated hyperparameter search.
//!
//! Provides exhaustive parameter grids and seeded random samplers, scorer
//! resolution, a bounded parallel dispatcher that evaluates every
//! configuration on every fold, score aggregation and ranking, and the
//! [`SearchCv`] driver that ties them together and refits the winner.

mod aggregate;
mod config;
mod controller;
mod dispatch;
mod evaluator;
mod sampler;
mod scoring;
mod space;

#[cfg(test)]
mod test_support;

pub use aggregate::{aggregate, rank};
pub use config::{PreDispatch, SearchConfig};
pub use controller::SearchCv;
pub use dispatch::{Dispatcher, ExecutionPool};
pub use evaluator::{Evaluator, Partition, WorkUnit};
pub use sampler::{
    Distribution, IntUniform, LogUniform, ParamDistribution, ParameterSampler, SamplerBuilder,
    SamplerIter, Uniform,
};
pub use scoring::{
    resolve_scorer, EstimatorScore, MetricFn, MetricScorer, ScorerRegistry, Scoring,
    ScoringOptions,
};
pub use space::{AxisGroup, GridBuilder, GridIter, ParameterGrid, ParameterSpace};

pub use gs_types;
