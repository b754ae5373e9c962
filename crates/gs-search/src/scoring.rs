//! Scorer resolution.
//!
//! A search may name its scoring several ways. Exactly one is used, picked
//! in this order: `loss_func`, `score_func`, `scoring`, then the estimator's
//! own `score`. Both function forms are deprecated and log a warning.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use gs_types::{Capability, ConfigError, Estimator, GsResult, Matrix, ObjectiveDirection, Scorer};

/// `metric(y_true, y_pred) -> score`.
pub type MetricFn = Arc<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync>;

/// Predicts on the held-out data and applies a metric to the predictions.
#[derive(Clone)]
pub struct MetricScorer {
    name: String,
    metric: MetricFn,
    direction: ObjectiveDirection,
}

impl MetricScorer {
    pub fn new(
        name: impl Into<String>,
        metric: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
        direction: ObjectiveDirection,
    ) -> Self {
        Self {
            name: name.into(),
            metric: Arc::new(metric),
            direction,
        }
    }

    /// Greater values are better.
    pub fn score_func(
        name: impl Into<String>,
        metric: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, metric, ObjectiveDirection::Maximize)
    }

    /// Smaller values are better.
    pub fn loss_func(
        name: impl Into<String>,
        metric: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, metric, ObjectiveDirection::Minimize)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for MetricScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricScorer")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .finish()
    }
}

impl Scorer for MetricScorer {
    fn score(
        &self,
        estimator: &dyn Estimator,
        x: &Matrix,
        y: Option<&[f64]>,
    ) -> anyhow::Result<f64> {
        let predictor = estimator.as_predictor().ok_or_else(|| {
            anyhow::anyhow!(
                "scorer {} needs predictions but {} does not support {}",
                self.name,
                estimator.name(),
                Capability::Predict
            )
        })?;
        let y = y.ok_or_else(|| anyhow::anyhow!("scorer {} needs targets", self.name))?;
        let predictions = predictor.predict(x)?;
        Ok((self.metric)(y, &predictions))
    }

    fn direction(&self) -> ObjectiveDirection {
        self.direction
    }
}

/// Uses the estimator's own quality measure.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatorScore;

impl Scorer for EstimatorScore {
    fn score(
        &self,
        estimator: &dyn Estimator,
        x: &Matrix,
        y: Option<&[f64]>,
    ) -> anyhow::Result<f64> {
        match estimator.as_self_scoring() {
            Some(own) => own.score(x, y),
            None => anyhow::bail!("estimator {} has no score method", estimator.name()),
        }
    }
}

/// The `scoring` option: a registry name or a scorer object.
#[derive(Debug, Clone)]
pub enum Scoring {
    Named(String),
    Scorer(Arc<dyn Scorer>),
}

impl From<&str> for Scoring {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for Scoring {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Arc<dyn Scorer>> for Scoring {
    fn from(scorer: Arc<dyn Scorer>) -> Self {
        Self::Scorer(scorer)
    }
}

/// Every way a search can be told how to score.
#[derive(Debug, Clone, Default)]
pub struct ScoringOptions {
    pub scoring: Option<Scoring>,
    pub score_func: Option<MetricScorer>,
    pub loss_func: Option<MetricScorer>,
}

impl ScoringOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scoring(mut self, scoring: impl Into<Scoring>) -> Self {
        self.scoring = Some(scoring.into());
        self
    }

    pub fn with_score_func(
        mut self,
        name: impl Into<String>,
        metric: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.score_func = Some(MetricScorer::score_func(name, metric));
        self
    }

    pub fn with_loss_func(
        mut self,
        name: impl Into<String>,
        metric: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.loss_func = Some(MetricScorer::loss_func(name, metric));
        self
    }
}

/// Named scorers available to `Scoring::Named`.
#[derive(Debug, Clone, Default)]
pub struct ScorerRegistry {
    scorers: HashMap<String, Arc<dyn Scorer>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, scorer: Arc<dyn Scorer>) {
        self.scorers.insert(name.into(), scorer);
    }

    pub fn with(mut self, name: impl Into<String>, scorer: Arc<dyn Scorer>) -> Self {
        self.register(name, scorer);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Scorer>> {
        self.scorers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scorers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Pick the single scorer a search will use.
pub fn resolve_scorer(
    options: &ScoringOptions,
    registry: &ScorerRegistry,
    estimator: &dyn Estimator,
) -> GsResult<Arc<dyn Scorer>> {
    if let Some(loss) = &options.loss_func {
        warn!(
            scorer = loss.name(),
            "loss_func is deprecated; pass a scorer with a minimizing direction as scoring"
        );
        warn_ignored("loss_func", options.score_func.is_some(), options.scoring.is_some());
        return Ok(Arc::new(loss.clone()));
    }

    if let Some(score) = &options.score_func {
        warn!(
            scorer = score.name(),
            "score_func is deprecated; pass a scorer as scoring"
        );
        warn_ignored("score_func", false, options.scoring.is_some());
        return Ok(Arc::new(score.clone()));
    }

    match &options.scoring {
        Some(Scoring::Scorer(scorer)) => Ok(Arc::clone(scorer)),
        Some(Scoring::Named(name)) => registry
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScorer { name: name.clone() }.into()),
        None => {
            if estimator.as_self_scoring().is_none() {
                return Err(ConfigError::NoScorer {
                    estimator: estimator.name().to_string(),
                }
                .into());
            }
            Ok(Arc::new(EstimatorScore))
        }
    }
}

fn warn_ignored(used: &str, score_func: bool, scoring: bool) {
    if score_func {
        warn!(used, ignored = "score_func", "multiple scorers supplied; ignoring score_func");
    }
    if scoring {
        warn!(used, ignored = "scoring", "multiple scorers supplied; ignoring scoring");
    }
}
