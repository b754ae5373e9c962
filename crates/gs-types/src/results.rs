//! Evaluation records, ranked summaries and search lifecycle tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::data::Matrix;
use crate::errors::{ConfigError, GsResult, SearchError};
use crate::estimator::{Capability, Estimator};
use crate::params::Configuration;
use crate::scorer::{ObjectiveDirection, Scorer};

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Outcome of one (configuration, fold) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Position of the evaluated configuration in enumeration order.
    pub candidate: usize,
    pub score: f64,
    pub configuration: Configuration,
    pub n_test_samples: usize,
}

/// Cross-validated quality estimate of one candidate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSummary {
    /// Position of the configuration in enumeration order.
    pub candidate: usize,
    /// 1 for the best configuration; 0 until ranked.
    pub rank: usize,
    pub configuration: Configuration,
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

impl ConfigurationSummary {
    /// Population standard deviation of the fold scores.
    pub fn std_score(&self) -> f64 {
        let n = self.fold_scores.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.fold_scores.iter().sum::<f64>() / n as f64;
        let var = self
            .fold_scores
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        var.sqrt()
    }
}

impl fmt::Display for ConfigurationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean: {:.5}, std: {:.5}, params: {}",
            self.mean_score,
            self.std_score(),
            self.configuration
        )
    }
}

/// Everything a finished search produced.
///
/// `summaries` is ranked, best first. When the search refit a final model, the
/// prediction and scoring methods delegate to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: SearchId,
    pub summaries: Vec<ConfigurationSummary>,
    pub best_configuration: Configuration,
    pub best_score: f64,
    pub direction: ObjectiveDirection,
    pub n_folds: usize,
    #[serde(skip)]
    best_estimator: Option<Arc<dyn Estimator>>,
    #[serde(skip)]
    scorer: Option<Arc<dyn Scorer>>,
}

impl SearchResult {
    /// Build from summaries that are already ranked.
    pub fn new(
        id: SearchId,
        summaries: Vec<ConfigurationSummary>,
        direction: ObjectiveDirection,
        n_folds: usize,
    ) -> GsResult<Self> {
        let best = summaries.first().ok_or(ConfigError::NoCandidates)?;
        Ok(Self {
            id,
            best_configuration: best.configuration.clone(),
            best_score: best.mean_score,
            summaries,
            direction,
            n_folds,
            best_estimator: None,
            scorer: None,
        })
    }

    pub fn with_best_estimator(mut self, estimator: Box<dyn Estimator>) -> Self {
        self.best_estimator = Some(Arc::from(estimator));
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn best_estimator(&self) -> Option<&dyn Estimator> {
        self.best_estimator.as_deref()
    }

    pub fn n_candidates(&self) -> usize {
        self.summaries.len()
    }

    /// Summaries in the order the parameter space enumerated them.
    pub fn in_candidate_order(&self) -> Vec<&ConfigurationSummary> {
        let mut ordered: Vec<_> = self.summaries.iter().collect();
        ordered.sort_by_key(|s| s.candidate);
        ordered
    }

    pub fn predict(&self, x: &Matrix) -> GsResult<Vec<f64>> {
        let estimator = self.refit_estimator()?;
        let predictor = estimator
            .as_predictor()
            .ok_or_else(|| missing(estimator, Capability::Predict))?;
        predictor.predict(x).map_err(delegation_failure)
    }

    pub fn predict_proba(&self, x: &Matrix) -> GsResult<Matrix> {
        let estimator = self.refit_estimator()?;
        let proba = estimator
            .as_probabilistic()
            .ok_or_else(|| missing(estimator, Capability::PredictProba))?;
        proba.predict_proba(x).map_err(delegation_failure)
    }

    pub fn decision_function(&self, x: &Matrix) -> GsResult<Matrix> {
        let estimator = self.refit_estimator()?;
        let decision = estimator
            .as_decision_function()
            .ok_or_else(|| missing(estimator, Capability::DecisionFunction))?;
        decision.decision_function(x).map_err(delegation_failure)
    }

    pub fn transform(&self, x: &Matrix) -> GsResult<Matrix> {
        let estimator = self.refit_estimator()?;
        let transformer = estimator
            .as_transformer()
            .ok_or_else(|| missing(estimator, Capability::Transform))?;
        transformer.transform(x).map_err(delegation_failure)
    }

    /// Score with the refit estimator's own measure, falling back to the
    /// scorer the search ran with.
    pub fn score(&self, x: &Matrix, y: Option<&[f64]>) -> GsResult<f64> {
        let estimator = self.refit_estimator()?;
        if let Some(own) = estimator.as_self_scoring() {
            return own.score(x, y).map_err(delegation_failure);
        }
        match &self.scorer {
            Some(scorer) => scorer.score(estimator, x, y).map_err(delegation_failure),
            None => Err(ConfigError::NoScorer {
                estimator: estimator.name().to_string(),
            }
            .into()),
        }
    }

    fn refit_estimator(&self) -> GsResult<&dyn Estimator> {
        self.best_estimator().ok_or_else(|| {
            SearchError::NotFitted("no refit estimator; run the search with refit enabled".into())
        })
    }
}

fn missing(estimator: &dyn Estimator, capability: Capability) -> SearchError {
    ConfigError::MissingCapability {
        estimator: estimator.name().to_string(),
        capability: capability.to_string(),
    }
    .into()
}

fn delegation_failure(e: anyhow::Error) -> SearchError {
    SearchError::Internal(format!("refit estimator failed: {e}"))
}

/// Lifecycle state of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    Unfit,
    Fitting,
    Fitted,
    Failed,
}

/// Aggregate status of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatus {
    pub id: SearchId,
    pub state: SearchState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SearchStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SearchState::Unfit,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_fitting(&mut self) {
        self.state = SearchState::Fitting;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_fitted(&mut self) {
        self.state = SearchState::Fitted;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = SearchState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// A search in a terminal state cannot be fitted again.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SearchState::Fitted | SearchState::Failed)
    }
}

impl Default for SearchStatus {
    fn default() -> Self {
        Self::new()
    }
}
